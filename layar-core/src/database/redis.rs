use async_trait::async_trait;
use layar_model::{MoviePage, MovieQuery, MovieRecord};
use redis::{AsyncCommands, aio::ConnectionManager};
use std::fmt;
use tracing::{debug, info};

use super::{MovieStore, dedupe_by_slug, stored_tmdb_id};
use crate::{error::Result, query};

/// Keys per MGET / pipeline round trip.
pub const BATCH_SIZE: usize = 500;

/// Key layout under a configurable prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches(':').to_string();
        Self { prefix }
    }

    /// JSON document for one record.
    pub fn movie(&self, slug: &str) -> String {
        format!("{}:movie:{slug}", self.prefix)
    }

    /// Sorted set of slugs scored by import sequence.
    pub fn index(&self) -> String {
        format!("{}:movies", self.prefix)
    }

    /// Hash of TMDB id to slug.
    pub fn tmdb(&self) -> String {
        format!("{}:tmdb", self.prefix)
    }

    pub fn sequence(&self) -> String {
        format!("{}:seq", self.prefix)
    }
}

/// Document store: one JSON string per record plus an ordered slug index.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    keys: RedisKeys,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    pub async fn connect(url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(prefix, "redis connection manager ready");
        Ok(Self::from_manager(conn, prefix))
    }

    pub fn from_manager(conn: ConnectionManager, prefix: &str) -> Self {
        Self {
            conn,
            keys: RedisKeys::new(prefix),
        }
    }

    pub fn keys(&self) -> &RedisKeys {
        &self.keys
    }

    async fn slugs(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let slugs: Vec<String> = conn.zrange(self.keys.index(), 0, -1).await?;
        Ok(slugs)
    }

    async fn load_all(&self) -> Result<Vec<MovieRecord>> {
        let slugs = self.slugs().await?;
        let mut conn = self.conn.clone();
        let mut records = Vec::with_capacity(slugs.len());

        for chunk in slugs.chunks(BATCH_SIZE) {
            let keys: Vec<String> =
                chunk.iter().map(|slug| self.keys.movie(slug)).collect();
            let documents: Vec<Option<String>> = redis::cmd("MGET")
                .arg(&keys)
                .query_async(&mut conn)
                .await?;

            for (slug, document) in chunk.iter().zip(documents) {
                match document {
                    Some(json) => records.push(serde_json::from_str(&json)?),
                    None => debug!(%slug, "indexed slug has no document"),
                }
            }
        }

        Ok(records)
    }

    async fn get(&self, slug: &str) -> Result<Option<MovieRecord>> {
        let mut conn = self.conn.clone();
        let document: Option<String> = conn.get(self.keys.movie(slug)).await?;
        document
            .map(|json| serde_json::from_str(&json).map_err(Into::into))
            .transpose()
    }
}

#[async_trait]
impl MovieStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn search(&self, query: &MovieQuery) -> Result<MoviePage> {
        Ok(query::apply(self.load_all().await?, query))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<MovieRecord>> {
        self.get(slug).await
    }

    async fn find_by_tmdb_id(
        &self,
        tmdb_id: u64,
    ) -> Result<Option<MovieRecord>> {
        let mut conn = self.conn.clone();
        let slug: Option<String> = conn.hget(self.keys.tmdb(), tmdb_id).await?;
        let Some(slug) = slug else {
            return Ok(None);
        };

        // The hash is not pruned when a record's id changes.
        Ok(self
            .get(&slug)
            .await?
            .filter(|record| stored_tmdb_id(record) == Some(tmdb_id)))
    }

    async fn upsert_many(&self, records: &[MovieRecord]) -> Result<usize> {
        let deduped = dedupe_by_slug(records);
        let mut conn = self.conn.clone();

        for chunk in deduped.chunks(BATCH_SIZE) {
            let end: i64 =
                conn.incr(self.keys.sequence(), chunk.len() as i64).await?;
            let start = end - chunk.len() as i64 + 1;

            let mut pipe = redis::pipe();
            pipe.atomic();
            for (offset, record) in chunk.iter().enumerate() {
                pipe.set(self.keys.movie(&record.slug), serde_json::to_string(record)?)
                    .ignore();
                pipe.cmd("ZADD")
                    .arg(self.keys.index())
                    .arg("NX")
                    .arg(start + offset as i64)
                    .arg(&record.slug)
                    .ignore();
                if let Some(id) = stored_tmdb_id(record) {
                    pipe.hset(self.keys.tmdb(), id, &record.slug).ignore();
                }
            }

            let (): () = pipe.query_async(&mut conn).await?;
            debug!(rows = chunk.len(), "upserted chunk");
        }

        Ok(deduped.len())
    }

    async fn export_all(&self) -> Result<Vec<MovieRecord>> {
        self.load_all().await
    }

    async fn clear(&self) -> Result<u64> {
        let slugs = self.slugs().await?;
        let mut conn = self.conn.clone();

        for chunk in slugs.chunks(BATCH_SIZE) {
            let keys: Vec<String> =
                chunk.iter().map(|slug| self.keys.movie(slug)).collect();
            let (): () = conn.del(keys).await?;
        }

        let (): () = conn
            .del(vec![
                self.keys.index(),
                self.keys.tmdb(),
                self.keys.sequence(),
            ])
            .await?;

        info!(removed = slugs.len(), "cleared redis store");
        Ok(slugs.len() as u64)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
