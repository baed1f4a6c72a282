use async_trait::async_trait;
use layar_model::{MoviePage, MovieQuery, MovieRecord, SortField, SortOrder};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{
    PgPool, Postgres, QueryBuilder,
    postgres::{PgConnectOptions, PgPoolOptions},
    types::Json,
};
use std::{fmt, time::Duration};
use tracing::{debug, info};

use super::{MovieStore, dedupe_by_slug, stored_tmdb_id};
use crate::error::{CatalogError, Result};

/// Rows per multi-row INSERT.
pub const UPSERT_CHUNK: usize = 500;

const NATURAL_ORDER: &str = "created_at DESC, slug ASC";

/// Same rule as `query::year_sort_key`: up to four digits, else 0.
const YEAR_KEY: &str = "CASE WHEN BTRIM(tahun) ~ '^[0-9]{1,4}$' \
    THEN BTRIM(tahun)::INTEGER ELSE 0 END";

static SQL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap());

/// Stored document with the bookkeeping timestamps folded back in.
const DOCUMENT: &str = "document || jsonb_build_object('created_at', created_at, 'updated_at', updated_at)";

/// Relational store: one row per slug, the full record kept as JSONB with
/// the filterable columns projected next to it.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresStore")
            .field("table", &self.table)
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

impl PostgresStore {
    pub async fn connect(
        url: &str,
        table: &str,
        max_connections: u32,
    ) -> Result<Self> {
        // Transaction poolers reject named prepared statements.
        let options = url
            .trim()
            .parse::<PgConnectOptions>()?
            .statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;

        info!(table, max_connections, "postgres pool initialized");

        Self::from_pool(pool, table)
    }

    pub fn from_pool(pool: PgPool, table: &str) -> Result<Self> {
        if !is_sql_identifier(table) {
            return Err(CatalogError::InvalidData(format!(
                "invalid table name: {table}"
            )));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates the table and its indexes, dropping the table first when
    /// `drop` is set.
    pub async fn initialize_schema(&self, drop: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if drop {
            let sql = format!("DROP TABLE IF EXISTS {}", self.table);
            sqlx::query(&sql).execute(&mut *tx).await?;
            info!(table = %self.table, "dropped table");
        }

        for statement in schema_statements(&self.table) {
            debug!(%statement, "applying schema");
            sqlx::query(&statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(table = %self.table, "schema ready");
        Ok(())
    }
}

#[async_trait]
impl MovieStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn search(&self, query: &MovieQuery) -> Result<MoviePage> {
        let mut count = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) FROM {}",
            self.table
        ));
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {DOCUMENT} FROM {}",
            self.table
        ));
        push_filters(&mut select, query);
        select.push(order_clause(query.sort_by, query.order));
        select.push(" LIMIT ");
        select.push_bind(clamp_i64(query.limit));
        select.push(" OFFSET ");
        select.push_bind(clamp_i64(query.offset));

        let rows: Vec<Json<MovieRecord>> =
            select.build_query_scalar().fetch_all(&self.pool).await?;

        Ok(MoviePage {
            movies: rows.into_iter().map(|Json(record)| record).collect(),
            total: total.max(0) as u64,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<MovieRecord>> {
        let sql =
            format!("SELECT {DOCUMENT} FROM {} WHERE slug = $1", self.table);
        let row: Option<Json<MovieRecord>> = sqlx::query_scalar(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(record)| record))
    }

    async fn find_by_tmdb_id(
        &self,
        tmdb_id: u64,
    ) -> Result<Option<MovieRecord>> {
        let Ok(tmdb_id) = i64::try_from(tmdb_id) else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT {DOCUMENT} FROM {} WHERE tmdb_id = $1 ORDER BY updated_at DESC LIMIT 1",
            self.table
        );
        let row: Option<Json<MovieRecord>> = sqlx::query_scalar(&sql)
            .bind(tmdb_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(record)| record))
    }

    async fn upsert_many(&self, records: &[MovieRecord]) -> Result<usize> {
        let deduped = dedupe_by_slug(records);
        if deduped.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for chunk in deduped.chunks(UPSERT_CHUNK) {
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {} (slug, judul, tahun, genre, rating, sinopsis, tmdb_id, document) ",
                self.table
            ));
            builder.push_values(chunk.iter(), |mut row, record| {
                row.push_bind(record.slug.clone())
                    .push_bind(record.title.clone())
                    .push_bind(record.year_text())
                    .push_bind(record.genre.clone())
                    .push_bind(record.rating_value())
                    .push_bind(record.synopsis.clone())
                    .push_bind(
                        stored_tmdb_id(record)
                            .and_then(|id| i64::try_from(id).ok()),
                    )
                    .push_bind(Json(without_bookkeeping(record)));
            });
            builder.push(UPSERT_CONFLICT);

            let result = builder.build().execute(&mut *tx).await?;
            written += result.rows_affected();
            debug!(rows = chunk.len(), "upserted chunk");
        }

        tx.commit().await?;
        Ok(written as usize)
    }

    async fn export_all(&self) -> Result<Vec<MovieRecord>> {
        let sql = format!(
            "SELECT {DOCUMENT} FROM {} ORDER BY {NATURAL_ORDER}",
            self.table
        );
        let rows: Vec<Json<MovieRecord>> =
            sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(record)| record).collect())
    }

    async fn clear(&self) -> Result<u64> {
        let sql = format!("DELETE FROM {}", self.table);
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

const UPSERT_CONFLICT: &str = " ON CONFLICT (slug) DO UPDATE SET \
    judul = EXCLUDED.judul, \
    tahun = EXCLUDED.tahun, \
    genre = EXCLUDED.genre, \
    rating = EXCLUDED.rating, \
    sinopsis = EXCLUDED.sinopsis, \
    tmdb_id = EXCLUDED.tmdb_id, \
    document = EXCLUDED.document, \
    updated_at = NOW()";

pub(crate) fn schema_statements(table: &str) -> Vec<String> {
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            slug TEXT PRIMARY KEY,
            judul TEXT,
            tahun TEXT,
            genre TEXT,
            rating DOUBLE PRECISION,
            sinopsis TEXT,
            tmdb_id BIGINT,
            document JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
    )];
    for column in ["judul", "genre", "tahun", "rating", "tmdb_id", "created_at"] {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} ({column})"
        ));
    }
    statements
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &MovieQuery) {
    builder.push(" WHERE judul IS NOT NULL");

    if let Some(search) = non_blank(query.search.as_deref()) {
        let pattern = format!("%{}%", escape_like_literal(search));
        builder.push(" AND (judul ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE E'\\\\' OR slug ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE E'\\\\' OR sinopsis ILIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE E'\\\\')");
    }

    if let Some(genre) = non_blank(query.genre.as_deref()) {
        builder.push(" AND genre ILIKE ");
        builder.push_bind(format!("%{}%", escape_like_literal(genre)));
        builder.push(" ESCAPE E'\\\\'");
    }

    if let Some(tahun) = non_blank(query.tahun.as_deref()) {
        builder.push(" AND tahun = ");
        builder.push_bind(tahun.to_string());
    }

    if let Some(min) = query.min_rating {
        builder.push(" AND rating >= ");
        builder.push_bind(min);
    }
}

fn order_clause(field: SortField, order: SortOrder) -> String {
    let direction = order.as_sql();
    match field {
        SortField::Rating => format!(
            " ORDER BY COALESCE(rating, 0) {direction}, {NATURAL_ORDER}"
        ),
        SortField::Year => {
            format!(" ORDER BY {YEAR_KEY} {direction}, {NATURAL_ORDER}")
        }
        SortField::Natural => format!(" ORDER BY {NATURAL_ORDER}"),
    }
}

/// Timestamps live in their own columns.
fn without_bookkeeping(record: &MovieRecord) -> MovieRecord {
    let mut record = record.clone();
    record.extra.remove("created_at");
    record.extra.remove("updated_at");
    record
}

/// Whether `name` can be interpolated as an unquoted table name.
pub fn is_sql_identifier(name: &str) -> bool {
    SQL_IDENTIFIER.is_match(name)
}

fn escape_like_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            other => out.push(other),
        }
    }
    out
}

fn clamp_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
