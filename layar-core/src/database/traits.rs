use async_trait::async_trait;
use layar_model::{MoviePage, MovieQuery, MovieRecord};
use std::fmt;

use crate::error::Result;

/// Storage backend for catalog records.
///
/// All implementations share the listing semantics of [`crate::query`]:
/// untitled records are hidden, `total` is counted before pagination.
#[async_trait]
pub trait MovieStore: Send + Sync + fmt::Debug {
    /// Short backend name used in logs and health output.
    fn backend(&self) -> &'static str;

    fn is_writable(&self) -> bool {
        true
    }

    async fn search(&self, query: &MovieQuery) -> Result<MoviePage>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<MovieRecord>>;

    /// Record previously enriched with the given TMDB id.
    async fn find_by_tmdb_id(&self, tmdb_id: u64)
    -> Result<Option<MovieRecord>>;

    /// Inserts or replaces records keyed by slug. Returns the number written.
    async fn upsert_many(&self, records: &[MovieRecord]) -> Result<usize>;

    /// Every stored record, untitled ones included, in natural order.
    async fn export_all(&self) -> Result<Vec<MovieRecord>>;

    /// Removes every record. Returns the number removed.
    async fn clear(&self) -> Result<u64>;

    async fn health_check(&self) -> Result<()>;
}
