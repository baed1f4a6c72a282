pub mod bundled;
pub mod postgres;
pub mod redis;
pub mod traits;

use layar_model::MovieRecord;
use std::collections::HashMap;

pub use bundled::BundledStore;
pub use postgres::PostgresStore;
pub use redis::RedisStore;
pub use traits::MovieStore;

/// TMDB id persisted on a previously enriched record.
pub fn stored_tmdb_id(record: &MovieRecord) -> Option<u64> {
    let value = record.extra.get("tmdb_id")?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Keeps the last occurrence of each slug, in first-seen order.
pub(crate) fn dedupe_by_slug(records: &[MovieRecord]) -> Vec<&MovieRecord> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<&MovieRecord> = Vec::with_capacity(records.len());
    for record in records {
        match position.get(record.slug.as_str()) {
            Some(&index) => out[index] = record,
            None => {
                position.insert(record.slug.as_str(), out.len());
                out.push(record);
            }
        }
    }
    out
}
