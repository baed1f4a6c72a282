//! Moving records into and between stores.

use chrono::Utc;
use layar_model::{MovieEntry, MovieQuery, MovieRecord, SortField};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    database::MovieStore,
    enrichment::MovieEnricher,
    error::{CatalogError, Result},
};

/// Records per upsert call during imports.
pub const IMPORT_BATCH_SIZE: usize = 500;

/// Timestamp written next to persisted enrichment fields.
pub const ENRICHED_AT_FIELD: &str = "tmdb_enriched_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Records removed beforehand when replacing.
    pub cleared: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub scanned: usize,
    pub enriched: usize,
    pub written: usize,
}

fn ensure_writable(store: &dyn MovieStore) -> Result<()> {
    if store.is_writable() {
        Ok(())
    } else {
        Err(CatalogError::ReadOnly {
            backend: store.backend(),
        })
    }
}

/// Writes `records` into `store` in batches.
///
/// Records without a slug are skipped. A batch that fails as a whole is
/// retried one record at a time so a single bad row does not sink its
/// neighbours.
pub async fn import_records(
    store: &dyn MovieStore,
    records: Vec<MovieRecord>,
    replace: bool,
) -> Result<ImportReport> {
    ensure_writable(store)?;

    let mut report = ImportReport {
        total: records.len(),
        ..ImportReport::default()
    };

    if replace {
        report.cleared = store.clear().await?;
        info!(backend = store.backend(), removed = report.cleared, "cleared store");
    }

    let (valid, invalid): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| !record.slug.trim().is_empty());
    report.skipped = invalid.len();
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "skipping records without a slug");
    }

    let batches = valid.len().div_ceil(IMPORT_BATCH_SIZE);
    for (index, batch) in valid.chunks(IMPORT_BATCH_SIZE).enumerate() {
        match store.upsert_many(batch).await {
            Ok(_) => report.written += batch.len(),
            Err(err) => {
                warn!(
                    batch = index + 1,
                    error = %err,
                    "batch upsert failed; retrying records individually"
                );
                for record in batch {
                    match store.upsert_many(std::slice::from_ref(record)).await {
                        Ok(_) => report.written += 1,
                        Err(err) => {
                            warn!(slug = %record.slug, error = %err, "failed to write record");
                            report.failed += 1;
                        }
                    }
                }
            }
        }
        info!(
            batch = index + 1,
            batches,
            written = report.written,
            total = report.total,
            "import progress"
        );
    }

    info!(
        backend = store.backend(),
        written = report.written,
        skipped = report.skipped,
        failed = report.failed,
        "import finished"
    );
    Ok(report)
}

/// Copies every record from `source` into `target`.
pub async fn migrate(
    source: &dyn MovieStore,
    target: &dyn MovieStore,
    replace: bool,
) -> Result<ImportReport> {
    ensure_writable(target)?;
    let records = source.export_all().await?;
    info!(
        from = source.backend(),
        to = target.backend(),
        records = records.len(),
        "migrating records"
    );
    import_records(target, records, replace).await
}

/// Enriches one page of stored records (natural order) and writes the
/// enriched ones back with an enrichment timestamp.
pub async fn persist_enrichment(
    store: &dyn MovieStore,
    enricher: &MovieEnricher,
    limit: usize,
    offset: usize,
    use_cache: bool,
) -> Result<EnrichmentReport> {
    ensure_writable(store)?;

    let query = MovieQuery {
        limit,
        offset,
        sort_by: SortField::Natural,
        ..MovieQuery::default()
    };
    let page = store.search(&query).await?;
    let (entries, summary) = enricher
        .enrich_batch_with_summary(&page.movies, use_cache)
        .await;

    let enriched_at = Utc::now().to_rfc3339();
    let mut updates = Vec::with_capacity(summary.enriched);
    for entry in entries {
        if let MovieEntry::Enriched(movie) = entry {
            let mut record = movie.into_record()?;
            record
                .extra
                .insert(ENRICHED_AT_FIELD.to_string(), Value::String(enriched_at.clone()));
            updates.push(record);
        }
    }

    let written = if updates.is_empty() {
        0
    } else {
        store.upsert_many(&updates).await?
    };

    let report = EnrichmentReport {
        scanned: page.movies.len(),
        enriched: summary.enriched,
        written,
    };
    info!(
        backend = store.backend(),
        scanned = report.scanned,
        enriched = report.enriched,
        written = report.written,
        "persisted enrichment"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::{BundledStore, stored_tmdb_id},
        providers::MockMetadataProvider,
        query,
    };
    use async_trait::async_trait;
    use layar_model::{MoviePage, TmdbMovieDetails};
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
        time::Duration,
    };

    /// Writable in-memory store that can be told to reject a slug.
    #[derive(Debug, Default)]
    struct MemoryStore {
        records: Mutex<Vec<MovieRecord>>,
        reject: Option<&'static str>,
        upsert_calls: Mutex<usize>,
    }

    impl MemoryStore {
        fn with(records: Vec<MovieRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Self::default()
            }
        }

        fn snapshot(&self) -> Vec<MovieRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MovieStore for MemoryStore {
        fn backend(&self) -> &'static str {
            "memory"
        }

        async fn search(&self, query: &MovieQuery) -> Result<MoviePage> {
            Ok(query::apply(self.snapshot(), query))
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<MovieRecord>> {
            Ok(self.snapshot().into_iter().find(|r| r.slug == slug))
        }

        async fn find_by_tmdb_id(&self, id: u64) -> Result<Option<MovieRecord>> {
            Ok(self
                .snapshot()
                .into_iter()
                .find(|r| stored_tmdb_id(r) == Some(id)))
        }

        async fn upsert_many(&self, records: &[MovieRecord]) -> Result<usize> {
            *self.upsert_calls.lock().unwrap() += 1;
            if let Some(bad) = self.reject
                && records.iter().any(|r| r.slug == bad)
            {
                return Err(CatalogError::InvalidData(format!("rejected {bad}")));
            }
            let mut stored = self.records.lock().unwrap();
            for record in records {
                match stored.iter_mut().find(|r| r.slug == record.slug) {
                    Some(existing) => *existing = record.clone(),
                    None => stored.push(record.clone()),
                }
            }
            Ok(records.len())
        }

        async fn export_all(&self) -> Result<Vec<MovieRecord>> {
            Ok(self.snapshot())
        }

        async fn clear(&self) -> Result<u64> {
            let mut stored = self.records.lock().unwrap();
            let removed = stored.len() as u64;
            stored.clear();
            Ok(removed)
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn movies(count: usize) -> Vec<MovieRecord> {
        (0..count)
            .map(|i| MovieRecord::new(format!("movie-{i}"), format!("Movie {i}")))
            .collect()
    }

    #[tokio::test]
    async fn import_batches_and_skips_blank_slugs() {
        let store = MemoryStore::default();
        let mut records = movies(1_200);
        records.push(MovieRecord::new("  ", "No Slug"));

        let report = import_records(&store, records, false).await.unwrap();

        assert_eq!(report.total, 1_201);
        assert_eq!(report.written, 1_200);
        assert_eq!(report.skipped, 1);
        assert_eq!(*store.upsert_calls.lock().unwrap(), 3);
        assert_eq!(store.snapshot().len(), 1_200);
    }

    #[tokio::test]
    async fn failed_batch_falls_back_to_single_rows() {
        let store = MemoryStore {
            reject: Some("movie-2"),
            ..MemoryStore::default()
        };

        let report = import_records(&store, movies(4), false).await.unwrap();

        assert_eq!(report.written, 3);
        assert_eq!(report.failed, 1);
        assert!(store.snapshot().iter().all(|r| r.slug != "movie-2"));
    }

    #[tokio::test]
    async fn replace_clears_first() {
        let store = MemoryStore::with(vec![MovieRecord::new("old", "Old")]);
        let report = import_records(&store, movies(2), true).await.unwrap();
        assert_eq!(report.cleared, 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn read_only_targets_are_rejected() {
        let bundled = BundledStore::from_records(movies(1), PathBuf::from("mem"));
        let err = import_records(&bundled, movies(1), false).await.unwrap_err();
        assert!(matches!(err, CatalogError::ReadOnly { backend: "bundled" }));

        let source = MemoryStore::with(movies(1));
        assert!(migrate(&source, &bundled, false).await.is_err());
    }

    #[tokio::test]
    async fn migrate_copies_everything_including_untitled() {
        let mut records = movies(3);
        records[1].title = None;
        let source = BundledStore::from_records(records.clone(), PathBuf::from("mem"));
        let target = MemoryStore::default();

        let report = migrate(&source, &target, false).await.unwrap();

        assert_eq!(report.written, 3);
        assert_eq!(target.snapshot(), records);
    }

    #[tokio::test]
    async fn persist_enrichment_writes_back_matches_only() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_movie_by_title().returning(|title, _| {
            (title == "Movie 1").then(|| TmdbMovieDetails {
                id: 77,
                title: "Movie One".into(),
                ..TmdbMovieDetails::default()
            })
        });
        let enricher =
            MovieEnricher::new(Arc::new(mock)).with_pacing(Duration::ZERO);
        let store = MemoryStore::with(movies(3));

        let report = persist_enrichment(&store, &enricher, 10, 0, true)
            .await
            .unwrap();

        assert_eq!(report, EnrichmentReport { scanned: 3, enriched: 1, written: 1 });

        let stored = store.find_by_tmdb_id(77).await.unwrap().unwrap();
        assert_eq!(stored.slug, "movie-1");
        assert_eq!(stored.title.as_deref(), Some("Movie 1"));
        assert_eq!(stored.extra["tmdb_title"], "Movie One");
        assert!(stored.extra.contains_key(ENRICHED_AT_FIELD));

        let untouched = store.find_by_slug("movie-0").await.unwrap().unwrap();
        assert!(untouched.extra.is_empty());
    }
}
