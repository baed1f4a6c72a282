use futures::FutureExt;
use layar_model::{MovieEntry, MovieRecord};
use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tracing::{debug, error, info};

use super::{mapper::map_with_images, title};
use crate::providers::{ImageBase, MetadataProvider};

pub const DEFAULT_PACING: Duration = Duration::from_millis(100);
pub const DEFAULT_BATCH_CAP: usize = 20;

/// When the batch orchestrator waits between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacingPolicy {
    /// Between every pair of consecutive records.
    #[default]
    Always,
    /// Only after a record that actually reached the provider.
    SkipCacheHits,
}

/// Resolves local records against a [`MetadataProvider`].
///
/// Never fails: a record that cannot be matched, or whose lookup blows up,
/// comes back as [`MovieEntry::Local`] with its original contents.
#[derive(Debug, Clone)]
pub struct MovieEnricher {
    provider: Arc<dyn MetadataProvider>,
    images: ImageBase,
    pacing: Duration,
    pacing_policy: PacingPolicy,
}

/// Counters from one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub enriched: usize,
    pub cache_hits: usize,
}

impl MovieEnricher {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            images: ImageBase::default(),
            pacing: DEFAULT_PACING,
            pacing_policy: PacingPolicy::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_pacing_policy(mut self, policy: PacingPolicy) -> Self {
        self.pacing_policy = policy;
        self
    }

    pub fn with_image_base(mut self, images: ImageBase) -> Self {
        self.images = images;
        self
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Enriches a single record.
    pub async fn enrich_one(&self, record: &MovieRecord) -> MovieEntry {
        let Some(raw_title) = record.title_str() else {
            debug!(slug = %record.slug, "record has no title; skipping enrichment");
            return MovieEntry::Local(record.clone());
        };

        let year = title::match_year(record);
        let search_title = title::clean_title(raw_title);
        let provider = Arc::clone(&self.provider);

        let lookup = AssertUnwindSafe(async move {
            provider.movie_by_title(&search_title, year).await
        })
        .catch_unwind()
        .await;

        match lookup {
            Ok(Some(details)) => {
                debug!(
                    slug = %record.slug,
                    tmdb_id = details.id,
                    "matched record against TMDB"
                );
                MovieEntry::from(map_with_images(record, &details, &self.images))
            }
            Ok(None) => {
                debug!(slug = %record.slug, ?year, "no TMDB match");
                MovieEntry::Local(record.clone())
            }
            Err(panic) => {
                error!(
                    slug = %record.slug,
                    reason = panic_message(panic.as_ref()),
                    "enrichment lookup panicked; serving local record"
                );
                MovieEntry::Local(record.clone())
            }
        }
    }

    /// Enriches `records` in order, one provider lookup at a time.
    ///
    /// With `use_cache`, a slug seen earlier in the same call reuses that
    /// outcome instead of querying again. The cache lives for this call only.
    pub async fn enrich_batch(
        &self,
        records: &[MovieRecord],
        use_cache: bool,
    ) -> Vec<MovieEntry> {
        self.enrich_batch_with_summary(records, use_cache).await.0
    }

    pub async fn enrich_batch_with_summary(
        &self,
        records: &[MovieRecord],
        use_cache: bool,
    ) -> (Vec<MovieEntry>, BatchSummary) {
        let mut cache: HashMap<&str, MovieEntry> = HashMap::new();
        let mut out = Vec::with_capacity(records.len());
        let mut summary = BatchSummary {
            total: records.len(),
            ..BatchSummary::default()
        };

        for (index, record) in records.iter().enumerate() {
            let cached = if use_cache && !record.slug.is_empty() {
                cache.get(record.slug.as_str()).cloned()
            } else {
                None
            };

            let cache_hit = cached.is_some();
            let entry = match cached {
                Some(entry) => {
                    summary.cache_hits += 1;
                    entry
                }
                None => {
                    let entry = self.enrich_one(record).await;
                    if use_cache && !record.slug.is_empty() {
                        cache.insert(record.slug.as_str(), entry.clone());
                    }
                    entry
                }
            };

            if entry.is_enriched() {
                summary.enriched += 1;
            }
            out.push(entry);

            let is_last = index + 1 == records.len();
            let wait = match self.pacing_policy {
                PacingPolicy::Always => true,
                PacingPolicy::SkipCacheHits => !cache_hit,
            };
            if !is_last && wait && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        info!(
            total = summary.total,
            enriched = summary.enriched,
            cache_hits = summary.cache_hits,
            "enrichment batch finished"
        );

        (out, summary)
    }

    /// Enriches the first `cap` records and passes the rest through.
    pub async fn enrich_prefix(
        &self,
        records: Vec<MovieRecord>,
        cap: usize,
        use_cache: bool,
    ) -> Vec<MovieEntry> {
        let split = cap.min(records.len());
        let mut entries = self.enrich_batch(&records[..split], use_cache).await;
        entries.extend(records.into_iter().skip(split).map(MovieEntry::Local));
        entries
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
