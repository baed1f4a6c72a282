use std::sync::Arc;

use anyhow::{Context, Result};
use layar_config::{Config, PacingMode, StoreBackend};
use layar_core::{
    BundledStore, ImageBase, MovieEnricher, MovieStore, PacingPolicy,
    PostgresStore, RedisStore, TmdbClient,
};
use tracing::info;

/// Opens the store for `backend` using the connection settings in `config`.
pub async fn open_store(
    config: &Config,
    backend: StoreBackend,
) -> Result<Arc<dyn MovieStore>> {
    let store: Arc<dyn MovieStore> = match backend {
        StoreBackend::Bundled => {
            let candidates = config.store.data_candidates();
            Arc::new(
                BundledStore::open(&candidates)
                    .await
                    .context("failed to load bundled dataset")?,
            )
        }
        StoreBackend::Postgres => {
            let url = config
                .database
                .primary_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            Arc::new(
                PostgresStore::connect(
                    url,
                    &config.database.table,
                    config.database.max_connections,
                )
                .await
                .context("failed to connect to PostgreSQL")?,
            )
        }
        StoreBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .context("REDIS_URL is required for the redis store")?;
            Arc::new(
                RedisStore::connect(&redis.url, &redis.key_prefix)
                    .await
                    .context("failed to connect to Redis")?,
            )
        }
    };

    info!(backend = store.backend(), "store ready");
    Ok(store)
}

/// Builds the enricher, or `None` when no TMDB key is configured.
pub fn build_enricher(config: &Config) -> Result<Option<MovieEnricher>> {
    let Some(api_key) = config.tmdb.api_key.as_deref() else {
        return Ok(None);
    };

    let client = TmdbClient::new(
        api_key,
        config.tmdb.base_url.as_str(),
        config.tmdb.language.as_str(),
        config.tmdb.request_timeout,
    )
    .context("failed to build TMDB client")?;

    let policy = match config.enrichment.pacing_mode {
        PacingMode::Always => PacingPolicy::Always,
        PacingMode::SkipCacheHits => PacingPolicy::SkipCacheHits,
    };

    Ok(Some(
        MovieEnricher::new(Arc::new(client))
            .with_pacing(config.enrichment.pacing)
            .with_pacing_policy(policy)
            .with_image_base(ImageBase::new(config.tmdb.image_base_url.as_str())),
    ))
}
