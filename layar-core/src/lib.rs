//! # Layar Core
//!
//! Enrichment pipeline, record stores and migrations behind the Layar movie
//! catalog.
//!
//! ## Architecture
//!
//! - [`providers`]: the [`MetadataProvider`] seam and its TMDB client
//! - [`enrichment`]: title matching, field mapping and the paced batch
//!   enricher
//! - [`database`]: the [`MovieStore`] trait with bundled file, PostgreSQL and
//!   Redis implementations
//! - [`query`]: in-memory filter, sort and pagination shared by the
//!   non-relational stores
//! - [`migration`]: imports, store-to-store copies and persisted enrichment
//!
//! ## Example
//!
//! ```no_run
//! use layar_core::{BundledStore, MovieEnricher, MovieStore, TmdbClient};
//! use layar_core::providers::tmdb::TMDB_API_BASE;
//! use layar_model::MovieQuery;
//! use std::{path::PathBuf, sync::Arc, time::Duration};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = BundledStore::open(&[PathBuf::from("data/movies.json")]).await?;
//! let client = TmdbClient::new("api-key", TMDB_API_BASE, "en-US", Duration::from_secs(10))?;
//! let enricher = MovieEnricher::new(Arc::new(client));
//!
//! let page = store.search(&MovieQuery::default()).await?;
//! let entries = enricher.enrich_prefix(page.movies, 20, true).await;
//! # let _ = entries;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod enrichment;
pub mod error;
pub mod migration;
pub mod providers;
pub mod query;

pub use database::{BundledStore, MovieStore, PostgresStore, RedisStore};
pub use enrichment::{
    BatchSummary, DEFAULT_BATCH_CAP, DEFAULT_PACING, MovieEnricher,
    PacingPolicy,
};
pub use error::{CatalogError, Result};
pub use migration::{EnrichmentReport, ImportReport};
pub use providers::{ImageBase, MetadataProvider, ProviderError, TmdbClient};
