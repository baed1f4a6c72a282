//! TMDB enrichment pipeline.
//!
//! - [`title`]: title cleanup and year extraction used for matching
//! - [`mapper`]: pure merge of a provider record into a local one
//! - [`enricher`]: single-record enrichment and the paced batch loop

pub mod enricher;
pub mod mapper;
pub mod title;

pub use enricher::{
    BatchSummary, DEFAULT_BATCH_CAP, DEFAULT_PACING, MovieEnricher,
    PacingPolicy,
};
pub use mapper::{map_provider_to_local, map_with_images};
