//! Core data model definitions shared across Layar crates.

pub mod enriched;
pub mod lenient;
pub mod movie;
pub mod query;
pub mod tmdb;

// Intentionally curated re-exports for downstream consumers.
pub use enriched::{CastCredit, EnrichedMovie, MovieEntry, Trailer};
pub use movie::{MovieRecord, PlayerServers};
pub use query::{MoviePage, MovieQuery, SortField, SortOrder};
pub use tmdb::{
    TmdbCastMember, TmdbCredits, TmdbCrewMember, TmdbMovieDetails, TmdbNamed,
    TmdbSearchResponse, TmdbSearchResult, TmdbVideo, TmdbVideos,
};
