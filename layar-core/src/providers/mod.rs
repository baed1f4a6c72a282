//! External metadata lookups.
//!
//! [`MetadataProvider`] is the seam the enricher talks to. Implementations
//! absorb their own failures: a lookup either produces a record or `None`.

pub mod tmdb;

use async_trait::async_trait;
use layar_model::{TmdbMovieDetails, TmdbSearchResult};
use std::fmt;

pub use tmdb::{
    BackdropSize, ImageBase, PosterSize, ProfileSize, ProviderError,
    TmdbClient,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync + fmt::Debug {
    /// First search hit for `title`, narrowed by release year when given.
    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Option<TmdbSearchResult>;

    /// Full details (credits and videos included) for a provider id.
    async fn movie_details(&self, id: u64) -> Option<TmdbMovieDetails>;

    /// Search, then fetch details for the first hit.
    async fn movie_by_title(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Option<TmdbMovieDetails> {
        let hit = self.search_movie(title, year).await?;
        self.movie_details(hit.id).await
    }
}
