use async_trait::async_trait;
use layar_model::{TmdbMovieDetails, TmdbSearchResponse, TmdbSearchResult};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::{fmt, time::Duration};
use tracing::{debug, warn};

use super::MetadataProvider;

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Clone, Copy)]
pub enum PosterSize {
    W92,
    W154,
    W185,
    W342,
    W500,
    W780,
    Original,
}

impl PosterSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosterSize::W92 => "w92",
            PosterSize::W154 => "w154",
            PosterSize::W185 => "w185",
            PosterSize::W342 => "w342",
            PosterSize::W500 => "w500",
            PosterSize::W780 => "w780",
            PosterSize::Original => "original",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BackdropSize {
    W300,
    W780,
    W1280,
    Original,
}

impl BackdropSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackdropSize::W300 => "w300",
            BackdropSize::W780 => "w780",
            BackdropSize::W1280 => "w1280",
            BackdropSize::Original => "original",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ProfileSize {
    W45,
    W185,
    W500,
    H632,
    Original,
}

impl ProfileSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileSize::W45 => "w45",
            ProfileSize::W185 => "w185",
            ProfileSize::W500 => "w500",
            ProfileSize::H632 => "h632",
            ProfileSize::Original => "original",
        }
    }
}

/// Builds absolute image URLs from the relative paths TMDB returns.
#[derive(Debug, Clone)]
pub struct ImageBase {
    base: String,
}

impl Default for ImageBase {
    fn default() -> Self {
        Self::new(TMDB_IMAGE_BASE)
    }
}

impl ImageBase {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn poster(&self, path: &str, size: PosterSize) -> String {
        self.join(size.as_str(), path)
    }

    pub fn backdrop(&self, path: &str, size: BackdropSize) -> String {
        self.join(size.as_str(), path)
    }

    pub fn profile(&self, path: &str, size: ProfileSize) -> String {
        self.join(size.as_str(), path)
    }

    fn join(&self, size: &str, path: &str) -> String {
        format!("{}/{}{}", self.base, size, path)
    }
}

/// Thin TMDB v3 client over `reqwest`.
///
/// The inherent methods return [`ProviderError`]; the [`MetadataProvider`]
/// impl logs those and turns them into `None`.
#[derive(Clone)]
pub struct TmdbClient {
    http: Client,
    api_key: String,
    base_url: String,
    language: String,
}

impl fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .finish()
    }
}

impl TmdbClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidApiKey);
        }

        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into();

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.into(),
        })
    }

    pub async fn search(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<TmdbSearchResponse, ProviderError> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("query", title.to_string()),
            ("language", self.language.clone()),
        ];
        if let Some(year) = year {
            params.push(("year", year.to_string()));
        }

        self.get_json("/search/movie", &params).await
    }

    pub async fn details(
        &self,
        id: u64,
    ) -> Result<TmdbMovieDetails, ProviderError> {
        let params = [
            ("api_key", self.api_key.clone()),
            ("language", self.language.clone()),
            ("append_to_response", "credits,videos".to_string()),
        ];

        self.get_json(&format!("/movie/{id}"), &params).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(params).send().await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(ProviderError::InvalidApiKey),
            StatusCode::NOT_FOUND => return Err(ProviderError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited);
            }
            status if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Option<TmdbSearchResult> {
        match self.search(title, year).await {
            Ok(response) => {
                let first = response.results.into_iter().next();
                if first.is_none() {
                    debug!(title, ?year, "TMDB search returned no results");
                }
                first
            }
            Err(err) => {
                warn!(title, ?year, error = %err, "TMDB search failed");
                None
            }
        }
    }

    async fn movie_details(&self, id: u64) -> Option<TmdbMovieDetails> {
        match self.details(id).await {
            Ok(details) => Some(details),
            Err(err) => {
                warn!(tmdb_id = id, error = %err, "TMDB details fetch failed");
                None
            }
        }
    }
}
