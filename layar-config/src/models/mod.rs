pub mod sources;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_TMDB_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
pub const DEFAULT_TABLE_NAME: &str = "movies";
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "layar";

/// Bundled dataset locations tried in order when none is configured.
pub const DEFAULT_DATA_PATHS: [&str; 3] = [
    "data/movie_details_FINAL.json",
    "data/movies.json",
    "movies.json",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub tmdb: TmdbConfig,
    pub enrichment: EnrichmentConfig,
    pub cors: CorsConfig,
    pub dev_mode: bool,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Enrichment needs an API key; without one every request is served
    /// from local data only.
    pub fn enrichment_enabled(&self) -> bool {
        self.tmdb.api_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Bundled,
    Postgres,
    Redis,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Bundled => "bundled",
            StoreBackend::Postgres => "postgres",
            StoreBackend::Redis => "redis",
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, StoreBackend::Bundled)
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bundled" | "file" | "json" => Ok(StoreBackend::Bundled),
            "postgres" | "postgresql" | "supabase" => Ok(StoreBackend::Postgres),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(format!(
                "unknown store backend `{other}` (expected bundled, postgres or redis)"
            )),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Explicit bundled dataset path. When unset the
    /// [`DEFAULT_DATA_PATHS`] are tried in order.
    pub data_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn data_candidates(&self) -> Vec<PathBuf> {
        match &self.data_path {
            Some(path) => vec![path.clone()],
            None => DEFAULT_DATA_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub primary_url: Option<String>,
    pub table: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

#[derive(Clone)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_base_url: String,
    pub language: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("image_base_url", &self.image_base_url)
            .field("language", &self.language)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Wait between every pair of records.
    #[default]
    Always,
    /// Skip the wait after a record answered from the batch cache.
    SkipCacheHits,
}

impl std::str::FromStr for PacingMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(PacingMode::Always),
            "skip_cache_hits" | "skip-cache-hits" => {
                Ok(PacingMode::SkipCacheHits)
            }
            other => Err(format!("unknown pacing mode `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub pacing: Duration,
    pub pacing_mode: PacingMode,
    /// Upper bound on records enriched per list request.
    pub batch_cap: usize,
    pub use_cache: bool,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
