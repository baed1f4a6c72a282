use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{
    non_empty_var, parse_bool_var, parse_csv_var, parse_duration_var,
    parse_var,
};

use super::{PacingMode, StoreBackend};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub store: FileStoreConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    pub redis: Option<FileRedisConfig>,
    #[serde(default)]
    pub tmdb: FileTmdbConfig,
    #[serde(default)]
    pub enrichment: FileEnrichmentConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
    pub dev_mode: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<StoreBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileRedisConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileTmdbConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// humantime string, e.g. `"10s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileEnrichmentConfig {
    /// humantime string, e.g. `"100ms"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing_mode: Option<PacingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_cap: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_cache: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_headers: Option<Vec<String>>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub store_backend: Option<String>,
    pub data_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub database_url_file: Option<PathBuf>,
    pub table_name: Option<String>,
    pub database_max_connections: Option<u32>,
    pub redis_url: Option<String>,
    pub redis_key_prefix: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: Option<String>,
    pub tmdb_image_base_url: Option<String>,
    pub tmdb_language: Option<String>,
    pub tmdb_request_timeout: Option<Duration>,
    pub enrichment_pacing: Option<Duration>,
    pub enrichment_pacing_mode: Option<String>,
    pub enrichment_batch_cap: Option<usize>,
    pub enrichment_use_cache: Option<bool>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub cors_allowed_methods: Option<Vec<String>>,
    pub cors_allowed_headers: Option<Vec<String>>,
    pub dev_mode: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var("LAYAR_CONFIG_PATH").map(PathBuf::from),
            server_host: non_empty_var("SERVER_HOST"),
            server_port: parse_var("SERVER_PORT").or_else(|| parse_var("PORT")),
            store_backend: non_empty_var("LAYAR_STORE"),
            data_path: non_empty_var("LAYAR_DATA_PATH").map(PathBuf::from),
            database_url: std::env::var("DATABASE_URL").ok(),
            database_url_file: non_empty_var("DATABASE_URL_FILE")
                .map(PathBuf::from),
            table_name: non_empty_var("TABLE_NAME"),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS"),
            redis_url: non_empty_var("REDIS_URL"),
            redis_key_prefix: non_empty_var("REDIS_KEY_PREFIX"),
            tmdb_api_key: non_empty_var("TMDB_API_KEY"),
            tmdb_base_url: non_empty_var("TMDB_BASE_URL"),
            tmdb_image_base_url: non_empty_var("TMDB_IMAGE_BASE_URL"),
            tmdb_language: non_empty_var("TMDB_LANGUAGE"),
            tmdb_request_timeout: parse_duration_var("TMDB_REQUEST_TIMEOUT"),
            enrichment_pacing: parse_duration_var("ENRICHMENT_PACING"),
            enrichment_pacing_mode: non_empty_var("ENRICHMENT_PACING_MODE"),
            enrichment_batch_cap: parse_var("ENRICHMENT_BATCH_CAP"),
            enrichment_use_cache: parse_bool_var("ENRICHMENT_CACHE"),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            cors_allowed_methods: parse_csv_var("CORS_ALLOWED_METHODS"),
            cors_allowed_headers: parse_csv_var("CORS_ALLOWED_HEADERS"),
            dev_mode: parse_bool_var("DEV_MODE"),
        }
    }
}
