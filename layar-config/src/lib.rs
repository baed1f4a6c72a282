//! Shared configuration library for Layar.
//!
//! Configuration is layered: a `.env` file is loaded into the process
//! environment, an optional TOML file supplies defaults, and environment
//! variables override both. The server binary and the database tooling
//! share this crate so defaults and validation rules live in one place.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    Config, ConfigMetadata, CorsConfig, DatabaseConfig, EnrichmentConfig,
    PacingMode, RedisConfig, ServerConfig, StoreBackend, StoreConfig,
    TmdbConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
