use axum::http::{Method, header::HeaderName};
use layar_core::database::postgres::is_sql_identifier;
use thiserror::Error;
use url::Url;

use crate::models::{Config, CorsConfig, StoreBackend};

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("invalid CORS configuration: {reason}")]
    InvalidCorsConfig { reason: String },
    #[error("store backend `postgres` selected but DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("store backend `redis` selected but REDIS_URL is not set")]
    MissingRedisUrl,
    #[error("table name `{name}` is not a plain SQL identifier")]
    InvalidTableName { name: String },
    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    validate_cors(&config.cors)?;

    if !is_sql_identifier(&config.database.table) {
        return Err(ConfigGuardRailError::InvalidTableName {
            name: config.database.table.clone(),
        });
    }

    for (field, value) in [
        ("TMDB_BASE_URL", &config.tmdb.base_url),
        ("TMDB_IMAGE_BASE_URL", &config.tmdb.image_base_url),
    ] {
        if Url::parse(value).is_err() {
            return Err(ConfigGuardRailError::InvalidUrl {
                field,
                value: value.clone(),
            });
        }
    }

    match config.store.backend {
        StoreBackend::Postgres if config.database.primary_url.is_none() => {
            return Err(ConfigGuardRailError::MissingDatabaseUrl);
        }
        StoreBackend::Redis if config.redis.is_none() => {
            return Err(ConfigGuardRailError::MissingRedisUrl);
        }
        _ => {}
    }

    if config.tmdb.api_key.is_none() {
        warnings.push_with_hint(
            "TMDB_API_KEY not set; enrichment is disabled and records are served as stored",
            "Create an API key at https://www.themoviedb.org/settings/api and set TMDB_API_KEY",
        );
    }

    if config.enrichment.batch_cap == 0 {
        warnings.push(
            "Enrichment batch cap is 0; list requests will never be enriched",
        );
    }

    if config.enrichment.pacing.is_zero() {
        warnings.push_with_hint(
            "Enrichment pacing is 0; batches will hit TMDB back to back",
            "TMDB rate limits bursts; keep ENRICHMENT_PACING at 100ms or more",
        );
    }

    if !config.dev_mode && config.cors.is_wildcard_included() {
        warnings.push_with_hint(
            "CORS allows any origin",
            "Set CORS_ALLOWED_ORIGINS to restrict browser access",
        );
    }

    Ok(warnings)
}

fn validate_cors(cors: &CorsConfig) -> Result<(), ConfigGuardRailError> {
    if cors.allowed_methods.is_empty() {
        return Err(ConfigGuardRailError::InvalidCorsConfig {
            reason:
                "CORS_ALLOWED_METHODS must include at least one HTTP method"
                    .into(),
        });
    }

    for method in &cors.allowed_methods {
        Method::from_bytes(method.as_bytes()).map_err(|_| {
            ConfigGuardRailError::InvalidCorsConfig {
                reason: format!(
                    "invalid HTTP method `{}` in CORS_ALLOWED_METHODS",
                    method
                ),
            }
        })?;
    }

    for header in &cors.allowed_headers {
        HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            ConfigGuardRailError::InvalidCorsConfig {
                reason: format!(
                    "invalid header name `{}` in CORS_ALLOWED_HEADERS",
                    header
                ),
            }
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        ConfigGuardRailError, ConfigLoadError, ConfigLoader,
        models::sources::EnvConfig,
    };
    use std::io::Write;

    fn load_with_table(table: &str) -> Result<(), ConfigLoadError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nbackend = \"bundled\"").unwrap();
        let env = EnvConfig {
            table_name: Some(table.to_string()),
            ..EnvConfig::default()
        };
        ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env, false)
            .map(|_| ())
    }

    #[test]
    fn test_table_name_must_be_plain_identifier() {
        assert!(load_with_table("_movies_2025").is_ok());
        for bad in [
            "2movies",
            "movies; DROP TABLE x",
            "a".repeat(64).as_str(),
        ] {
            assert!(
                matches!(
                    load_with_table(bad),
                    Err(ConfigLoadError::GuardRail(
                        ConfigGuardRailError::InvalidTableName { .. }
                    ))
                ),
                "{bad} should be rejected"
            );
        }
    }
}
