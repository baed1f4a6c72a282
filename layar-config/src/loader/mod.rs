pub mod db_url;
pub mod error;

use once_cell::sync::Lazy;
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    models::{
        Config, ConfigMetadata, CorsConfig, DEFAULT_REDIS_KEY_PREFIX,
        DEFAULT_TABLE_NAME, DEFAULT_TMDB_BASE_URL,
        DEFAULT_TMDB_IMAGE_BASE_URL, DatabaseConfig, EnrichmentConfig,
        RedisConfig, ServerConfig, StoreBackend, StoreConfig, TmdbConfig,
        sources::{EnvConfig, FileConfig},
    },
    util::parse_duration,
    validation::{self, ConfigWarnings},
};

pub use error::ConfigLoadError;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("layar.toml"),
        PathBuf::from("config/layar.toml"),
    ]
});

const DEFAULT_PACING: Duration = Duration::from_millis(100);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BATCH_CAP: usize = 20;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let env_config = EnvConfig::gather();
        self.load_with_env(env_config, env_file_loaded)
    }

    /// Same as [`ConfigLoader::load`] with an explicit environment snapshot
    /// instead of the process environment.
    pub fn load_with_env(
        &self,
        env_config: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) = compose_config(
            file_config,
            env_config,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = match (
            &self.options.config_path,
            &env_config.config_path,
        ) {
            (Some(path), _) | (None, Some(path)) => (path.clone(), true),
            (None, None) => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => (path.clone(), false),
                None => return Ok((None, None)),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No layar.toml detected; using environment variables and defaults",
            "Create layar.toml or point LAYAR_CONFIG_PATH at a config file",
        );
    }

    let FileConfig {
        server: file_server,
        store: file_store,
        database: file_database,
        redis: file_redis,
        tmdb: file_tmdb,
        enrichment: file_enrichment,
        cors: file_cors,
        dev_mode: file_dev_mode,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(3000),
    };

    let backend = match env.store_backend.as_deref() {
        Some(raw) => raw.parse::<StoreBackend>().map_err(|reason| {
            ConfigLoadError::InvalidValue {
                key: "LAYAR_STORE",
                reason,
            }
        })?,
        None => file_store.backend.unwrap_or_default(),
    };
    let store = StoreConfig {
        backend,
        data_path: env.data_path.clone().or(file_store.data_path),
    };

    let database = DatabaseConfig {
        primary_url: db_url::resolve_database_url(&env, &file_database)?,
        table: env
            .table_name
            .clone()
            .or(file_database.table)
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS),
    };

    let redis_prefix = env.redis_key_prefix.clone().or_else(|| {
        file_redis.as_ref().and_then(|r| r.key_prefix.clone())
    });
    let redis = env
        .redis_url
        .clone()
        .or_else(|| file_redis.map(|r| r.url))
        .map(|url| RedisConfig {
            url,
            key_prefix: redis_prefix
                .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_string()),
        });

    let tmdb = TmdbConfig {
        api_key: env
            .tmdb_api_key
            .clone()
            .or(file_tmdb.api_key)
            .filter(|key| !key.trim().is_empty()),
        base_url: env
            .tmdb_base_url
            .clone()
            .or(file_tmdb.base_url)
            .unwrap_or_else(|| DEFAULT_TMDB_BASE_URL.to_string()),
        image_base_url: env
            .tmdb_image_base_url
            .clone()
            .or(file_tmdb.image_base_url)
            .unwrap_or_else(|| DEFAULT_TMDB_IMAGE_BASE_URL.to_string()),
        language: env
            .tmdb_language
            .clone()
            .or(file_tmdb.language)
            .unwrap_or_else(|| "en-US".to_string()),
        request_timeout: match env.tmdb_request_timeout {
            Some(timeout) => timeout,
            None => file_duration(
                "tmdb.request_timeout",
                file_tmdb.request_timeout.as_deref(),
            )?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        },
    };

    let pacing_mode = match env.enrichment_pacing_mode.as_deref() {
        Some(raw) => raw.parse().map_err(|reason| {
            ConfigLoadError::InvalidValue {
                key: "ENRICHMENT_PACING_MODE",
                reason,
            }
        })?,
        None => file_enrichment.pacing_mode.unwrap_or_default(),
    };
    let enrichment = EnrichmentConfig {
        pacing: match env.enrichment_pacing {
            Some(pacing) => pacing,
            None => file_duration(
                "enrichment.pacing",
                file_enrichment.pacing.as_deref(),
            )?
            .unwrap_or(DEFAULT_PACING),
        },
        pacing_mode,
        batch_cap: env
            .enrichment_batch_cap
            .or(file_enrichment.batch_cap)
            .unwrap_or(DEFAULT_BATCH_CAP),
        use_cache: env
            .enrichment_use_cache
            .or(file_enrichment.use_cache)
            .unwrap_or(true),
    };

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .clone()
            .or(file_cors.allowed_origins)
            .unwrap_or_else(default_cors_origins),
        allowed_methods: env
            .cors_allowed_methods
            .clone()
            .or(file_cors.allowed_methods)
            .unwrap_or_else(default_cors_methods),
        allowed_headers: env
            .cors_allowed_headers
            .clone()
            .or(file_cors.allowed_headers)
            .unwrap_or_else(default_cors_headers),
    };

    let dev_mode = env.dev_mode.or(file_dev_mode).unwrap_or(false);

    let config = Config {
        server,
        store,
        database,
        redis,
        tmdb,
        enrichment,
        cors,
        dev_mode,
        metadata,
    };

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

fn file_duration(
    key: &'static str,
    raw: Option<&str>,
) -> Result<Option<Duration>, ConfigLoadError> {
    raw.map(|raw| {
        parse_duration(raw).ok_or_else(|| ConfigLoadError::InvalidValue {
            key,
            reason: format!("`{raw}` is not a duration (try \"100ms\" or \"10s\")"),
        })
    })
    .transpose()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET".to_string(), "OPTIONS".to_string()]
}

fn default_cors_headers() -> Vec<String> {
    vec!["Content-Type".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigGuardRailError, PacingMode};
    use std::io::Write;

    fn load(toml: &str, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        ConfigLoader::new()
            .with_config_path(file.path())
            .load_with_env(env, false)
    }

    #[test]
    fn defaults_without_any_source() {
        let (config, warnings) = compose_config(
            None,
            EnvConfig::default(),
            ConfigMetadata::default(),
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.store.backend, StoreBackend::Bundled);
        assert_eq!(config.database.table, "movies");
        assert_eq!(config.tmdb.base_url, DEFAULT_TMDB_BASE_URL);
        assert_eq!(config.tmdb.language, "en-US");
        assert_eq!(config.enrichment.pacing, Duration::from_millis(100));
        assert_eq!(config.enrichment.pacing_mode, PacingMode::Always);
        assert_eq!(config.enrichment.batch_cap, 20);
        assert!(config.enrichment.use_cache);
        assert_eq!(config.cors.allowed_origins, vec!["*"]);
        assert_eq!(config.cors.allowed_methods, vec!["GET", "OPTIONS"]);
        assert_eq!(config.cors.allowed_headers, vec!["Content-Type"]);
        assert!(!config.enrichment_enabled());

        let messages: Vec<_> =
            warnings.items.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("No layar.toml")));
        assert!(messages.iter().any(|m| m.contains("TMDB_API_KEY")));
    }

    #[test]
    fn file_values_are_applied() {
        let loaded = load(
            r#"
                dev_mode = true

                [server]
                port = 8080

                [store]
                backend = "redis"

                [redis]
                url = "redis://127.0.0.1:6379"

                [tmdb]
                api_key = "file-key"
                request_timeout = "5s"

                [enrichment]
                pacing = "250ms"
                pacing_mode = "skip_cache_hits"
                batch_cap = 5
            "#,
            EnvConfig::default(),
        )
        .unwrap();

        let config = loaded.config;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        let redis = config.redis.unwrap();
        assert_eq!(redis.url, "redis://127.0.0.1:6379");
        assert_eq!(redis.key_prefix, "layar");
        assert_eq!(config.tmdb.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.tmdb.request_timeout, Duration::from_secs(5));
        assert_eq!(config.enrichment.pacing, Duration::from_millis(250));
        assert_eq!(config.enrichment.pacing_mode, PacingMode::SkipCacheHits);
        assert_eq!(config.enrichment.batch_cap, 5);
        assert!(config.dev_mode);
        assert!(config.metadata.config_path.is_some());
    }

    #[test]
    fn env_overrides_file() {
        let env = EnvConfig {
            server_port: Some(9000),
            tmdb_api_key: Some("env-key".into()),
            enrichment_batch_cap: Some(3),
            ..EnvConfig::default()
        };
        let config = load(
            "[server]\nport = 8080\n[tmdb]\napi_key = \"file-key\"\n",
            env,
        )
        .unwrap()
        .config;

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.tmdb.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.enrichment.batch_cap, 3);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path("/definitely/not/here/layar.toml")
            .load_with_env(EnvConfig::default(), false)
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = load("[store]\nbackend = \"postgres\"\n", EnvConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn unknown_backend_in_env_is_rejected() {
        let env = EnvConfig {
            store_backend: Some("mongodb".into()),
            ..EnvConfig::default()
        };
        let err = compose_config(None, env, ConfigMetadata::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue {
                key: "LAYAR_STORE",
                ..
            }
        ));
    }

    #[test]
    fn bad_duration_in_file_is_rejected() {
        let err = load("[enrichment]\npacing = \"soon\"\n", EnvConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue {
                key: "enrichment.pacing",
                ..
            }
        ));
    }
}
