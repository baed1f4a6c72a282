use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use layar_config::{Config, ConfigLoad, ConfigLoader, StoreBackend};
use layar_core::{
    BundledStore, MovieStore, PostgresStore,
    database::bundled::{parse_csv_dataset, parse_dataset},
    migration,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use layar_server::{
    AppState, create_app,
    infra::startup::{build_enricher, open_store},
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "layar-server")]
#[command(about = "Movie catalog API with TMDB enrichment")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Path to a layar.toml file
    #[arg(long, env = "LAYAR_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Create the PostgreSQL table and indexes
    Setup {
        /// Drop the table first
        #[arg(long)]
        drop: bool,
    },
    /// Load the bundled JSON dataset, or a CSV export, into a writable store
    Import {
        /// Dataset to read instead of the configured bundled path
        #[arg(long)]
        file: Option<PathBuf>,
        /// CSV export with a header row to read instead of a JSON dataset
        #[arg(long, conflicts_with = "file")]
        csv: Option<PathBuf>,
        /// Target store (defaults to the configured backend)
        #[arg(long)]
        to: Option<StoreBackend>,
        /// Remove existing records first
        #[arg(long)]
        replace: bool,
    },
    /// Copy every record from one store to another
    Migrate {
        #[arg(long)]
        from: StoreBackend,
        #[arg(long)]
        to: StoreBackend,
        /// Remove existing records in the target first
        #[arg(long)]
        replace: bool,
    },
    /// Enrich a page of stored records and persist the TMDB fields
    Enrich {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Store to update (defaults to the configured backend)
        #[arg(long)]
        store: Option<StoreBackend>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_runtime_config(&cli.serve)?;

    match cli.command {
        None | Some(Command::Serve) => run_server(config).await,
        Some(Command::Db(command)) => run_db_command(config, command).await,
    }
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }

    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "loaded configuration file");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    info!(
        store = %config.store.backend,
        enrichment = config.enrichment_enabled(),
        enrichment.pacing_ms = config.enrichment.pacing.as_millis() as u64,
        enrichment.batch_cap = config.enrichment.batch_cap,
        enrichment.cache = config.enrichment.use_cache,
        "configuration in effect"
    );

    Ok(config)
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config, config.store.backend).await?;
    let enricher = build_enricher(&config)?.map(Arc::new);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(store, enricher, Arc::new(config));
    let router = create_app(state);

    info!("Starting Layar movie API on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn run_db_command(
    config: Config,
    command: DbCommand,
) -> anyhow::Result<()> {
    match command {
        DbCommand::Setup { drop } => {
            let url = config
                .database
                .primary_url
                .as_deref()
                .context("DATABASE_URL is required for db setup")?;
            let store = PostgresStore::connect(
                url,
                &config.database.table,
                config.database.max_connections,
            )
            .await
            .context("failed to connect to PostgreSQL")?;
            store
                .initialize_schema(drop)
                .await
                .context("schema setup failed")?;
            info!(table = store.table(), "database schema applied");
        }
        DbCommand::Import {
            file,
            csv,
            to,
            replace,
        } => {
            let backend = writable_backend(to.unwrap_or(config.store.backend))?;
            let records = match (file, csv) {
                (_, Some(path)) => {
                    let bytes = read_file(&path).await?;
                    parse_csv_dataset(&bytes).with_context(|| {
                        format!("failed to parse {}", path.display())
                    })?
                }
                (Some(path), None) => {
                    let bytes = read_file(&path).await?;
                    parse_dataset(&bytes).context("failed to parse dataset")?
                }
                (None, None) => BundledStore::open(&config.store.data_candidates())
                    .await
                    .context("failed to load bundled dataset")?
                    .export_all()
                    .await?,
            };

            let target = open_store(&config, backend).await?;
            let report = migration::import_records(target.as_ref(), records, replace)
                .await
                .context("import failed")?;
            info!(
                written = report.written,
                skipped = report.skipped,
                failed = report.failed,
                "import complete"
            );
        }
        DbCommand::Migrate { from, to, replace } => {
            if from == to {
                bail!("source and target store are both `{from}`");
            }
            let target = writable_backend(to)?;
            let source = open_store(&config, from).await?;
            let target = open_store(&config, target).await?;
            let report =
                migration::migrate(source.as_ref(), target.as_ref(), replace)
                    .await
                    .context("migration failed")?;
            info!(
                from = %from,
                to = %to,
                written = report.written,
                failed = report.failed,
                "migration complete"
            );
        }
        DbCommand::Enrich {
            limit,
            offset,
            store,
        } => {
            let backend = writable_backend(store.unwrap_or(config.store.backend))?;
            let Some(enricher) = build_enricher(&config)? else {
                bail!("TMDB_API_KEY is required for db enrich");
            };
            let store = open_store(&config, backend).await?;
            let report = migration::persist_enrichment(
                store.as_ref(),
                &enricher,
                limit,
                offset,
                config.enrichment.use_cache,
            )
            .await
            .context("enrichment failed")?;
            info!(
                scanned = report.scanned,
                enriched = report.enriched,
                written = report.written,
                "enrichment persisted"
            );
        }
    }
    Ok(())
}

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn writable_backend(backend: StoreBackend) -> anyhow::Result<StoreBackend> {
    if backend.is_writable() {
        Ok(backend)
    } else {
        bail!("the `{backend}` store is read-only; pick postgres or redis")
    }
}
