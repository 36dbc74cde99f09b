use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_mirror_server::config;
use catalog_mirror_server::credential_store::SqliteCredentialStore;
use catalog_mirror_server::entity_store::{EntityStore, SqliteEntityStore};
use catalog_mirror_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use catalog_mirror_server::sync::{BackgroundTasks, SyncEngine};
use catalog_mirror_server::token::{TokenCipher, TokenLifecycleManager};
use catalog_mirror_server::upstream::{ClientCredentialsGrantor, UpstreamCatalogClient};

/// How long in-flight cascades may keep running after the server stopped.
const BACKGROUND_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing database files (entities.db, credentials.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the upstream catalog API.
    #[clap(long)]
    pub upstream_api_url: Option<String>,

    /// Token endpoint of the upstream accounts service.
    #[clap(long)]
    pub upstream_accounts_url: Option<String>,

    /// Timeout in seconds for upstream requests.
    #[clap(long, default_value_t = 30)]
    pub upstream_timeout_sec: u64,

    #[clap(long, env = "CATALOG_CLIENT_ID")]
    pub client_id: Option<String>,

    #[clap(long, env = "CATALOG_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Secret the stored upstream credential is encrypted with.
    #[clap(long, env = "CATALOG_TOKEN_KEY", hide_env_values = true)]
    pub token_encryption_key: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            upstream_api_url: args.upstream_api_url.clone(),
            upstream_accounts_url: args.upstream_accounts_url.clone(),
            upstream_timeout_sec: args.upstream_timeout_sec,
            client_id: args.client_id.clone(),
            client_secret: args.client_secret.clone(),
            token_encryption_key: args.token_encryption_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  upstream: {}", app_config.upstream.api_url);
    info!("  sync: {:?}", app_config.sync);

    metrics::init_metrics();

    let entity_store = Arc::new(SqliteEntityStore::new(app_config.entities_db_path())?);
    let credential_store = Arc::new(SqliteCredentialStore::new(
        app_config.credentials_db_path(),
    )?);

    let grantor = Arc::new(ClientCredentialsGrantor::new(
        app_config.upstream.accounts_url.clone(),
        app_config.upstream.client_id.clone(),
        app_config.upstream.client_secret.clone(),
        app_config.upstream.timeout_sec,
    )?);
    let cipher = TokenCipher::new(&app_config.token_encryption_key)
        .context("Invalid token encryption key")?;
    let token_manager = Arc::new(TokenLifecycleManager::new(
        credential_store,
        grantor,
        cipher,
    ));

    let gateway = Arc::new(UpstreamCatalogClient::new(
        app_config.upstream.api_url.clone(),
        token_manager.clone(),
        app_config.upstream.timeout_sec,
    )?);

    let tasks = BackgroundTasks::new();
    let sync_engine = Arc::new(SyncEngine::new(
        gateway,
        entity_store.clone(),
        tasks.clone(),
        app_config.sync.clone(),
    ));

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        signal_token.cancel();
    });

    // Block until the first credential is installed
    info!("Obtaining upstream credential...");
    let Some(first_check) = token_manager.wait_for_credential(&shutdown_token).await else {
        info!("Shutdown requested before a credential was obtained");
        return Ok(());
    };
    tokio::spawn(
        token_manager
            .clone()
            .run_refresh_loop(first_check, shutdown_token.clone()),
    );

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };
    let entity_store: Arc<dyn EntityStore> = entity_store;
    let result = run_server(
        server_config,
        sync_engine,
        entity_store,
        shutdown_token.clone(),
    )
    .await;
    info!("HTTP server stopped: {:?}", result);
    shutdown_token.cancel();

    if tasks.shutdown(BACKGROUND_DRAIN_TIMEOUT).await {
        info!("Background tasks drained");
    }
    result
}
