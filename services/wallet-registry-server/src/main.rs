//! Wallet Registry Server
//!
//! Serves the wallet registry REST API.
//!
//! # Usage
//!
//! ```bash
//! # Start with config/default.toml and config/local.toml
//! wallet-registry-server
//!
//! # Local development without PostgreSQL
//! wallet-registry-server --dev-mode --in-memory
//!
//! # Print a bearer token for a user (dev mode only)
//! wallet-registry-server --dev-mode --print-dev-token 6f1c2b1e-6a43-4a53-9d8d-0d0c3c9b7f11
//!
//! # Environment overrides
//! WALLET_REGISTRY__SERVER__PORT=8080 wallet-registry-server
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use wallet_registry_api::{create_router, ApiConfig, AppState};
use wallet_registry_auth::{config::PLACEHOLDER_SECRET, AuthService, JwtConfig};
use wallet_registry_core::WalletMutationService;
use wallet_registry_db::{MemoryWalletStore, PgWalletStore, WalletStore};

use crate::config::ServerConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Wallet Registry Server
#[derive(Parser, Debug)]
#[command(name = "wallet-registry-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "WALLET_REGISTRY_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "WALLET_REGISTRY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WALLET_REGISTRY_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WALLET_REGISTRY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "WALLET_REGISTRY_LOG_FORMAT")]
    log_format: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// JWT secret key
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Keep wallets in process memory instead of PostgreSQL
    #[arg(long)]
    in_memory: bool,

    /// Enable development mode (relaxed security)
    #[arg(long, env = "WALLET_REGISTRY_DEV_MODE")]
    dev_mode: bool,

    /// Print an access token for this user and exit (dev mode only)
    #[arg(long, value_name = "USER_ID")]
    print_dev_token: Option<Uuid>,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    apply_args(&mut server_config, &args);

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Wallet Registry Server"
    );

    validate_config(&mut server_config, args.dev_mode)?;

    let auth = Arc::new(AuthService::new(server_config.jwt.clone()));

    if let Some(user_id) = args.print_dev_token {
        if !args.dev_mode {
            anyhow::bail!("--print-dev-token requires --dev-mode");
        }
        let token = auth.jwt.issue_access_token(user_id)?;
        println!("{}", token.token);
        return Ok(());
    }

    let store = init_store(&server_config.database).await?;
    let registry = Arc::new(WalletMutationService::new(
        store,
        server_config.registry.clone(),
    ));

    tracing::info!(
        max_attempts = server_config.registry.retry.max_attempts,
        operation_timeout_ms = server_config.registry.operation_timeout.as_millis() as u64,
        verify_invariants = server_config.registry.verify_invariants,
        "Registry service initialized"
    );

    let state = Arc::new(AppState::new(registry, auth));
    let app = create_router(state, ApiConfig::from(&server_config.api));

    if server_config.metrics.enabled {
        start_metrics_server(&server_config.metrics)?;
    }

    let addr = server_config.server.socket_addr()?;

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Override configuration with CLI arguments
fn apply_args(config: &mut ServerConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db_url) = &args.database_url {
        config.database.postgres_url = db_url.clone();
    }
    if let Some(jwt_secret) = &args.jwt_secret {
        config.jwt.secret = jwt_secret.clone();
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &args.log_format {
        config.logging.format = format.clone();
    }
    if args.in_memory {
        config.database.in_memory = true;
    }
}

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .try_init()?;
        }
    }

    Ok(())
}

/// Validate configuration
///
/// In dev mode a missing or placeholder JWT secret is replaced with the
/// well-known development secret.
fn validate_config(config: &mut ServerConfig, dev_mode: bool) -> anyhow::Result<()> {
    let weak_secret = config.jwt.secret.is_empty() || config.jwt.secret == PLACEHOLDER_SECRET;

    if dev_mode {
        if weak_secret {
            tracing::warn!("Using the development JWT secret; do not expose this server");
            config.jwt.secret = JwtConfig::development().secret;
        }
        if config.database.in_memory {
            tracing::warn!("Wallets are stored in memory and lost on restart");
        }
        return Ok(());
    }

    if weak_secret {
        anyhow::bail!(
            "JWT secret must be changed in production. Set JWT_SECRET environment variable."
        );
    }
    config
        .jwt
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid JWT configuration: {}", e))?;

    if config.database.in_memory {
        tracing::warn!("Running with the in-memory wallet store outside dev mode");
    }
    if !config.registry.verify_invariants {
        tracing::info!("Pre-commit invariant checks are disabled");
    }

    Ok(())
}

/// Open the wallet store
async fn init_store(config: &config::DatabaseSettings) -> anyhow::Result<Arc<dyn WalletStore>> {
    if config.in_memory {
        tracing::info!("Using in-memory wallet store");
        return Ok(Arc::new(MemoryWalletStore::new()));
    }

    let store = PgWalletStore::connect(&config.to_db_config()).await?;

    if config.run_migrations {
        store.migrate().await?;
    }

    store.ping().await?;
    tracing::info!("Wallet store health check passed");

    Ok(Arc::new(store))
}

/// Start Prometheus metrics exporter
fn start_metrics_server(config: &config::MetricsConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(port = config.port, "Metrics exporter started");

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
