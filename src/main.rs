//! Main entry point for the Gomoku relay server
//!
//! Loads configuration, initializes logging, serves the game socket and
//! status endpoints, and shuts down gracefully on SIGINT or SIGTERM.

use anyhow::Result;
use clap::Parser;
use gomoku_relay::config::{validate_config, AppConfig};
use gomoku_relay::service::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Gomoku Relay - pairs players and relays their moves
#[derive(Parser)]
#[command(
    name = "gomoku-relay",
    version,
    about = "Matchmaking and move relay server for two-player Gomoku",
    long_about = "Gomoku Relay accepts WebSocket connections, pairs waiting players in arrival \
                 order, and forwards each move to the opponent. Every player runs the board \
                 rules locally; the server only relays. A UDP beacon advertises the server on \
                 the local network."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Listener port override
    #[arg(short, long, value_name = "PORT", help = "Override listener port")]
    port: Option<u16>,

    /// Listener host override
    #[arg(long, value_name = "HOST", help = "Override listener host")]
    host: Option<String>,

    /// Disable the discovery beacon
    #[arg(long, help = "Do not broadcast the server address on the LAN")]
    no_discovery: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Log session activity periodically
async fn stats_log_task(app_state: Arc<RwLock<AppState>>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));

    loop {
        interval.tick().await;

        let app_state = app_state.read().await;
        if !app_state.is_running().await {
            break;
        }

        let health = app_state.health();
        if health.is_healthy() {
            info!(
                "Health check: {} - {} connections, {} waiting, {} active matches",
                health.status,
                health.stats.connections,
                health.stats.players_waiting,
                health.stats.active_matches
            );
        } else {
            warn!("Health check: {} - {:?}", health.status, health.checks);
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Gomoku Relay");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   Game endpoint: ws://{}{}",
        config.bind_address(),
        config.server.game_path
    );
    if config.discovery.enabled {
        info!(
            "   Discovery: every {}ms from port {} to port {}",
            config.discovery.interval_ms,
            config.discovery.bind_port,
            config.discovery.broadcast_port
        );
    } else {
        info!("   Discovery: disabled");
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file or environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(config_path) => AppConfig::from_file(config_path)?,
        None => AppConfig::from_env()?,
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }

    if args.no_discovery {
        config.discovery.enabled = false;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Some(path) = &args.config {
        info!("Loaded configuration from: {}", path.display());
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let app_state = Arc::new(RwLock::new(app_state));
    let stats_task = tokio::spawn(stats_log_task(app_state.clone()));

    info!("✅ Gomoku Relay is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    stats_task.abort();

    // Each background task gets the configured timeout; this bounds the whole
    let shutdown_timeout = config.shutdown_timeout() * 2;
    let shutdown = async { app_state.write().await.shutdown().await };

    match tokio::time::timeout(shutdown_timeout, shutdown).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => error!("Shutdown failed: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Gomoku Relay stopped");
    Ok(())
}
