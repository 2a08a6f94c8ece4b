//! Main application state and service coordination
//!
//! This module builds the shared session structures once, serves the game
//! socket and the status endpoints on one listener, and runs the discovery
//! beacon alongside.

use crate::config::AppConfig;
use crate::discovery::DiscoveryBeacon;
use crate::metrics::{health_routes, HealthServerState, MetricsCollector, STATUS_PATHS};
use crate::service::health::HealthCheck;
use crate::session::{MatchmakingQueue, RelayHub, SessionRegistry, SessionServer};
use crate::transport::game_routes;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Listener error: {message}")]
    Listener { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    /// Queue, registry and relay behind one entry point
    session_server: Arc<SessionServer>,

    /// Status endpoint state; keeps the service start time
    health_state: HealthServerState,

    /// Stops the HTTP server and the beacon
    shutdown_tx: broadcast::Sender<()>,

    background_tasks: Vec<JoinHandle<()>>,

    /// Bound listener address once started
    local_addr: Option<SocketAddr>,

    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing {} relay service", config.service.name);

        // Merging overlapping routes panics, so refuse before building them
        if STATUS_PATHS.contains(&config.server.game_path.as_str()) {
            return Err(ServiceError::Initialization {
                message: format!(
                    "Game path {} is taken by a status endpoint",
                    config.server.game_path
                ),
            });
        }

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let session_server = Arc::new(SessionServer::with_metrics(
            Arc::new(MatchmakingQueue::new()),
            Arc::new(SessionRegistry::new()),
            Arc::new(RelayHub::new()),
            metrics_collector,
        ));

        let health_state = HealthServerState::new(
            session_server.clone(),
            &config.service.name,
            &config.server.game_path,
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            session_server,
            health_state,
            shutdown_tx,
            background_tasks: Vec::new(),
            local_addr: None,
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Game socket plus status endpoints
    pub fn router(&self) -> Router {
        game_routes(&self.config.server.game_path, self.session_server.clone())
            .merge(health_routes(self.health_state.clone()))
    }

    /// Bind the listener, then start serving and broadcasting
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting relay service");

        let listener = TcpListener::bind(self.config.bind_address())
            .await
            .map_err(|e| ServiceError::Listener {
                message: format!("Failed to bind {}: {}", self.config.bind_address(), e),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServiceError::Listener {
            message: format!("Failed to read bound address: {}", e),
        })?;
        self.local_addr = Some(local_addr);

        *self.is_running.write().await = true;

        self.start_http_server(listener);
        self.start_discovery_beacon(local_addr.port());

        info!(
            "✅ Relay service listening on ws://{}{}",
            local_addr, self.config.server.game_path
        );
        Ok(())
    }

    fn start_http_server(&mut self, listener: TcpListener) {
        let app = self.router();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    info!("HTTP server shutdown signal received");
                })
                .await;

            match result {
                Ok(()) => info!("HTTP server stopped"),
                Err(e) => error!("HTTP server failed: {}", e),
            }
        });
        self.background_tasks.push(handle);
    }

    fn start_discovery_beacon(&mut self, server_port: u16) {
        if !self.config.discovery.enabled {
            info!("Discovery beacon disabled");
            return;
        }

        // A host without a usable address still serves clients that know the URL
        let beacon = match DiscoveryBeacon::from_config(&self.config.discovery, server_port) {
            Ok(beacon) => beacon,
            Err(e) => {
                warn!("Discovery beacon not started: {:#}", e);
                return;
            }
        };

        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = beacon.run(shutdown_rx).await {
                error!("Discovery beacon failed: {:#}", e);
            }
        });
        self.background_tasks.push(handle);
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown");

        *self.is_running.write().await = false;

        if self.shutdown_tx.send(()).is_err() {
            debug!("No running tasks to signal");
        }

        let timeout = self.config.shutdown_timeout();
        let task_count = self.background_tasks.len();
        for task in self.background_tasks.drain(..) {
            let abort = task.abort_handle();
            if tokio::time::timeout(timeout, task).await.is_err() {
                warn!("Background task did not stop within {:?}; aborting", timeout);
                abort.abort();
            }
        }
        debug!("{} background tasks stopped", task_count);

        info!("Final service statistics: {:?}", self.session_server.stats());
        info!("✅ Relay service shutdown completed");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn session_server(&self) -> Arc<SessionServer> {
        self.session_server.clone()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Current health of the shared session structures
    pub fn health(&self) -> HealthCheck {
        HealthCheck::check(
            &self.session_server,
            &self.config.service.name,
            self.health_state.started_at,
        )
    }
}
