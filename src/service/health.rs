//! Health checks for the relay service
//!
//! A check is healthy while every shared structure can still be locked. A
//! panicking connection worker poisons the lock it held, after which that
//! structure reports unhealthy until restart.

use crate::session::SessionServer;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Set when unhealthy
    pub message: Option<String>,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub connections: usize,
    pub players_waiting: usize,
    pub active_matches: usize,
    pub matches_created: u64,
    pub matches_ended: u64,
    pub moves_relayed: u64,
    pub uptime_seconds: i64,
}

impl HealthCheck {
    /// Inspect the shared session structures
    pub fn check(server: &SessionServer, service: &str, started_at: DateTime<Utc>) -> Self {
        let checks = vec![
            Self::component("matchmaking_queue", server.queue().is_poisoned()),
            Self::component("session_registry", server.registry().is_poisoned()),
            Self::component("relay_hub", server.relay().is_poisoned()),
        ];

        let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        let session = server.stats();
        let now = Utc::now();

        HealthCheck {
            status,
            service: service.to_string(),
            version: crate::VERSION.to_string(),
            timestamp: now,
            checks,
            stats: ServiceStats {
                connections: session.connections,
                players_waiting: session.players_waiting,
                active_matches: session.active_matches,
                matches_created: session.matches_created,
                matches_ended: session.matches_ended,
                moves_relayed: session.moves_relayed,
                uptime_seconds: (now - started_at).num_seconds(),
            },
        }
    }

    fn component(name: &str, poisoned: bool) -> ComponentCheck {
        let (status, message) = if poisoned {
            (
                HealthStatus::Unhealthy,
                Some(format!("{} lock poisoned", name)),
            )
        } else {
            (HealthStatus::Healthy, None)
        };

        ComponentCheck {
            name: name.to_string(),
            status,
            message,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
