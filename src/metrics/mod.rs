//! Metrics and monitoring for the relay service
//!
//! Prometheus collection plus the HTTP status endpoints served next to the
//! game socket.

pub mod collector;
pub mod health;

pub use collector::{MatchEndReason, MetricsCollector, MetricsTimer, RelayMetrics, SessionMetrics};
pub use health::{encode_metrics, health_routes, HealthServerState, STATUS_PATHS};
