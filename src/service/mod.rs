//! Service layer for the relay
//!
//! This module contains the main application state, the health checks, and
//! task management for the running service.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus, ServiceStats};
