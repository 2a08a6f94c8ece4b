//! Configuration management for the relay service
//!
//! This module handles configuration loading from files and environment
//! variables, validation, and default values.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, DiscoverySettings, ServerSettings, ServiceSettings};
