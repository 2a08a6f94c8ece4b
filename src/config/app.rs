//! Main application configuration
//!
//! Defaults, then a TOML file or the environment, then command-line overrides
//! applied by the binary. Everything is checked by [`validate_config`].

use crate::discovery::{DEFAULT_BEACON_PORT, DEFAULT_LISTEN_PORT};
use crate::metrics::STATUS_PATHS;
use crate::protocol::GAME_PATH;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub discovery: DiscoverySettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and the status endpoints
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Listener settings; the game socket and the status endpoints share it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Path of the WebSocket game endpoint
    pub game_path: String,
}

/// LAN beacon settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub enabled: bool,
    /// Local port the beacon sends from
    pub bind_port: u16,
    /// Port clients listen on
    pub broadcast_port: u16,
    pub interval_ms: u64,
    /// Address to advertise; detected from the host when unset
    pub advertise_address: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "gomoku-relay".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 10,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5073,
            game_path: GAME_PATH.to_string(),
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_port: DEFAULT_BEACON_PORT,
            broadcast_port: DEFAULT_LISTEN_PORT,
            interval_ms: 1000,
            advertise_address: None,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Some(name) = lookup("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Listener settings
        if let Some(host) = lookup("SERVER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            config.server.port = parse_var("SERVER_PORT", &port)?;
        }
        if let Some(path) = lookup("GAME_PATH") {
            config.server.game_path = path;
        }

        // Discovery settings
        if let Some(enabled) = lookup("DISCOVERY_ENABLED") {
            config.discovery.enabled = parse_var("DISCOVERY_ENABLED", &enabled)?;
        }
        if let Some(port) = lookup("DISCOVERY_BIND_PORT") {
            config.discovery.bind_port = parse_var("DISCOVERY_BIND_PORT", &port)?;
        }
        if let Some(port) = lookup("DISCOVERY_BROADCAST_PORT") {
            config.discovery.broadcast_port = parse_var("DISCOVERY_BROADCAST_PORT", &port)?;
        }
        if let Some(interval) = lookup("DISCOVERY_INTERVAL_MS") {
            config.discovery.interval_ms = parse_var("DISCOVERY_INTERVAL_MS", &interval)?;
        }
        if let Some(address) = lookup("ADVERTISE_ADDRESS") {
            config.discovery.advertise_address = Some(address).filter(|a| !a.is_empty());
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// `host:port` of the shared listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate listener
    if config.server.port == 0 {
        return Err(anyhow!("Server port cannot be 0"));
    }
    if config.server.host.is_empty() {
        return Err(anyhow!("Server host cannot be empty"));
    }
    if !config.server.game_path.starts_with('/') {
        return Err(anyhow!(
            "Game path must start with '/': {}",
            config.server.game_path
        ));
    }
    if STATUS_PATHS.contains(&config.server.game_path.as_str()) {
        return Err(anyhow!(
            "Game path collides with a status endpoint: {}",
            config.server.game_path
        ));
    }

    // Validate discovery
    if config.discovery.enabled {
        if config.discovery.bind_port == 0 || config.discovery.broadcast_port == 0 {
            return Err(anyhow!("Discovery ports cannot be 0"));
        }
        if config.discovery.interval_ms == 0 {
            return Err(anyhow!("Discovery interval must be greater than 0"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:5073");
        assert_eq!(config.server.game_path, "/game");
        assert_eq!(config.discovery.bind_port, 19471);
        assert_eq!(config.discovery.broadcast_port, 19472);
        assert_eq!(config.discovery.interval_ms, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SERVER_PORT", "6000"),
            ("GAME_PATH", "/play"),
            ("LOG_LEVEL", "debug"),
            ("DISCOVERY_ENABLED", "false"),
            ("ADVERTISE_ADDRESS", "10.0.0.9"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.game_path, "/play");
        assert_eq!(config.service.log_level, "debug");
        assert!(!config.discovery.enabled);
        assert_eq!(config.discovery.advertise_address.as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn test_env_rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup_from(&[("SERVER_PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SERVER_PORT", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("DISCOVERY_ENABLED", "maybe")])).is_err());
    }

    #[test]
    fn test_validation_rules() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.server.game_path = "game".to_string();
        assert!(validate_config(&config).is_err());

        for reserved in ["/", "/health", "/metrics", "/stats"] {
            let mut config = AppConfig::default();
            config.server.game_path = reserved.to_string();
            assert!(validate_config(&config).is_err(), "{} accepted", reserved);
        }

        let mut config = AppConfig::default();
        config.discovery.interval_ms = 0;
        assert!(validate_config(&config).is_err());
        config.discovery.enabled = false;
        assert!(validate_config(&config).is_ok());

        let mut config = AppConfig::default();
        config.service.shutdown_timeout_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 7000

            [discovery]
            advertise_address = "192.168.0.4"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.game_path, "/game");
        assert_eq!(config.service.name, "gomoku-relay");
        assert_eq!(
            config.discovery.advertise_address.as_deref(),
            Some("192.168.0.4")
        );
    }
}
