//! Configuration management for axpert-gateway
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "AXPERT_GATEWAY_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener and scrape path
    pub web: WebConfig,

    /// Telemetry polling
    pub poller: PollerConfig,

    /// Command API switch
    pub control: ControlConfig,

    /// Inverter device nodes to probe at startup
    pub devices: DevicesConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Web server binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address to listen on, `host:port` or `:port`
    pub listen_address: String,

    /// Path under which metrics are exposed
    pub metrics_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Collect metrics and settings in the background
    pub enabled: bool,

    /// Seconds between poll cycles
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Accept write commands on the command API
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Device nodes, probed in order
    pub paths: Vec<String>,

    /// Deadline for a single request/response exchange
    pub read_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Log file path or directory
    pub file: String,

    /// Also log to stdout when writing to a file
    pub console_output: bool,

    /// Emit JSON lines instead of plain text
    pub json_format: bool,

    /// Number of rotated files to keep
    pub backup_count: u32,
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl DevicesConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl WebConfig {
    /// Resolve the listen address; a bare `:port` binds all interfaces
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };
        addr.parse().map_err(|e| {
            GatewayError::validation(
                "web.listen_address".to_string(),
                format!("invalid address '{}': {}", self.listen_address, e),
            )
        })
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first existing location, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)
                .map_err(|e| GatewayError::config(format!("{}: {}", path, e)))?,
            Err(_) => Self::load_default_locations()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_default_locations() -> Result<Self> {
        let default_paths = ["axpert_gateway.yaml", "/etc/axpert-gateway/config.yaml"];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Apply `AXPERT_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AXPERT_LISTEN_ADDRESS") {
            self.web.listen_address = v;
        }
        if let Some(v) = lookup("AXPERT_METRICS_PATH") {
            self.web.metrics_path = v;
        }
        if let Some(v) = lookup("AXPERT_INTERVAL") {
            self.poller.interval_secs = v.trim().parse().map_err(|_| {
                GatewayError::config(format!("AXPERT_INTERVAL is not a number: {}", v))
            })?;
        }
        if let Some(v) = lookup("AXPERT_METRICS") {
            self.poller.enabled = parse_flag("AXPERT_METRICS", &v)?;
        }
        if let Some(v) = lookup("AXPERT_CONTROL") {
            self.control.enabled = parse_flag("AXPERT_CONTROL", &v)?;
        }
        if let Some(v) = lookup("AXPERT_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.web.listen_address.trim().is_empty() {
            return Err(GatewayError::validation(
                "web.listen_address",
                "Address cannot be empty",
            ));
        }
        self.web.socket_addr()?;

        let path = &self.web.metrics_path;
        if !path.starts_with('/') || path.len() < 2 {
            return Err(GatewayError::validation(
                "web.metrics_path",
                "Must start with '/' and name a path",
            ));
        }
        if path == "/healthz" || path == "/api" || path.starts_with("/api/") {
            return Err(GatewayError::validation(
                "web.metrics_path",
                "Collides with a built-in route",
            ));
        }

        if self.poller.interval_secs == 0 {
            return Err(GatewayError::validation(
                "poller.interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.devices.paths.is_empty() {
            return Err(GatewayError::validation(
                "devices.paths",
                "At least one device path is required",
            ));
        }

        if self.devices.read_timeout_ms == 0 {
            return Err(GatewayError::validation(
                "devices.read_timeout_ms",
                "Must be greater than 0",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GatewayError::config(format!(
            "{} is not a boolean: {}",
            name, value
        ))),
    }
}
