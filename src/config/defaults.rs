use super::*;

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            paths: vec!["/dev/hidraw0".to_string()],
            read_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/var/log/axpert-gateway/axpert-gateway.log".to_string(),
            console_output: true,
            json_format: false,
            backup_count: 5,
        }
    }
}
