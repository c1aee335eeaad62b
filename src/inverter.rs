//! Discovered inverters and their guarded state
//!
//! Each [`Inverter`] owns its connector and its settings snapshot behind a
//! single async mutex. The poller holds that lock for a whole multi-section
//! poll, so API readers and commands see either the state before the poll or
//! the state after it, never a half-applied mix.

use crate::config::DevicesConfig;
use crate::connector::Connector;
use crate::error::{GatewayError, Result};
use crate::logging::get_logger;
use crate::settings::{Settings, SettingsField, apply_updates};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// State guarded by the inverter lock
pub struct InverterState {
    pub connector: Box<dyn Connector>,
    /// Last known good settings; `None` until the first successful field write
    pub settings: Option<Settings>,
}

impl InverterState {
    /// Store a batch of raw field values, returning the per-field failures
    pub fn apply_settings(
        &mut self,
        updates: &[(SettingsField, String)],
    ) -> Vec<(SettingsField, GatewayError)> {
        apply_updates(&mut self.settings, updates)
    }
}

pub struct Inverter {
    serial_no: String,
    state: Mutex<InverterState>,
}

impl Inverter {
    pub fn new(serial_no: impl Into<String>, connector: Box<dyn Connector>) -> Self {
        Self {
            serial_no: serial_no.into(),
            state: Mutex::new(InverterState {
                connector,
                settings: None,
            }),
        }
    }

    pub fn serial_no(&self) -> &str {
        &self.serial_no
    }

    /// Acquire exclusive access to the connector and settings
    pub async fn lock(&self) -> MutexGuard<'_, InverterState> {
        self.state.lock().await
    }

    /// Copy of the cached settings, taken under the lock
    pub async fn read_settings(&self) -> Option<Settings> {
        self.state.lock().await.settings.clone()
    }

    /// Map and store one raw field value
    pub async fn update_field(&self, field: SettingsField, raw: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut failures = state.apply_settings(&[(field, raw.to_string())]);
        match failures.pop() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }
}

/// Inverters known to the gateway, in discovery order
#[derive(Clone, Default)]
pub struct Inverters {
    devices: Arc<Vec<Arc<Inverter>>>,
}

impl Inverters {
    pub fn new(devices: Vec<Inverter>) -> Self {
        Self {
            devices: Arc::new(devices.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Inverter>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn serial_numbers(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.serial_no.clone()).collect()
    }

    /// Exact serial number lookup
    pub fn find(&self, serial_no: &str) -> Result<Arc<Inverter>> {
        self.devices
            .iter()
            .find(|d| d.serial_no == serial_no)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("unknown inverter: {}", serial_no)))
    }
}

/// Identify already-opened connectors by serial number.
///
/// Connectors that fail to answer, or repeat a serial number seen earlier,
/// are dropped with a warning.
pub async fn identify(connectors: Vec<Box<dyn Connector>>) -> Inverters {
    let logger = get_logger("discovery");
    let mut found: Vec<Inverter> = Vec::new();

    for mut connector in connectors {
        let location = connector.describe();
        match connector.serial_number().await {
            Ok(serial) if found.iter().any(|d| d.serial_no == serial) => {
                logger.warn(&format!(
                    "Skipping {}: serial number {} already attached",
                    location, serial
                ));
            }
            Ok(serial) => {
                logger.info(&format!("Found inverter {} at {}", serial, location));
                found.push(Inverter::new(serial, connector));
            }
            Err(e) => {
                logger.warn(&format!("Skipping {}: {}", location, e));
            }
        }
    }

    Inverters::new(found)
}

/// Open every configured device path and identify the inverters behind them
pub async fn discover(config: &DevicesConfig) -> Inverters {
    let logger = get_logger("discovery");
    let mut connectors: Vec<Box<dyn Connector>> = Vec::new();

    for path in &config.paths {
        match crate::axpert::AxpertConnector::open(path, config.read_timeout()).await {
            Ok(conn) => connectors.push(Box::new(conn)),
            Err(e) => logger.warn(&format!("Skipping {}: {}", path, e)),
        }
    }

    identify(connectors).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{GeneralStatus, ParallelInfo, RatingInfo, Warning, WriteRequest};
    use crate::mapping::DeviceMode;
    use std::any::Any;

    struct SerialOnly(Option<&'static str>);

    #[async_trait::async_trait]
    impl Connector for SerialOnly {
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        async fn serial_number(&mut self) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| GatewayError::device_io("no answer"))
        }
        async fn general_status(&mut self) -> Result<GeneralStatus> {
            Err(GatewayError::device_io("unused"))
        }
        async fn parallel_info(&mut self, _unit: u8) -> Result<ParallelInfo> {
            Err(GatewayError::device_io("unused"))
        }
        async fn rating_info(&mut self) -> Result<RatingInfo> {
            Err(GatewayError::device_io("unused"))
        }
        async fn warning_status(&mut self) -> Result<Vec<Warning>> {
            Err(GatewayError::device_io("unused"))
        }
        async fn device_mode(&mut self) -> Result<char> {
            Err(GatewayError::device_io("unused"))
        }
        async fn output_mode(&mut self) -> Result<u8> {
            Err(GatewayError::device_io("unused"))
        }
        async fn write(&mut self, _request: WriteRequest) -> Result<()> {
            Err(GatewayError::device_io("unused"))
        }
    }

    #[tokio::test]
    async fn identify_skips_silent_and_duplicate_devices() {
        let inverters = identify(vec![
            Box::new(SerialOnly(Some("A1"))),
            Box::new(SerialOnly(None)),
            Box::new(SerialOnly(Some("B2"))),
            Box::new(SerialOnly(Some("A1"))),
        ])
        .await;
        assert_eq!(inverters.serial_numbers(), vec!["A1", "B2"]);
        assert!(inverters.find("B2").is_ok());
        assert!(matches!(
            inverters.find("b2"),
            Err(GatewayError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn settings_start_empty_and_fill_per_field() {
        let inv = Inverter::new("A1", Box::new(SerialOnly(Some("A1"))));
        assert!(inv.read_settings().await.is_none());

        assert!(inv.update_field(SettingsField::DeviceMode, "X").await.is_err());
        assert!(inv.read_settings().await.is_none());

        inv.update_field(SettingsField::DeviceMode, "L").await.unwrap();
        let s = inv.read_settings().await.unwrap();
        assert_eq!(s.device_mode, Some(DeviceMode::Utility));
        assert_eq!(s.battery_float_voltage, None);
    }

    #[tokio::test]
    async fn discover_skips_missing_paths() {
        let config = DevicesConfig {
            paths: vec!["/nonexistent/hidraw9".to_string()],
            read_timeout_ms: 50,
        };
        assert!(discover(&config).await.is_empty());
    }
}
