//! Scripted connector shared by unit tests

use crate::connector::{
    Connector, GeneralStatus, ParallelInfo, PvInput, RatingInfo, Warning, WriteRequest,
};
use crate::error::{GatewayError, Result};
use crate::inverter::{Inverter, Inverters};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Pauses the general status read until released
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Connector answering from fixed values; `None` sections fail with device I/O
pub struct MockConnector {
    pub serial: String,
    pub general_status: Option<GeneralStatus>,
    pub parallel_info: Option<ParallelInfo>,
    pub rating_info: Option<RatingInfo>,
    pub warnings: Option<Vec<Warning>>,
    pub device_mode: Option<char>,
    pub output_mode: Option<u8>,
    pub fail_writes: bool,
    pub writes: Vec<WriteRequest>,
    pub gate: Option<Arc<Gate>>,
    /// Stalls the next general status read once
    pub stall: Option<Duration>,
}

impl MockConnector {
    pub fn healthy(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            general_status: Some(GeneralStatus {
                grid_voltage: 230.0,
                grid_frequency: 50.0,
                battery_voltage: 52.1,
                battery_capacity: 78.0,
                charging_on: true,
                pv_inputs: vec![PvInput {
                    voltage: 310.4,
                    current: 2.3,
                    scc_charging_on: true,
                }],
                ..Default::default()
            }),
            parallel_info: Some(ParallelInfo {
                parallel_exists: true,
                serial_number: serial.to_string(),
                work_mode: 'B',
                ac_charging: false,
                load_on: true,
                ..Default::default()
            }),
            rating_info: Some(RatingInfo {
                output_source_priority: 2,
                charger_source_priority: 3,
                battery_recharge_voltage: 46.0,
                battery_redischarge_voltage: 54.0,
                battery_under_voltage: 42.0,
                battery_float_voltage: 54.0,
                max_ac_charging_current: 30.0,
                ..Default::default()
            }),
            warnings: Some(Vec::new()),
            device_mode: Some('B'),
            output_mode: Some(0),
            fail_writes: false,
            writes: Vec::new(),
            gate: None,
            stall: None,
        }
    }

    pub fn into_inverter(self) -> Inverter {
        let serial = self.serial.clone();
        Inverter::new(serial, Box::new(self))
    }
}

fn missing<T>(what: &str) -> Result<T> {
    Err(GatewayError::device_io(format!("no reply to {}", what)))
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn describe(&self) -> String {
        format!("mock:{}", self.serial)
    }

    async fn serial_number(&mut self) -> Result<String> {
        Ok(self.serial.clone())
    }

    async fn general_status(&mut self) -> Result<GeneralStatus> {
        if let Some(gate) = self.gate.clone() {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(stall) = self.stall.take() {
            tokio::time::sleep(stall).await;
        }
        self.general_status
            .clone()
            .map_or_else(|| missing("QPIGS"), Ok)
    }

    async fn parallel_info(&mut self, _unit: u8) -> Result<ParallelInfo> {
        self.parallel_info.clone().map_or_else(|| missing("QPGS0"), Ok)
    }

    async fn rating_info(&mut self) -> Result<RatingInfo> {
        self.rating_info.clone().map_or_else(|| missing("QPIRI"), Ok)
    }

    async fn warning_status(&mut self) -> Result<Vec<Warning>> {
        self.warnings.clone().map_or_else(|| missing("QPIWS"), Ok)
    }

    async fn device_mode(&mut self) -> Result<char> {
        self.device_mode.map_or_else(|| missing("QMOD"), Ok)
    }

    async fn output_mode(&mut self) -> Result<u8> {
        self.output_mode.map_or_else(|| missing("QOPM"), Ok)
    }

    async fn write(&mut self, request: WriteRequest) -> Result<()> {
        self.writes.push(request);
        if self.fail_writes {
            Err(GatewayError::device_io("inverter replied NAK"))
        } else {
            Ok(())
        }
    }
}

pub fn inverters(mocks: Vec<MockConnector>) -> Inverters {
    Inverters::new(mocks.into_iter().map(MockConnector::into_inverter).collect())
}
