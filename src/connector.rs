//! Device connector capability
//!
//! A connector performs request/response I/O against exactly one inverter.
//! It is owned by its [`Inverter`](crate::inverter::Inverter) and is never
//! shared; callers reach it only through the inverter's lock. The trait is
//! object safe so tests can substitute scripted connectors.

use crate::error::Result;
use crate::settings::SettingsField;
use std::any::Any;
use std::fmt;

pub mod types;

pub use types::{GeneralStatus, ParallelInfo, PvInput, RatingInfo, Warning, WriteRequest};

/// Independently fetchable telemetry queries, in poll order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    GeneralStatus,
    ParallelInfo,
    RatingInfo,
    Warnings,
    DeviceMode,
    OutputMode,
}

impl Section {
    /// Fixed order in which the poller visits sections
    pub const ORDER: [Self; 6] = [
        Self::GeneralStatus,
        Self::ParallelInfo,
        Self::RatingInfo,
        Self::Warnings,
        Self::DeviceMode,
        Self::OutputMode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::GeneralStatus => "device general status",
            Self::ParallelInfo => "parallel device info",
            Self::RatingInfo => "rating info",
            Self::Warnings => "warnings",
            Self::DeviceMode => "device mode",
            Self::OutputMode => "device output mode",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded result of one section query
#[derive(Debug, Clone, PartialEq)]
pub enum SectionPayload {
    GeneralStatus(GeneralStatus),
    ParallelInfo(ParallelInfo),
    RatingInfo(RatingInfo),
    Warnings(Vec<Warning>),
    /// Raw QMOD letter
    DeviceMode(char),
    OutputMode(u8),
}

impl SectionPayload {
    pub fn section(&self) -> Section {
        match self {
            Self::GeneralStatus(_) => Section::GeneralStatus,
            Self::ParallelInfo(_) => Section::ParallelInfo,
            Self::RatingInfo(_) => Section::RatingInfo,
            Self::Warnings(_) => Section::Warnings,
            Self::DeviceMode(_) => Section::DeviceMode,
            Self::OutputMode(_) => Section::OutputMode,
        }
    }

    /// Settings fields carried by this payload, as raw wire values
    pub fn settings_updates(&self) -> Vec<(SettingsField, String)> {
        match self {
            Self::ParallelInfo(pi) => vec![(
                SettingsField::ChargeSource,
                pi.ac_charging.to_string(),
            )],
            Self::RatingInfo(ri) => vec![
                (
                    SettingsField::OutputSourcePriority,
                    ri.output_source_priority.to_string(),
                ),
                (
                    SettingsField::ChargerSourcePriority,
                    ri.charger_source_priority.to_string(),
                ),
                (
                    SettingsField::BatteryRechargeVoltage,
                    ri.battery_recharge_voltage.to_string(),
                ),
                (
                    SettingsField::BatteryRedischargeVoltage,
                    ri.battery_redischarge_voltage.to_string(),
                ),
                (
                    SettingsField::BatteryCutoffVoltage,
                    ri.battery_under_voltage.to_string(),
                ),
                (
                    SettingsField::BatteryFloatVoltage,
                    ri.battery_float_voltage.to_string(),
                ),
            ],
            Self::DeviceMode(code) => vec![(SettingsField::DeviceMode, code.to_string())],
            Self::GeneralStatus(_) | Self::Warnings(_) | Self::OutputMode(_) => Vec::new(),
        }
    }
}

#[async_trait::async_trait]
pub trait Connector: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Human readable location of the device (path, address)
    fn describe(&self) -> String {
        "connector".to_string()
    }

    async fn serial_number(&mut self) -> Result<String>;

    async fn general_status(&mut self) -> Result<GeneralStatus>;

    async fn parallel_info(&mut self, unit: u8) -> Result<ParallelInfo>;

    async fn rating_info(&mut self) -> Result<RatingInfo>;

    async fn warning_status(&mut self) -> Result<Vec<Warning>>;

    /// Raw QMOD letter; mapping is left to the caller
    async fn device_mode(&mut self) -> Result<char>;

    async fn output_mode(&mut self) -> Result<u8>;

    async fn write(&mut self, request: WriteRequest) -> Result<()>;

    /// Fetch one section and wrap it in its payload variant
    async fn fetch(&mut self, section: Section) -> Result<SectionPayload> {
        let payload = match section {
            Section::GeneralStatus => SectionPayload::GeneralStatus(self.general_status().await?),
            Section::ParallelInfo => SectionPayload::ParallelInfo(self.parallel_info(0).await?),
            Section::RatingInfo => SectionPayload::RatingInfo(self.rating_info().await?),
            Section::Warnings => SectionPayload::Warnings(self.warning_status().await?),
            Section::DeviceMode => SectionPayload::DeviceMode(self.device_mode().await?),
            Section::OutputMode => SectionPayload::OutputMode(self.output_mode().await?),
        };
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_info_carries_priority_and_voltage_fields() {
        let ri = RatingInfo {
            output_source_priority: 2,
            charger_source_priority: 3,
            battery_recharge_voltage: 46.0,
            battery_redischarge_voltage: 54.0,
            battery_under_voltage: 42.0,
            battery_float_voltage: 54.0,
            ..Default::default()
        };
        let updates = SectionPayload::RatingInfo(ri).settings_updates();
        let fields: Vec<SettingsField> = updates.iter().map(|(f, _)| *f).collect();
        assert_eq!(
            fields,
            vec![
                SettingsField::OutputSourcePriority,
                SettingsField::ChargerSourcePriority,
                SettingsField::BatteryRechargeVoltage,
                SettingsField::BatteryRedischargeVoltage,
                SettingsField::BatteryCutoffVoltage,
                SettingsField::BatteryFloatVoltage,
            ]
        );
        assert_eq!(updates[0].1, "2");
        assert_eq!(updates[2].1, "46");
    }

    #[test]
    fn telemetry_only_sections_carry_no_settings() {
        assert!(
            SectionPayload::GeneralStatus(GeneralStatus::default())
                .settings_updates()
                .is_empty()
        );
        assert!(SectionPayload::OutputMode(1).settings_updates().is_empty());
        assert_eq!(
            SectionPayload::DeviceMode('B').settings_updates(),
            vec![(SettingsField::DeviceMode, "B".to_string())]
        );
    }

    #[test]
    fn section_order_is_fixed() {
        assert_eq!(Section::ORDER[0], Section::GeneralStatus);
        assert_eq!(Section::ORDER[5], Section::OutputMode);
    }
}
