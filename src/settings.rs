//! Last-known-good inverter settings
//!
//! A [`Settings`] record is owned by an [`Inverter`](crate::inverter::Inverter)
//! and only ever touched while holding that inverter's lock. Every field is
//! optional and updated on its own: the record may be partially populated,
//! and a failed update of one field leaves every other field as it was.

use crate::error::{GatewayError, Result};
use crate::mapping::{ChargeSource, ChargerSourcePriority, DeviceMode, OutputSourcePriority};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain view of a device's current configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub output_source_priority: Option<OutputSourcePriority>,
    pub charger_source_priority: Option<ChargerSourcePriority>,
    pub device_mode: Option<DeviceMode>,
    pub charge_source: Option<ChargeSource>,
    pub battery_recharge_voltage: Option<f64>,
    pub battery_redischarge_voltage: Option<f64>,
    pub battery_cutoff_voltage: Option<f64>,
    pub battery_float_voltage: Option<f64>,
}

/// Names of the individually updatable settings fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    OutputSourcePriority,
    ChargerSourcePriority,
    DeviceMode,
    ChargeSource,
    BatteryRechargeVoltage,
    BatteryRedischargeVoltage,
    BatteryCutoffVoltage,
    BatteryFloatVoltage,
}

impl SettingsField {
    pub const ALL: [Self; 8] = [
        Self::OutputSourcePriority,
        Self::ChargerSourcePriority,
        Self::DeviceMode,
        Self::ChargeSource,
        Self::BatteryRechargeVoltage,
        Self::BatteryRedischargeVoltage,
        Self::BatteryCutoffVoltage,
        Self::BatteryFloatVoltage,
    ];

    /// JSON key of this field
    pub fn name(self) -> &'static str {
        match self {
            Self::OutputSourcePriority => "outputSourcePriority",
            Self::ChargerSourcePriority => "chargerSourcePriority",
            Self::DeviceMode => "deviceMode",
            Self::ChargeSource => "chargeSource",
            Self::BatteryRechargeVoltage => "batteryRechargeVoltage",
            Self::BatteryRedischargeVoltage => "batteryRedischargeVoltage",
            Self::BatteryCutoffVoltage => "batteryCutoffVoltage",
            Self::BatteryFloatVoltage => "batteryFloatVoltage",
        }
    }

    fn is_voltage(self) -> bool {
        matches!(
            self,
            Self::BatteryRechargeVoltage
                | Self::BatteryRedischargeVoltage
                | Self::BatteryCutoffVoltage
                | Self::BatteryFloatVoltage
        )
    }
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Settings {
    /// Map a raw wire-level value through the field's table and store it.
    ///
    /// Raw forms: priorities are decimal codes (`"0"`..), the device mode is
    /// its single letter, the charge source is the AC-charging flag (`"1"`,
    /// `"0"`, `"true"`, `"false"`), voltages are decimal volts.
    pub fn update_field(&mut self, field: SettingsField, raw: &str) -> Result<()> {
        let raw = raw.trim();
        match field {
            SettingsField::OutputSourcePriority => {
                let code = parse_code(field, raw)?;
                self.output_source_priority = Some(OutputSourcePriority::from_wire(code)?);
            }
            SettingsField::ChargerSourcePriority => {
                let code = parse_code(field, raw)?;
                self.charger_source_priority = Some(ChargerSourcePriority::from_wire(code)?);
            }
            SettingsField::DeviceMode => {
                let mut chars = raw.chars();
                let mode = match (chars.next(), chars.next()) {
                    (Some(c), None) => DeviceMode::from_wire(c)?,
                    _ => {
                        return Err(GatewayError::mapping(format!(
                            "unrecognized device mode: {}",
                            raw
                        )));
                    }
                };
                self.device_mode = Some(mode);
            }
            SettingsField::ChargeSource => {
                let ac_charging = match raw {
                    "1" | "true" => true,
                    "0" | "false" => false,
                    other => {
                        return Err(GatewayError::mapping(format!(
                            "unrecognized AC charging flag: {}",
                            other
                        )));
                    }
                };
                self.charge_source = Some(ChargeSource::from_wire(ac_charging));
            }
            voltage_field => {
                debug_assert!(voltage_field.is_voltage());
                let volts = parse_voltage(voltage_field, raw)?;
                *self.voltage_slot(voltage_field) = Some(volts);
            }
        }
        Ok(())
    }

    /// Cached value of a voltage field, if observed
    pub fn voltage(&self, field: SettingsField) -> Option<f64> {
        match field {
            SettingsField::BatteryRechargeVoltage => self.battery_recharge_voltage,
            SettingsField::BatteryRedischargeVoltage => self.battery_redischarge_voltage,
            SettingsField::BatteryCutoffVoltage => self.battery_cutoff_voltage,
            SettingsField::BatteryFloatVoltage => self.battery_float_voltage,
            _ => None,
        }
    }

    fn voltage_slot(&mut self, field: SettingsField) -> &mut Option<f64> {
        match field {
            SettingsField::BatteryRechargeVoltage => &mut self.battery_recharge_voltage,
            SettingsField::BatteryRedischargeVoltage => &mut self.battery_redischarge_voltage,
            SettingsField::BatteryCutoffVoltage => &mut self.battery_cutoff_voltage,
            _ => &mut self.battery_float_voltage,
        }
    }
}

/// Apply a batch of field updates into an optional record.
///
/// The record is created by the first successful field write, so callers
/// observe `Some` only after something was stored. Every pair is attempted;
/// the failures are returned alongside their field.
pub fn apply_updates(
    slot: &mut Option<Settings>,
    updates: &[(SettingsField, String)],
) -> Vec<(SettingsField, GatewayError)> {
    let mut record = slot.clone().unwrap_or_default();
    let mut written = false;
    let mut failures = Vec::new();
    for (field, raw) in updates {
        match record.update_field(*field, raw) {
            Ok(()) => written = true,
            Err(e) => failures.push((*field, e)),
        }
    }
    if written {
        *slot = Some(record);
    }
    failures
}

fn parse_code(field: SettingsField, raw: &str) -> Result<u8> {
    raw.parse::<u8>().map_err(|_| {
        GatewayError::mapping(format!("unrecognized {} code: {}", field, raw))
    })
}

fn parse_voltage(field: SettingsField, raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(GatewayError::validation(
            field.name().to_string(),
            format!("not a voltage: {}", raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_maps_every_field() {
        let mut s = Settings::default();
        s.update_field(SettingsField::OutputSourcePriority, "2").unwrap();
        s.update_field(SettingsField::ChargerSourcePriority, "3").unwrap();
        s.update_field(SettingsField::DeviceMode, "B").unwrap();
        s.update_field(SettingsField::ChargeSource, "1").unwrap();
        s.update_field(SettingsField::BatteryRechargeVoltage, "46.0").unwrap();
        s.update_field(SettingsField::BatteryRedischargeVoltage, "54.0").unwrap();
        s.update_field(SettingsField::BatteryCutoffVoltage, " 42.0 ").unwrap();
        s.update_field(SettingsField::BatteryFloatVoltage, "54.0").unwrap();

        assert_eq!(s.output_source_priority, Some(OutputSourcePriority::Sbu));
        assert_eq!(
            s.charger_source_priority,
            Some(ChargerSourcePriority::SolarOnly)
        );
        assert_eq!(s.device_mode, Some(DeviceMode::Battery));
        assert_eq!(s.charge_source, Some(ChargeSource::Utility));
        assert_eq!(s.battery_recharge_voltage, Some(46.0));
        assert_eq!(s.battery_cutoff_voltage, Some(42.0));
    }

    #[test]
    fn failed_update_leaves_field_untouched() {
        let mut s = Settings::default();
        s.update_field(SettingsField::DeviceMode, "L").unwrap();
        let err = s.update_field(SettingsField::DeviceMode, "D").unwrap_err();
        assert!(matches!(err, GatewayError::Mapping { .. }));
        assert_eq!(s.device_mode, Some(DeviceMode::Utility));

        let err = s
            .update_field(SettingsField::BatteryFloatVoltage, "abc")
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
        assert_eq!(s.battery_float_voltage, None);
    }

    #[test]
    fn apply_updates_is_independent_per_field() {
        let mut slot = None;
        let failures = apply_updates(
            &mut slot,
            &[
                (SettingsField::OutputSourcePriority, "7".to_string()),
                (SettingsField::ChargerSourcePriority, "1".to_string()),
            ],
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, SettingsField::OutputSourcePriority);
        let s = slot.unwrap();
        assert_eq!(s.output_source_priority, None);
        assert_eq!(
            s.charger_source_priority,
            Some(ChargerSourcePriority::SolarFirst)
        );
    }

    #[test]
    fn apply_updates_does_not_create_record_on_total_failure() {
        let mut slot = None;
        let failures = apply_updates(
            &mut slot,
            &[(SettingsField::DeviceMode, "Z".to_string())],
        );
        assert_eq!(failures.len(), 1);
        assert!(slot.is_none());
    }

    #[test]
    fn serializes_with_camel_case_and_nulls() {
        let mut s = Settings::default();
        s.update_field(SettingsField::OutputSourcePriority, "0").unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["outputSourcePriority"], "utility");
        assert!(json["chargerSourcePriority"].is_null());
        assert!(json.get("batteryFloatVoltage").is_some());
    }

    #[test]
    fn field_names_match_json_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        for f in SettingsField::ALL {
            assert!(json.get(f.name()).is_some(), "{} missing", f);
        }
    }
}
