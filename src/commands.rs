//! Command validation and dispatch
//!
//! Commands are looked up by name in a fixed table, validated against the
//! target inverter's cached settings and written through its connector.
//! Validation and the write happen under one acquisition of the inverter
//! lock, so the snapshot used for cross-field checks is the one in force
//! when the write goes out. The cache itself is never touched here; the
//! next poll picks up the new device state.

use crate::connector::WriteRequest;
use crate::error::{GatewayError, Result};
use crate::inverter::Inverters;
use crate::logging::get_logger;
use crate::mapping::{ChargerSourcePriority, OutputSourcePriority};
use crate::settings::Settings;
use serde::{Deserialize, Deserializer, Serialize};

/// Allowed battery recharge voltage range, inclusive
pub const RECHARGE_VOLTAGE_RANGE: (f64, f64) = (44.0, 51.0);
/// Allowed battery redischarge voltage range, inclusive
pub const REDISCHARGE_VOLTAGE_RANGE: (f64, f64) = (48.0, 58.0);

/// A command as received from the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(skip)]
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    pub serialno: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "value must be a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandHandler {
    SetOutputPriority,
    SetChargerPriority,
    SetBatteryRechargeVoltage,
    SetBatteryRedischargeVoltage,
}

impl CommandHandler {
    pub const ALL: [Self; 4] = [
        Self::SetOutputPriority,
        Self::SetChargerPriority,
        Self::SetBatteryRechargeVoltage,
        Self::SetBatteryRedischargeVoltage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SetOutputPriority => "setOutputPriority",
            Self::SetChargerPriority => "setChargerPriority",
            Self::SetBatteryRechargeVoltage => "setBatteryRechargeVoltage",
            Self::SetBatteryRedischargeVoltage => "setBatteryRedischargeVoltage",
        }
    }

    pub fn lookup(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|h| h.name() == name)
            .ok_or_else(|| GatewayError::not_found("unknown command"))
    }

    /// Turn a raw value into a device write, checking it against `settings`
    pub fn validate(self, value: &str, settings: Option<&Settings>) -> Result<WriteRequest> {
        let value = value.trim();
        match self {
            Self::SetOutputPriority => {
                let p = OutputSourcePriority::from_token(value)?;
                Ok(WriteRequest::OutputSourcePriority(p.wire_code()))
            }
            Self::SetChargerPriority => {
                let p = ChargerSourcePriority::from_token(value)?;
                Ok(WriteRequest::ChargerSourcePriority(p.wire_code()))
            }
            Self::SetBatteryRechargeVoltage => {
                let v = validate_recharge_voltage(value, settings)?;
                Ok(WriteRequest::BatteryRechargeVoltage(v))
            }
            Self::SetBatteryRedischargeVoltage => {
                let v = validate_redischarge_voltage(value, settings)?;
                Ok(WriteRequest::BatteryRedischargeVoltage(v))
            }
        }
    }
}

fn invalid(message: String) -> GatewayError {
    GatewayError::validation("value".to_string(), message)
}

fn whole_volts(value: &str, (min, max): (f64, f64), what: &str) -> Result<f64> {
    let v: f64 = value
        .parse()
        .map_err(|_| invalid(format!("{} is not a number: '{}'", what, value)))?;
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(invalid(format!("{} must be a whole number of volts", what)));
    }
    if v < min || v > max {
        return Err(invalid(format!(
            "{} must be between {} and {} V, got {}",
            what, min, max, v
        )));
    }
    Ok(v)
}

// Cross-field constraints are checked only against values that have been cached.

fn validate_recharge_voltage(value: &str, settings: Option<&Settings>) -> Result<f64> {
    let v = whole_volts(value, RECHARGE_VOLTAGE_RANGE, "battery recharge voltage")?;
    let Some(s) = settings else {
        return Ok(v);
    };
    if let Some(redischarge) = s.battery_redischarge_voltage
        && v > redischarge
    {
        return Err(invalid(format!(
            "battery recharge voltage {} V must not exceed redischarge voltage {} V",
            v, redischarge
        )));
    }
    if let Some(float) = s.battery_float_voltage
        && v > float
    {
        return Err(invalid(format!(
            "battery recharge voltage {} V must not exceed float voltage {} V",
            v, float
        )));
    }
    if let Some(cutoff) = s.battery_cutoff_voltage
        && v < cutoff
    {
        return Err(invalid(format!(
            "battery recharge voltage {} V must not be below cutoff voltage {} V",
            v, cutoff
        )));
    }
    Ok(v)
}

fn validate_redischarge_voltage(value: &str, settings: Option<&Settings>) -> Result<f64> {
    let v = whole_volts(value, REDISCHARGE_VOLTAGE_RANGE, "battery redischarge voltage")?;
    let Some(s) = settings else {
        return Ok(v);
    };
    if let Some(recharge) = s.battery_recharge_voltage
        && v < recharge
    {
        return Err(invalid(format!(
            "battery redischarge voltage {} V must not be below recharge voltage {} V",
            v, recharge
        )));
    }
    if let Some(float) = s.battery_float_voltage
        && v > float
    {
        return Err(invalid(format!(
            "battery redischarge voltage {} V must not exceed float voltage {} V",
            v, float
        )));
    }
    if let Some(cutoff) = s.battery_cutoff_voltage
        && v < cutoff
    {
        return Err(invalid(format!(
            "battery redischarge voltage {} V must not be below cutoff voltage {} V",
            v, cutoff
        )));
    }
    Ok(v)
}

/// Resolve, validate and execute a command.
///
/// Errors: `NotFound` for an unknown command or serial number, `Validation`
/// or `Mapping` for a rejected value, and the connector's error unchanged
/// when the write itself fails.
pub async fn dispatch(inverters: &Inverters, command: &Command) -> Result<()> {
    let handler = CommandHandler::lookup(&command.name)?;
    let inverter = inverters.find(&command.serialno)?;
    let logger = get_logger("commands").for_serialno(inverter.serial_no());

    let mut state = inverter.lock().await;
    let request = handler.validate(&command.value, state.settings.as_ref())?;

    logger.info(&format!(
        "Executing {} with value {}",
        handler.name(),
        command.value
    ));
    match state.connector.write(request).await {
        Ok(()) => Ok(()),
        Err(e) => {
            logger.error(&format!("{} failed: {}", handler.name(), e));
            Err(e)
        }
    }
}
