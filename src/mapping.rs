//! Wire code <-> canonical token tables
//!
//! Every settings domain the inverter reports has a forward direction (wire
//! code as read from a device response to the token used in the cache and
//! the API) and an inverse direction (token supplied by an API caller to the
//! wire code sent in a write command). Forward lookups on an unknown code
//! fail with [`GatewayError::Mapping`]; inverse lookups on an unknown token
//! fail with [`GatewayError::Validation`]. Neither direction ever falls back
//! to a default.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output source priority (QPIRI field, `POP` command)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSourcePriority {
    Utility,
    Solar,
    Sbu,
}

impl OutputSourcePriority {
    pub const ALL: [Self; 3] = [Self::Utility, Self::Solar, Self::Sbu];

    /// Forward: wire code to domain value
    pub fn from_wire(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Utility),
            1 => Ok(Self::Solar),
            2 => Ok(Self::Sbu),
            other => Err(GatewayError::mapping(format!(
                "unrecognized output source priority: {}",
                other
            ))),
        }
    }

    /// Inverse: API token to domain value
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "utility" => Ok(Self::Utility),
            "solar" => Ok(Self::Solar),
            "sbu" => Ok(Self::Sbu),
            other => Err(GatewayError::validation(
                "outputSourcePriority".to_string(),
                format!("unrecognized output source priority: {}", other),
            )),
        }
    }

    pub fn wire_code(self) -> u8 {
        match self {
            Self::Utility => 0,
            Self::Solar => 1,
            Self::Sbu => 2,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Utility => "utility",
            Self::Solar => "solar",
            Self::Sbu => "sbu",
        }
    }
}

/// Charger source priority (QPIRI field, `PCP` command)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargerSourcePriority {
    UtilityFirst,
    SolarFirst,
    SolarAndUtility,
    SolarOnly,
}

impl ChargerSourcePriority {
    pub const ALL: [Self; 4] = [
        Self::UtilityFirst,
        Self::SolarFirst,
        Self::SolarAndUtility,
        Self::SolarOnly,
    ];

    pub fn from_wire(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::UtilityFirst),
            1 => Ok(Self::SolarFirst),
            2 => Ok(Self::SolarAndUtility),
            3 => Ok(Self::SolarOnly),
            other => Err(GatewayError::mapping(format!(
                "unrecognized charger source priority: {}",
                other
            ))),
        }
    }

    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "utilityfirst" => Ok(Self::UtilityFirst),
            "solarfirst" => Ok(Self::SolarFirst),
            "solarandutility" => Ok(Self::SolarAndUtility),
            "solaronly" => Ok(Self::SolarOnly),
            other => Err(GatewayError::validation(
                "chargerSourcePriority".to_string(),
                format!("unrecognized charger source priority: {}", other),
            )),
        }
    }

    pub fn wire_code(self) -> u8 {
        match self {
            Self::UtilityFirst => 0,
            Self::SolarFirst => 1,
            Self::SolarAndUtility => 2,
            Self::SolarOnly => 3,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::UtilityFirst => "utilityfirst",
            Self::SolarFirst => "solarfirst",
            Self::SolarAndUtility => "solarandutility",
            Self::SolarOnly => "solaronly",
        }
    }
}

/// Device operating mode (QMOD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    PowerOn,
    Standby,
    Utility,
    Battery,
    Fault,
    PowerSaving,
}

impl DeviceMode {
    pub const ALL: [Self; 6] = [
        Self::PowerOn,
        Self::Standby,
        Self::Utility,
        Self::Battery,
        Self::Fault,
        Self::PowerSaving,
    ];

    pub fn from_wire(code: char) -> Result<Self> {
        match code {
            'P' => Ok(Self::PowerOn),
            'S' => Ok(Self::Standby),
            'L' => Ok(Self::Utility),
            'B' => Ok(Self::Battery),
            'F' => Ok(Self::Fault),
            'H' => Ok(Self::PowerSaving),
            other => Err(GatewayError::mapping(format!(
                "unrecognized device mode: {}",
                other
            ))),
        }
    }

    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "poweron" => Ok(Self::PowerOn),
            "standby" => Ok(Self::Standby),
            "utility" => Ok(Self::Utility),
            "battery" => Ok(Self::Battery),
            "fault" => Ok(Self::Fault),
            "powersaving" => Ok(Self::PowerSaving),
            other => Err(GatewayError::validation(
                "deviceMode".to_string(),
                format!("unrecognized device mode: {}", other),
            )),
        }
    }

    pub fn wire_code(self) -> char {
        match self {
            Self::PowerOn => 'P',
            Self::Standby => 'S',
            Self::Utility => 'L',
            Self::Battery => 'B',
            Self::Fault => 'F',
            Self::PowerSaving => 'H',
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::PowerOn => "poweron",
            Self::Standby => "standby",
            Self::Utility => "utility",
            Self::Battery => "battery",
            Self::Fault => "fault",
            Self::PowerSaving => "powersaving",
        }
    }

    /// Numeric projection exported by the `devicemode` gauge
    pub fn gauge_value(self) -> f64 {
        match self {
            Self::PowerOn => 0.0,
            Self::Standby => 1.0,
            Self::Utility => 2.0,
            Self::Battery => 3.0,
            Self::Fault => 4.0,
            Self::PowerSaving => 5.0,
        }
    }
}

/// Source currently charging the battery, projected from the AC-charging flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeSource {
    Utility,
    Solar,
}

impl ChargeSource {
    pub const ALL: [Self; 2] = [Self::Utility, Self::Solar];

    pub fn from_wire(ac_charging: bool) -> Self {
        if ac_charging {
            Self::Utility
        } else {
            Self::Solar
        }
    }

    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "utility" => Ok(Self::Utility),
            "solar" => Ok(Self::Solar),
            other => Err(GatewayError::validation(
                "chargeSource".to_string(),
                format!("unrecognized charge source: {}", other),
            )),
        }
    }

    pub fn wire_code(self) -> bool {
        matches!(self, Self::Utility)
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Utility => "utility",
            Self::Solar => "solar",
        }
    }
}

macro_rules! impl_display_token {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.token())
            }
        })*
    };
}

impl_display_token!(
    OutputSourcePriority,
    ChargerSourcePriority,
    DeviceMode,
    ChargeSource
);
