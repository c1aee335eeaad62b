use serde::{Deserialize, Serialize};

/// General status parameters (QPIGS)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralStatus {
    pub grid_voltage: f64,
    pub grid_frequency: f64,
    pub ac_output_voltage: f64,
    pub ac_output_frequency: f64,
    pub ac_output_apparent_power: f64,
    pub ac_output_active_power: f64,
    pub output_load_percent: f64,
    pub bus_voltage: f64,
    pub battery_voltage: f64,
    pub battery_charging_current: f64,
    pub battery_capacity: f64,
    pub heatsink_temperature: f64,
    pub battery_discharge_current: f64,
    /// One entry per PV string the model reports
    pub pv_inputs: Vec<PvInput>,
    pub load_on: bool,
    pub charging_on: bool,
    pub ac_charging_on: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PvInput {
    pub voltage: f64,
    pub current: f64,
    /// Solar charge controller of this string is charging
    pub scc_charging_on: bool,
}

/// Parallel system information for one unit (QPGSn)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParallelInfo {
    pub parallel_exists: bool,
    pub serial_number: String,
    /// Raw work mode letter, same alphabet as QMOD
    pub work_mode: char,
    pub fault_code: u16,
    pub total_charging_current: f64,
    pub total_output_active_power: f64,
    pub scc_ok: bool,
    pub ac_charging: bool,
    pub scc_charging: bool,
    pub line_loss: bool,
    pub load_on: bool,
    pub output_mode: u8,
    /// Raw charger source priority code
    pub charger_source_priority: u8,
}

/// Device rating information (QPIRI)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingInfo {
    pub grid_rating_voltage: f64,
    pub grid_rating_current: f64,
    pub ac_output_rating_voltage: f64,
    pub ac_output_rating_frequency: f64,
    pub ac_output_rating_current: f64,
    pub ac_output_rating_apparent_power: f64,
    pub ac_output_rating_active_power: f64,
    pub battery_rating_voltage: f64,
    pub battery_recharge_voltage: f64,
    pub battery_under_voltage: f64,
    pub battery_bulk_voltage: f64,
    pub battery_float_voltage: f64,
    pub battery_type: u8,
    pub max_ac_charging_current: f64,
    pub max_charging_current: f64,
    /// Raw output source priority code
    pub output_source_priority: u8,
    /// Raw charger source priority code
    pub charger_source_priority: u8,
    pub output_mode: u8,
    pub battery_redischarge_voltage: f64,
}

/// Warning flags reported by QPIWS, indexed by their position in the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Warning {
    InverterFault,
    BusOver,
    BusUnder,
    BusSoftFail,
    LineFail,
    OpvShort,
    InverterVoltageTooLow,
    InverterVoltageTooHigh,
    OverTemperature,
    FanLocked,
    BatteryVoltageHigh,
    BatteryLowAlarm,
    BatteryUnderShutdown,
    Overload,
    EepromFault,
    InverterOverCurrent,
    InverterSoftFail,
    SelfTestFail,
    OpDcVoltageOver,
    BatteryOpen,
    CurrentSensorFail,
    BatteryShort,
    PowerLimit,
    PvVoltageHigh,
    MpptOverloadFault,
    MpptOverloadWarning,
    BatteryTooLowToCharge,
}

impl Warning {
    /// Flag at position `index` of the QPIWS bit string; reserved slots are `None`
    pub fn from_index(index: usize) -> Option<Self> {
        let w = match index {
            1 => Self::InverterFault,
            2 => Self::BusOver,
            3 => Self::BusUnder,
            4 => Self::BusSoftFail,
            5 => Self::LineFail,
            6 => Self::OpvShort,
            7 => Self::InverterVoltageTooLow,
            8 => Self::InverterVoltageTooHigh,
            9 => Self::OverTemperature,
            10 => Self::FanLocked,
            11 => Self::BatteryVoltageHigh,
            12 => Self::BatteryLowAlarm,
            14 => Self::BatteryUnderShutdown,
            16 => Self::Overload,
            17 => Self::EepromFault,
            18 => Self::InverterOverCurrent,
            19 => Self::InverterSoftFail,
            20 => Self::SelfTestFail,
            21 => Self::OpDcVoltageOver,
            22 => Self::BatteryOpen,
            23 => Self::CurrentSensorFail,
            24 => Self::BatteryShort,
            25 => Self::PowerLimit,
            26 => Self::PvVoltageHigh,
            27 => Self::MpptOverloadFault,
            28 => Self::MpptOverloadWarning,
            29 => Self::BatteryTooLowToCharge,
            _ => return None,
        };
        Some(w)
    }
}

/// Validated write requests understood by a connector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteRequest {
    OutputSourcePriority(u8),
    ChargerSourcePriority(u8),
    BatteryRechargeVoltage(f64),
    BatteryRedischargeVoltage(f64),
}
