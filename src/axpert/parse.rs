//! Field parsers for query replies
//!
//! Replies are whitespace separated ASCII fields. Structural problems and
//! unparseable values are reported as mapping errors naming the query, the
//! field position and the offending text.

use crate::connector::{GeneralStatus, ParallelInfo, PvInput, RatingInfo, Warning};
use crate::error::{GatewayError, Result};
use std::str::FromStr;

struct Fields<'a> {
    query: &'static str,
    items: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn split(query: &'static str, payload: &'a str, min: usize) -> Result<Self> {
        let items: Vec<&str> = payload.split_whitespace().collect();
        if items.len() < min {
            return Err(GatewayError::mapping(format!(
                "{} reply has {} fields, expected at least {}",
                query,
                items.len(),
                min
            )));
        }
        Ok(Self { query, items })
    }

    fn raw(&self, idx: usize) -> &'a str {
        self.items.get(idx).copied().unwrap_or_default()
    }

    fn get<T: FromStr>(&self, idx: usize) -> Result<T> {
        let raw = self.raw(idx);
        raw.parse::<T>().map_err(|_| {
            GatewayError::mapping(format!(
                "{} field {} is not valid: '{}'",
                self.query, idx, raw
            ))
        })
    }

    fn opt<T: FromStr>(&self, idx: usize) -> Option<T> {
        self.items.get(idx).and_then(|s| s.parse::<T>().ok())
    }

    /// Status bit string, most significant flag first
    fn bits(&self, idx: usize, len: usize) -> Result<Vec<bool>> {
        let raw = self.raw(idx);
        if raw.len() < len {
            return Err(GatewayError::mapping(format!(
                "{} field {} is not a {}-bit flag string: '{}'",
                self.query, idx, len, raw
            )));
        }
        raw.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(GatewayError::mapping(format!(
                    "{} field {} has unrecognized flag '{}'",
                    self.query, idx, other
                ))),
            })
            .collect()
    }
}

pub fn parse_serial_number(payload: &str) -> Result<String> {
    let serial = payload.trim();
    if serial.is_empty() || !serial.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(GatewayError::mapping(format!(
            "QID reply is not a serial number: '{}'",
            payload
        )));
    }
    Ok(serial.to_string())
}

pub fn parse_general_status(payload: &str) -> Result<GeneralStatus> {
    let f = Fields::split("QPIGS", payload, 17)?;
    // b7 .. b0: sbu version, config changed, scc fw updated, load on,
    // steady while charging, charging on, scc charging on, ac charging on
    let status = f.bits(16, 8)?;

    Ok(GeneralStatus {
        grid_voltage: f.get(0)?,
        grid_frequency: f.get(1)?,
        ac_output_voltage: f.get(2)?,
        ac_output_frequency: f.get(3)?,
        ac_output_apparent_power: f.get(4)?,
        ac_output_active_power: f.get(5)?,
        output_load_percent: f.get(6)?,
        bus_voltage: f.get(7)?,
        battery_voltage: f.get(8)?,
        battery_charging_current: f.get(9)?,
        battery_capacity: f.get(10)?,
        heatsink_temperature: f.get(11)?,
        battery_discharge_current: f.get(15)?,
        pv_inputs: vec![PvInput {
            current: f.get(12)?,
            voltage: f.get(13)?,
            scc_charging_on: status[6],
        }],
        load_on: status[3],
        charging_on: status[5],
        ac_charging_on: status[7],
    })
}

pub fn parse_parallel_info(payload: &str) -> Result<ParallelInfo> {
    let f = Fields::split("QPGS", payload, 22)?;
    // b7 .. b0: scc ok, ac charging, scc charging, battery status (2 bits),
    // line loss, load on, config changed
    let status = f.bits(19, 8)?;
    let work_mode = f.raw(2).chars().next().unwrap_or(' ');

    Ok(ParallelInfo {
        parallel_exists: f.get::<u8>(0)? == 1,
        serial_number: f.raw(1).to_string(),
        work_mode,
        fault_code: f.get(3)?,
        total_charging_current: f.get(15)?,
        total_output_active_power: f.get(17)?,
        scc_ok: status[0],
        ac_charging: status[1],
        scc_charging: status[2],
        line_loss: status[5],
        load_on: status[6],
        output_mode: f.get(20)?,
        charger_source_priority: f.get(21)?,
    })
}

pub fn parse_rating_info(payload: &str) -> Result<RatingInfo> {
    let f = Fields::split("QPIRI", payload, 23)?;

    Ok(RatingInfo {
        grid_rating_voltage: f.get(0)?,
        grid_rating_current: f.get(1)?,
        ac_output_rating_voltage: f.get(2)?,
        ac_output_rating_frequency: f.get(3)?,
        ac_output_rating_current: f.get(4)?,
        ac_output_rating_apparent_power: f.get(5)?,
        ac_output_rating_active_power: f.get(6)?,
        battery_rating_voltage: f.get(7)?,
        battery_recharge_voltage: f.get(8)?,
        battery_under_voltage: f.get(9)?,
        battery_bulk_voltage: f.get(10)?,
        battery_float_voltage: f.get(11)?,
        battery_type: f.get(12)?,
        max_ac_charging_current: f.get(13)?,
        max_charging_current: f.get(14)?,
        output_source_priority: f.get(16)?,
        charger_source_priority: f.get(17)?,
        output_mode: f.opt(21).unwrap_or_default(),
        battery_redischarge_voltage: f.get(22)?,
    })
}

pub fn parse_warnings(payload: &str) -> Result<Vec<Warning>> {
    let raw = payload.trim();
    if raw.is_empty() {
        return Err(GatewayError::mapping("QPIWS reply is empty"));
    }
    let mut warnings = Vec::new();
    for (idx, c) in raw.chars().enumerate() {
        match c {
            '0' => {}
            '1' => warnings.extend(Warning::from_index(idx)),
            other => {
                return Err(GatewayError::mapping(format!(
                    "QPIWS has unrecognized flag '{}' at {}",
                    other, idx
                )));
            }
        }
    }
    Ok(warnings)
}

pub fn parse_device_mode(payload: &str) -> Result<char> {
    let raw = payload.trim();
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(GatewayError::mapping(format!(
            "QMOD reply is not a mode letter: '{}'",
            raw
        ))),
    }
}

pub fn parse_output_mode(payload: &str) -> Result<u8> {
    let raw = payload.trim();
    raw.parse::<u8>().map_err(|_| {
        GatewayError::mapping(format!("QOPM reply is not an output mode: '{}'", raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QPIGS: &str = "230.0 49.9 229.9 49.9 0436 0390 008 394 52.10 012 078 0035 02.3 310.4 52.13 00000 00110110 00 00 00717 010";
    const QPGS0: &str = "1 92931701100715 B 00 000.0 00.00 230.0 50.00 0276 0223 005 51.4 000 068 000.0 000 00276 00223 005 10100010 0 1 100 120 30 00 000";
    const QPIRI: &str = "230.0 21.7 230.0 50.0 21.7 5000 4000 48.0 46.0 42.0 56.4 54.0 2 30 060 0 2 3 9 01 0 0 54.0 0 1";

    #[test]
    fn parses_general_status() {
        let gs = parse_general_status(QPIGS).unwrap();
        assert_eq!(gs.grid_voltage, 230.0);
        assert_eq!(gs.ac_output_active_power, 390.0);
        assert_eq!(gs.battery_capacity, 78.0);
        assert_eq!(gs.pv_inputs.len(), 1);
        assert_eq!(gs.pv_inputs[0].voltage, 310.4);
        assert_eq!(gs.pv_inputs[0].current, 2.3);
        // 00110110: load on, charging on, scc charging on
        assert!(gs.load_on);
        assert!(gs.charging_on);
        assert!(gs.pv_inputs[0].scc_charging_on);
        assert!(!gs.ac_charging_on);
    }

    #[test]
    fn parses_parallel_info() {
        let pi = parse_parallel_info(QPGS0).unwrap();
        assert!(pi.parallel_exists);
        assert_eq!(pi.serial_number, "92931701100715");
        assert_eq!(pi.work_mode, 'B');
        // 10100010: scc ok, scc charging, load on
        assert!(pi.scc_ok);
        assert!(!pi.ac_charging);
        assert!(pi.scc_charging);
        assert!(!pi.line_loss);
        assert!(pi.load_on);
        assert_eq!(pi.output_mode, 0);
        assert_eq!(pi.charger_source_priority, 1);
    }

    #[test]
    fn parses_rating_info() {
        let ri = parse_rating_info(QPIRI).unwrap();
        assert_eq!(ri.battery_recharge_voltage, 46.0);
        assert_eq!(ri.battery_under_voltage, 42.0);
        assert_eq!(ri.battery_float_voltage, 54.0);
        assert_eq!(ri.max_ac_charging_current, 30.0);
        assert_eq!(ri.output_source_priority, 2);
        assert_eq!(ri.charger_source_priority, 3);
        assert_eq!(ri.battery_redischarge_voltage, 54.0);
    }

    #[test]
    fn short_or_garbled_replies_are_mapping_errors() {
        assert!(matches!(
            parse_rating_info("230.0 21.7"),
            Err(GatewayError::Mapping { .. })
        ));
        let garbled = QPIGS.replacen("230.0", "2x0.0", 1);
        let err = parse_general_status(&garbled).unwrap_err();
        assert!(err.to_string().contains("2x0.0"));
        let bad_flags = QPIGS.replace("00110110", "0011x110");
        assert!(parse_general_status(&bad_flags).is_err());
    }

    #[test]
    fn parses_warnings() {
        let mut bits = vec!['0'; 32];
        bits[16] = '1';
        bits[13] = '1'; // reserved, ignored
        bits[1] = '1';
        let raw: String = bits.into_iter().collect();
        let w = parse_warnings(&raw).unwrap();
        assert_eq!(w, vec![Warning::InverterFault, Warning::Overload]);
        assert!(parse_warnings("00a0").is_err());
        assert!(parse_warnings("").is_err());
    }

    #[test]
    fn parses_mode_and_output_mode() {
        assert_eq!(parse_device_mode("L").unwrap(), 'L');
        assert!(parse_device_mode("LB").is_err());
        assert_eq!(parse_output_mode("02").unwrap(), 2);
        assert!(parse_output_mode("x").is_err());
        assert_eq!(parse_serial_number("92931701100715").unwrap(), "92931701100715");
        assert!(parse_serial_number("92931 7011").is_err());
        assert!(parse_serial_number("").is_err());
    }
}
