//! Prometheus metrics registry
//!
//! All inverter gauges carry a single `serialno` label and hold the last
//! value written; no history is kept. The registry is built once at startup
//! and shared by reference between the poller and the scrape handler.

use crate::connector::{GeneralStatus, ParallelInfo, RatingInfo, Warning};
use crate::error::Result;
use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

const NAMESPACE: &str = "axpert";
const LABEL: &str = "serialno";

/// Number of PV strings exported as separate gauges
pub const PV_INPUTS: usize = 3;

fn bool_gauge(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Metrics published by the gateway
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Arc<Registry>,

    grid_frequency: GaugeVec,
    grid_voltage: GaugeVec,
    pv_input_voltage: [GaugeVec; PV_INPUTS],
    pv_input_current: [GaugeVec; PV_INPUTS],
    scc_charge_on: [GaugeVec; PV_INPUTS],
    ac_output_voltage: GaugeVec,
    ac_output_frequency: GaugeVec,
    ac_output_apparent_power: GaugeVec,
    ac_output_active_power: GaugeVec,
    output_load_percent: GaugeVec,
    heatsink_temperature: GaugeVec,
    battery_voltage: GaugeVec,
    battery_capacity: GaugeVec,
    battery_charge_current: GaugeVec,
    battery_discharge_current: GaugeVec,
    charge_on: GaugeVec,

    line_loss: GaugeVec,
    load_on: GaugeVec,
    ac_charge_on: GaugeVec,

    output_source_priority: GaugeVec,
    charger_source_priority: GaugeVec,
    charger_max_current: GaugeVec,
    battery_recharge_voltage: GaugeVec,
    battery_redischarge_voltage: GaugeVec,
    battery_cutoff_voltage: GaugeVec,
    battery_float_voltage: GaugeVec,

    overload: GaugeVec,
    device_mode: GaugeVec,
    output_mode: GaugeVec,

    scrape_error: Gauge,
    poll_cycles: IntCounter,
    poll_overruns: IntCounter,
    poll_duration: Histogram,
}

struct Builder<'a> {
    registry: &'a Registry,
}

impl Builder<'_> {
    fn gauge_vec(&self, name: &str, help: &str) -> Result<GaugeVec> {
        let gauge = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), &[LABEL])?;
        self.registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    fn numbered(&self, name: &str, help: &str) -> Result<[GaugeVec; PV_INPUTS]> {
        let make = |i: usize| {
            self.gauge_vec(
                &name.replace("{}", &i.to_string()),
                &help.replace("{}", &i.to_string()),
            )
        };
        Ok([make(1)?, make(2)?, make(3)?])
    }
}

impl GatewayMetrics {
    /// Create a fresh registry and register every gateway metric in it
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let b = Builder {
            registry: &registry,
        };

        let scrape_error = Gauge::with_opts(
            Opts::new("scrape_error", "Returns 1 if the last scrape failed").namespace(NAMESPACE),
        )?;
        registry.register(Box::new(scrape_error.clone()))?;

        let poll_cycles = IntCounter::with_opts(
            Opts::new("poll_cycles_total", "Total number of completed poll cycles")
                .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(poll_cycles.clone()))?;

        let poll_overruns = IntCounter::with_opts(
            Opts::new(
                "poll_overruns_total",
                "Poll cycles that took longer than the configured interval",
            )
            .namespace(NAMESPACE),
        )?;
        registry.register(Box::new(poll_overruns.clone()))?;

        let poll_duration = Histogram::with_opts(
            HistogramOpts::new("poll_duration_seconds", "Duration of a full poll cycle")
                .namespace(NAMESPACE)
                .buckets(prometheus::exponential_buckets(0.05, 2.0, 10)?),
        )?;
        registry.register(Box::new(poll_duration.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            grid_frequency: b.gauge_vec("grid_frequency", "Grid frequency in herz")?,
            grid_voltage: b.gauge_vec("grid_voltage", "Grid voltage")?,
            pv_input_voltage: b.numbered("pvinput{}_voltage", "PV input {} voltage")?,
            pv_input_current: b.numbered("pvinput{}_current", "PV input {} current in amps")?,
            scc_charge_on: b.numbered(
                "sccchargeon{}",
                "Returns 1 if battery is being charged with solar power {}",
            )?,
            ac_output_voltage: b.gauge_vec("acoutput_voltage", "AC output voltage")?,
            ac_output_frequency: b
                .gauge_vec("acoutput_frequency", "AC output frequency in herz")?,
            ac_output_apparent_power: b.gauge_vec(
                "acoutput_apparent_power",
                "AC output apparent power in volt-amps",
            )?,
            ac_output_active_power: b
                .gauge_vec("acoutput_active_power", "AC output active power in watts")?,
            output_load_percent: b
                .gauge_vec("output_load_percent", "Output load in percentage")?,
            heatsink_temperature: b
                .gauge_vec("heatsink_temperature", "Heatsink temperature in celsius")?,
            battery_voltage: b.gauge_vec("battery_voltage", "Battery voltage")?,
            battery_capacity: b
                .gauge_vec("battery_capacity_percent", "Battery capacity in percentage")?,
            battery_charge_current: b
                .gauge_vec("battery_charge_current", "Battery charge current in amps")?,
            battery_discharge_current: b.gauge_vec(
                "battery_discharge_current",
                "Battery discharge current in amps",
            )?,
            charge_on: b.gauge_vec("chargeon", "Returns 1 if battery is being charged")?,
            line_loss: b.gauge_vec("lineloss", "Returns 1 if utility line is offline")?,
            load_on: b.gauge_vec("loadon", "Returns 1 if output has load")?,
            ac_charge_on: b.gauge_vec(
                "acchargeon",
                "Returns 1 if battery is being charged with utility power",
            )?,
            output_source_priority: b.gauge_vec(
                "output_sourcepriority",
                "Shows the output source priority - 0: Utility first, 1: Solar first, 2: SBU first",
            )?,
            charger_source_priority: b.gauge_vec(
                "charger_sourcepriority",
                "Shows the charger source priority - 0: Utility first, 1: Solar first, 2: Solar and utility, 3: Solar only",
            )?,
            charger_max_current: b
                .gauge_vec("charger_maxcurrent", "Max AC charging current in amps")?,
            battery_recharge_voltage: b
                .gauge_vec("battery_recharge_voltage", "Battery recharge voltage")?,
            battery_redischarge_voltage: b
                .gauge_vec("battery_redischarge_voltage", "Battery redischarge voltage")?,
            battery_cutoff_voltage: b
                .gauge_vec("battery_cutoff_voltage", "Battery under / cutoff voltage")?,
            battery_float_voltage: b.gauge_vec("battery_float_voltage", "Battery float voltage")?,
            overload: b.gauge_vec("overload", "Returns 1 if system is overloaded")?,
            device_mode: b.gauge_vec(
                "devicemode",
                "Shows the device mode - 0: PowerOnMode, 1: StandbyMode, 2: LineMode, 3: BatteryMode, 4: FaultMode, 5: PowerSavingMode",
            )?,
            output_mode: b.gauge_vec(
                "outputmode",
                "Shows the output mode - 0: SingleMachine, 1: Parallel, 2: Phase1, 3: Phase2, 4: Phase3",
            )?,
            scrape_error,
            poll_cycles,
            poll_overruns,
            poll_duration,
            registry,
        })
    }

    pub fn record_general_status(&self, serialno: &str, gs: &GeneralStatus) {
        let l = &[serialno];
        self.grid_frequency.with_label_values(l).set(gs.grid_frequency);
        self.grid_voltage.with_label_values(l).set(gs.grid_voltage);
        for i in 0..PV_INPUTS {
            let pv = gs.pv_inputs.get(i).cloned().unwrap_or_default();
            self.pv_input_voltage[i].with_label_values(l).set(pv.voltage);
            self.pv_input_current[i].with_label_values(l).set(pv.current);
            self.scc_charge_on[i]
                .with_label_values(l)
                .set(bool_gauge(pv.scc_charging_on));
        }
        self.ac_output_voltage
            .with_label_values(l)
            .set(gs.ac_output_voltage);
        self.ac_output_frequency
            .with_label_values(l)
            .set(gs.ac_output_frequency);
        self.ac_output_apparent_power
            .with_label_values(l)
            .set(gs.ac_output_apparent_power);
        self.ac_output_active_power
            .with_label_values(l)
            .set(gs.ac_output_active_power);
        self.output_load_percent
            .with_label_values(l)
            .set(gs.output_load_percent);
        self.heatsink_temperature
            .with_label_values(l)
            .set(gs.heatsink_temperature);
        self.battery_voltage.with_label_values(l).set(gs.battery_voltage);
        self.battery_capacity
            .with_label_values(l)
            .set(gs.battery_capacity);
        self.battery_charge_current
            .with_label_values(l)
            .set(gs.battery_charging_current);
        self.battery_discharge_current
            .with_label_values(l)
            .set(gs.battery_discharge_current);
        self.charge_on
            .with_label_values(l)
            .set(bool_gauge(gs.charging_on));
    }

    pub fn record_parallel_info(&self, serialno: &str, pi: &ParallelInfo) {
        let l = &[serialno];
        self.load_on.with_label_values(l).set(bool_gauge(pi.load_on));
        self.line_loss
            .with_label_values(l)
            .set(bool_gauge(pi.line_loss));
        self.ac_charge_on
            .with_label_values(l)
            .set(bool_gauge(pi.ac_charging));
    }

    pub fn record_rating_info(&self, serialno: &str, ri: &RatingInfo) {
        let l = &[serialno];
        self.output_source_priority
            .with_label_values(l)
            .set(f64::from(ri.output_source_priority));
        self.charger_source_priority
            .with_label_values(l)
            .set(f64::from(ri.charger_source_priority));
        self.charger_max_current
            .with_label_values(l)
            .set(ri.max_ac_charging_current);
        self.battery_recharge_voltage
            .with_label_values(l)
            .set(ri.battery_recharge_voltage);
        self.battery_redischarge_voltage
            .with_label_values(l)
            .set(ri.battery_redischarge_voltage);
        self.battery_cutoff_voltage
            .with_label_values(l)
            .set(ri.battery_under_voltage);
        self.battery_float_voltage
            .with_label_values(l)
            .set(ri.battery_float_voltage);
    }

    pub fn record_warnings(&self, serialno: &str, warnings: &[Warning]) {
        self.overload
            .with_label_values(&[serialno])
            .set(bool_gauge(warnings.contains(&Warning::Overload)));
    }

    /// Numeric projection of the device mode
    pub fn record_device_mode(&self, serialno: &str, value: f64) {
        self.device_mode.with_label_values(&[serialno]).set(value);
    }

    pub fn record_output_mode(&self, serialno: &str, mode: u8) {
        self.output_mode
            .with_label_values(&[serialno])
            .set(f64::from(mode));
    }

    pub fn set_scrape_error(&self, failed: bool) {
        self.scrape_error.set(bool_gauge(failed));
    }

    pub fn scrape_error(&self) -> f64 {
        self.scrape_error.get()
    }

    pub fn record_cycle(&self, seconds: f64, overrun: bool) {
        self.poll_cycles.inc();
        self.poll_duration.observe(seconds);
        if overrun {
            self.poll_overruns.inc();
        }
    }

    pub fn poll_cycles(&self) -> u64 {
        self.poll_cycles.get()
    }

    pub fn poll_overruns(&self) -> u64 {
        self.poll_overruns.get()
    }

    /// Encode every registered family in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&families, &mut buf)?;
        String::from_utf8(buf).map_err(|e| crate::error::GatewayError::metrics(e.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::PvInput;

    #[test]
    fn gauges_are_labeled_by_serial_number() {
        let metrics = GatewayMetrics::new().unwrap();
        let gs = GeneralStatus {
            grid_voltage: 231.5,
            charging_on: true,
            pv_inputs: vec![PvInput {
                voltage: 310.0,
                current: 2.5,
                scc_charging_on: true,
            }],
            ..Default::default()
        };
        metrics.record_general_status("92931701100715", &gs);
        metrics.record_warnings("92931701100715", &[Warning::Overload]);

        let text = metrics.render().unwrap();
        assert!(text.contains("axpert_grid_voltage{serialno=\"92931701100715\"} 231.5"));
        assert!(text.contains("axpert_pvinput1_voltage{serialno=\"92931701100715\"} 310"));
        assert!(text.contains("axpert_pvinput2_voltage{serialno=\"92931701100715\"} 0"));
        assert!(text.contains("axpert_sccchargeon1{serialno=\"92931701100715\"} 1"));
        assert!(text.contains("axpert_chargeon{serialno=\"92931701100715\"} 1"));
        assert!(text.contains("axpert_overload{serialno=\"92931701100715\"} 1"));
    }

    #[test]
    fn scrape_error_and_cycle_bookkeeping() {
        let metrics = GatewayMetrics::new().unwrap();
        metrics.set_scrape_error(true);
        assert_eq!(metrics.scrape_error(), 1.0);
        metrics.set_scrape_error(false);
        assert_eq!(metrics.scrape_error(), 0.0);

        metrics.record_cycle(0.2, false);
        metrics.record_cycle(45.0, true);
        assert_eq!(metrics.poll_cycles(), 2);
        let text = metrics.render().unwrap();
        assert!(text.contains("axpert_poll_overruns_total 1"));
        assert!(text.contains("axpert_scrape_error 0"));
    }

    #[test]
    fn registries_are_independent() {
        let a = GatewayMetrics::new().unwrap();
        let b = GatewayMetrics::new().unwrap();
        a.record_output_mode("X", 2);
        assert!(!b.render().unwrap().contains("axpert_outputmode{"));
    }
}
