//! Periodic telemetry collection
//!
//! One cycle visits every inverter in discovery order and, with that
//! inverter's lock held throughout, fetches each section in
//! [`Section::ORDER`]. A section that fails is logged and skipped; the
//! remaining sections still run. Any section failure, or a settings field
//! whose wire value cannot be mapped, raises the cycle's error flag which
//! ends up in the `axpert_scrape_error` gauge.

use crate::connector::{Section, SectionPayload};
use crate::inverter::{Inverter, Inverters};
use crate::logging::{StructuredLogger, get_logger};
use crate::mapping::DeviceMode;
use crate::metrics::GatewayMetrics;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval};

/// One failed section within a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SectionFailure {
    pub serialno: String,
    pub section: Section,
    pub message: String,
}

/// Outcome of a single poll cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub devices_polled: usize,
    pub failures: Vec<SectionFailure>,
}

impl CycleReport {
    /// Whether the scrape error flag is raised for this cycle
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    fn fail(&mut self, serialno: &str, section: Section, message: String) {
        self.failures.push(SectionFailure {
            serialno: serialno.to_string(),
            section,
            message,
        });
    }
}

#[derive(Clone)]
pub struct Poller {
    inverters: Inverters,
    metrics: GatewayMetrics,
    interval: Duration,
    logger: StructuredLogger,
}

impl Poller {
    pub fn new(inverters: Inverters, metrics: GatewayMetrics, interval: Duration) -> Self {
        Self {
            inverters,
            metrics,
            interval,
            logger: get_logger("poller"),
        }
    }

    /// Poll at a fixed rate until `shutdown` flips to true.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// delays the next one instead of triggering a burst.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.logger.info(&format!(
            "Starting metrics collection every {}s for {} inverter(s)",
            self.interval.as_secs_f64(),
            self.inverters.len()
        ));

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let report = self.run_cycle().await;
                    let elapsed = started.elapsed();
                    let overrun = elapsed > self.interval;
                    self.metrics.record_cycle(elapsed.as_secs_f64(), overrun);
                    if overrun {
                        self.logger.warn(&format!(
                            "Poll cycle took {:?}, longer than the {:?} interval",
                            elapsed, self.interval
                        ));
                    }
                    self.logger.debug(&format!(
                        "Poll cycle {} done in {:?}: {} device(s), {} failed section(s)",
                        self.metrics.poll_cycles(),
                        elapsed,
                        report.devices_polled,
                        report.failures.len()
                    ));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.logger.info("Stopping metrics collection");
                        break;
                    }
                }
            }
        }
    }

    /// Run one full cycle over all inverters and publish the scrape error flag
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        for inverter in self.inverters.iter() {
            self.poll_inverter(inverter, &mut report).await;
            report.devices_polled += 1;
        }
        self.metrics.set_scrape_error(report.failed());
        report
    }

    async fn poll_inverter(&self, inverter: &Inverter, report: &mut CycleReport) {
        let serialno = inverter.serial_no();
        let logger = self.logger.for_serialno(serialno);
        let mut state = inverter.lock().await;

        for section in Section::ORDER {
            let payload = match state.connector.fetch(section).await {
                Ok(payload) => payload,
                Err(e) => {
                    logger.error(&format!("Failed to read {}: {}", section, e));
                    report.fail(serialno, section, e.to_string());
                    continue;
                }
            };

            self.record(serialno, &payload);

            for (field, err) in state.apply_settings(&payload.settings_updates()) {
                logger.error(&format!("Failed to update {}: {}", field, err));
                report.fail(serialno, payload.section(), format!("{}: {}", field, err));
            }
        }
    }

    fn record(&self, serialno: &str, payload: &SectionPayload) {
        match payload {
            SectionPayload::GeneralStatus(gs) => self.metrics.record_general_status(serialno, gs),
            SectionPayload::ParallelInfo(pi) => self.metrics.record_parallel_info(serialno, pi),
            SectionPayload::RatingInfo(ri) => self.metrics.record_rating_info(serialno, ri),
            SectionPayload::Warnings(w) => self.metrics.record_warnings(serialno, w),
            SectionPayload::DeviceMode(code) => {
                // An unknown letter keeps the previous gauge value; the
                // settings update reports it
                if let Ok(mode) = DeviceMode::from_wire(*code) {
                    self.metrics.record_device_mode(serialno, mode.gauge_value());
                }
            }
            SectionPayload::OutputMode(mode) => self.metrics.record_output_mode(serialno, *mode),
        }
    }
}
