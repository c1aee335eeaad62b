//! # axpert-gateway - telemetry and control for Axpert solar inverters
//!
//! Polls one or more Axpert/Voltronic inverters over their HID/serial
//! device nodes, exports the readings as Prometheus gauges and offers a
//! small JSON API for reading cached settings and issuing validated
//! configuration commands.
//!
//! ## Architecture
//!
//! - `mapping`: wire code <-> canonical token tables
//! - `settings`: per-inverter settings snapshot with independent fields
//! - `connector`: device capability trait and section payloads
//! - `axpert`: Axpert protocol connector (framing, CRC, parsing)
//! - `inverter`: discovered inverters and their exclusive lock
//! - `poller`: fixed-rate telemetry collection
//! - `commands`: command validation and dispatch
//! - `metrics`: Prometheus registry
//! - `web`: HTTP server and JSON API
//! - `config`: configuration management and validation
//! - `logging`: structured logging and tracing

pub mod axpert;
pub mod commands;
pub mod config;
pub mod connector;
pub mod error;
pub mod inverter;
pub mod logging;
pub mod mapping;
pub mod metrics;
pub mod poller;
pub mod settings;
pub mod web;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use error::{GatewayError, Result};
pub use inverter::{Inverter, Inverters};
