//! Bridges Honeywell Total Connect Comfort thermostats to MQTT.
//!
//! The TCC service is reached through the [`tcc::TccApi`] and
//! [`tcc::TccSession`] traits; [`bridge::run`] wires a login, device discovery,
//! the poll loop and one MQTT connection per thermostat together.

pub mod bridge;
pub mod error;
pub mod mqtt;
pub mod polling;
pub mod protocols;
pub mod settings;
pub mod tcc;
pub mod temperature;
pub mod thermostat;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use settings::{read_settings, Settings};
pub use temperature::{Temperature, Unit};
