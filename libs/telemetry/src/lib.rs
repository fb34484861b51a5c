//! Logging setup for the LeanIX integration binaries.
//!
//! Installs a `tracing` subscriber filtered by `RUST_LOG` that writes JSON
//! lines by default, or human-readable text when `LOG_FORMAT=text`.

mod config;
mod tracing_init;

pub use config::TelemetryConfig;
pub use tracing_init::{init_telemetry, record_entity};

/// Installs the subscriber for `service_name` configured from the environment.
pub fn install(service_name: &str, service_version: &str) -> anyhow::Result<()> {
    init_telemetry(TelemetryConfig::from_env(service_name, service_version))
}
