//! # Gateway Telemetry
//!
//! Observability for the cipher gateway workspace.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` registry with an `EnvFilter`, JSON
//!   output for containers and pretty output for development
//! - **Metrics**: Prometheus counters for lifecycle outcomes and a
//!   histogram for off-band computation latency
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // Log lines and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `cipher-gateway` | Service name in logs |
//! | `CG_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` overrides) |
//! | `CG_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `CG_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{build_filter, init_logging};
pub use metrics::{gather_text, register_metrics, HistogramTimer};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Init(String),

    /// Metric registration or encoding failed.
    #[error("Prometheus metrics error: {0}")]
    Metrics(String),

    /// The configuration holds an unusable value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
