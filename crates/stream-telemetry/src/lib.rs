//! # Stream Telemetry
//!
//! Logging and metrics for the stream admission pipeline.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with env filtering, JSON or pretty output
//! - **Metrics**: Prometheus counters and gauges for admission outcomes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stream_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SA_SERVICE_NAME` | `stream-admission` | Service name in logs |
//! | `SA_LOG_LEVEL` | `info` | Log level filter |
//! | `SA_JSON_LOGS` | `false` | JSON log output |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingHandle};
pub use metrics::{
    encode_metrics, observe_state, record_admission, record_rejection, register_metrics,
    MetricsHandle, ADMISSIONS_TOTAL, COUNTER_SUBJECTS, INFLIGHT_BYTES, REJECTIONS_TOTAL,
    SUBJECTS_IN_PROCESS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let logging = init_logging(&config)?;

    Ok(TelemetryGuard {
        _logging: logging,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logging: LoggingHandle,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}
