//! Error types for metrics operations

use thiserror::Error;

/// Errors that can occur during metrics initialization
#[derive(Debug, Error)]
pub enum MetricsError {
    /// OpenTelemetry SDK error
    #[error("OpenTelemetry error: {0}")]
    OpenTelemetry(String),
}
