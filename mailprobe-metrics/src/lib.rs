//! OpenTelemetry metrics for mailprobe.
//!
//! Probe outcomes are pushed via OTLP to a collector, which can expose them
//! in Prometheus format for scraping. When metrics are disabled the
//! instruments still exist but record into the no-op global meter, so the
//! probe engine never has to care.

mod config;
mod error;
mod exporter;
mod probe;

pub use config::MetricsConfig;
pub use error::MetricsError;
pub use probe::ProbeMetrics;

/// Initialize the metrics pipeline.
///
/// Installs the OTLP push exporter as the global meter provider when
/// metrics are enabled; a no-op otherwise. Must run before any
/// [`ProbeMetrics`] is constructed so the instruments bind to the right
/// provider.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be initialized.
pub fn init(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("metrics collection is disabled");
        return Ok(());
    }

    tracing::info!(endpoint = %config.endpoint, "initializing OTLP metrics export");

    let provider = exporter::init_otlp_exporter(&config.endpoint)?;
    opentelemetry::global::set_meter_provider(provider);

    Ok(())
}
