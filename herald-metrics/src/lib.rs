//! OpenTelemetry metrics for the herald dispatcher
//!
//! The dispatcher keeps its own in-process counters regardless of this crate;
//! when metrics are initialised here, the same events are mirrored to
//! OpenTelemetry instruments and pushed over OTLP.
//!
//! # Architecture
//!
//! ```text
//! herald → OTLP/HTTP → OpenTelemetry Collector → Prometheus (scrape) → Grafana
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use herald_metrics::{init_metrics, MetricsConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MetricsConfig {
//!     enabled: true,
//!     endpoint: "http://localhost:4318/v1/metrics".to_string(),
//! };
//!
//! init_metrics(&config)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod exporter;

pub use config::MetricsConfig;
pub use dispatch::DispatchMetrics;
pub use error::MetricsError;
use once_cell::sync::OnceCell;
use opentelemetry_sdk::metrics::SdkMeterProvider;

/// Global metrics instance
static METRICS_INSTANCE: OnceCell<Metrics> = OnceCell::new();

/// Provider kept so buffered metrics can be flushed on exit
static PROVIDER: OnceCell<SdkMeterProvider> = OnceCell::new();

/// Root metrics container
#[derive(Debug)]
pub struct Metrics {
    pub dispatch: DispatchMetrics,
}

/// Initialize the metrics system
///
/// This must be called once at startup before any dispatcher is created.
/// If metrics are disabled in the config, this is a no-op.
///
/// # Errors
///
/// Returns an error if metrics initialization fails or if called multiple times.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("Metrics collection is disabled");
        return Ok(());
    }

    tracing::info!(
        endpoint = %config.endpoint,
        "Initializing OpenTelemetry metrics with OTLP exporter"
    );

    let provider = exporter::init_otlp_exporter(&config.endpoint)?;
    opentelemetry::global::set_meter_provider(provider.clone());

    let metrics = Metrics {
        dispatch: DispatchMetrics::new()?,
    };

    METRICS_INSTANCE
        .set(metrics)
        .map_err(|_| MetricsError::AlreadyInitialized)?;
    let _ = PROVIDER.set(provider);

    tracing::info!("Metrics collection initialized successfully");

    Ok(())
}

/// Get the global metrics instance, if metrics were initialised
#[must_use]
pub fn metrics() -> Option<&'static Metrics> {
    METRICS_INSTANCE.get()
}

/// Check if metrics are enabled
#[must_use]
pub fn is_enabled() -> bool {
    METRICS_INSTANCE.get().is_some()
}

/// Flush and stop the exporter
///
/// A no-op when metrics were never initialised.
///
/// # Errors
///
/// Returns an error if the final export fails.
pub fn shutdown() -> Result<(), MetricsError> {
    PROVIDER.get().map_or(Ok(()), |provider| {
        provider
            .shutdown()
            .map_err(|e| MetricsError::OpenTelemetry(e.to_string()))
    })
}
