//! # Internal Metrics Module
//!
//! Collection and exposure of dispatch metrics.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: The entry point for initializing the metrics system.
//!   It installs the Prometheus recorder and constructs the `Metrics` handle.
//!
//! - **`Metrics`**: A lightweight, cloneable struct that serves as the public
//!   API for the rest of the application to interact with the metrics system.
//!
//! The rendered exposition is served by the HTTP router under `/metrics`.

use crate::config::MetricsConfig;
use crate::core::AlertKind;
use metrics::{Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::error;

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    provider_request_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the global recorder.
    pub fn new() -> Self {
        metrics::describe_counter!("alerts_received_total", Unit::Count, "Total number of validated alert requests, labeled by kind.");
        metrics::describe_counter!("alerts_rejected_total", Unit::Count, "Total number of alert requests rejected by validation, labeled by kind.");
        metrics::describe_counter!("notifications_sent_total", Unit::Count, "Total number of outbound provider calls, labeled by outcome.");
        metrics::describe_histogram!("provider_request_duration_seconds", Unit::Seconds, "Latency of a single outbound provider call.");

        Self {
            provider_request_duration_seconds: metrics::histogram!("provider_request_duration_seconds"),
        }
    }

    /// Creates a `Metrics` instance that performs no operations.
    ///
    /// Without an installed global recorder the `metrics` macros are no-ops,
    /// so this is also what tests use.
    pub fn disabled() -> Self {
        Self {
            provider_request_duration_seconds: Histogram::noop(),
        }
    }

    pub fn increment_alerts_received(&self, kind: AlertKind) {
        metrics::counter!("alerts_received_total", "kind" => kind.data_tag()).increment(1);
    }

    pub fn increment_alerts_rejected(&self, kind: AlertKind) {
        metrics::counter!("alerts_rejected_total", "kind" => kind.data_tag()).increment(1);
    }

    /// `outcome` is one of "delivered", "failed" or "error".
    pub fn increment_notifications_sent(&self, outcome: &'static str) {
        metrics::counter!("notifications_sent_total", "outcome" => outcome).increment(1);
    }

    pub fn record_provider_request(&self, seconds: f64) {
        self.provider_request_duration_seconds.record(seconds);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the Prometheus recorder and returns the `Metrics` handle plus
    /// the render handle for `/metrics`.
    ///
    /// If metrics are disabled, or the recorder cannot be installed, this
    /// returns a disabled `Metrics` instance and `None`.
    pub fn build(self) -> (Metrics, Option<PrometheusHandle>) {
        if !self.config.enabled {
            return (Metrics::disabled(), None);
        }

        let builder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        ) {
            Ok(builder) => builder,
            Err(e) => {
                error!("Invalid histogram buckets for metrics: {}", e);
                return (Metrics::disabled(), None);
            }
        };
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return (Metrics::disabled(), None);
        }

        (Metrics::new(), Some(handle))
    }
}
