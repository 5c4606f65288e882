//! Prometheus metrics for the conversion webhook
//!
//! Exposed on `/metrics`:
//! - `kanta_conversions_total{kind, direction, result}`
//! - `kanta_conversion_duration_seconds{kind, direction}`
//! - `kanta_conversion_reviews_total{result}`

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Conversion outcome label values
pub const RESULT_SUCCESS: &str = "success";
pub const RESULT_FAILURE: &str = "failure";

/// Conversion direction label values
pub const DIRECTION_TO_HUB: &str = "to_hub";
pub const DIRECTION_FROM_HUB: &str = "from_hub";

pub struct ConversionMetrics {
    registry: Registry,
    conversions_total: IntCounterVec,
    conversion_duration_seconds: HistogramVec,
    reviews_total: IntCounterVec,
}

pub type SharedMetrics = Arc<ConversionMetrics>;

impl ConversionMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let conversions_total = IntCounterVec::new(
            Opts::new(
                "kanta_conversions_total",
                "Objects converted between API versions",
            ),
            &["kind", "direction", "result"],
        )?;
        registry.register(Box::new(conversions_total.clone()))?;

        let conversion_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "kanta_conversion_duration_seconds",
                "Time spent converting a single object",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["kind", "direction"],
        )?;
        registry.register(Box::new(conversion_duration_seconds.clone()))?;

        let reviews_total = IntCounterVec::new(
            Opts::new(
                "kanta_conversion_reviews_total",
                "ConversionReview requests handled",
            ),
            &["result"],
        )?;
        registry.register(Box::new(reviews_total.clone()))?;

        Ok(Self {
            registry,
            conversions_total,
            conversion_duration_seconds,
            reviews_total,
        })
    }

    /// Record one object conversion
    pub fn record_conversion(&self, kind: &str, direction: &str, success: bool, duration_secs: f64) {
        let result = if success {
            RESULT_SUCCESS
        } else {
            RESULT_FAILURE
        };
        self.conversions_total
            .with_label_values(&[kind, direction, result])
            .inc();
        self.conversion_duration_seconds
            .with_label_values(&[kind, direction])
            .observe(duration_secs);
    }

    /// Record one ConversionReview
    pub fn record_review(&self, success: bool) {
        let result = if success {
            RESULT_SUCCESS
        } else {
            RESULT_FAILURE
        };
        self.reviews_total.with_label_values(&[result]).inc();
    }

    /// Encode all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Create the shared metrics registry
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(ConversionMetrics::new()?))
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;
