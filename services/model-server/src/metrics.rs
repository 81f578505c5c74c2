//! Prediction metrics in the Prometheus text exposition format.
//!
//! Each server instance owns its registry, so several instances can live in
//! one process (tests) without clobbering each other's counters.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct ServingMetrics {
    registry: Registry,
    pub requests_total: IntCounterVec,
    pub predictions_total: IntCounterVec,
    pub request_duration: HistogramVec,
}

impl ServingMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("ml_requests_total", "Total number of prediction requests"),
            &["model_version"],
        )?;
        let predictions_total = IntCounterVec::new(
            Opts::new("ml_predictions_total", "Total number of predictions made"),
            &["model_version", "prediction_class"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("ml_request_duration_seconds", "Time spent processing prediction requests"),
            &["model_version"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self { registry, requests_total, predictions_total, request_duration })
    }

    /// Returns the content type and the encoded exposition.
    pub fn render(&self) -> prometheus::Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok((encoder.format_type().to_string(), buf))
    }
}
