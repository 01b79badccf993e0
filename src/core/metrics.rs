use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

use super::error::Result;

/// Service counters, registered on a private registry so tests can build
/// as many instances as they like.
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,
    http_requests: IntCounterVec,
    llm_calls: IntCounterVec,
    judge_parse_fallbacks: IntCounter,
    analysis_duration: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("carbozen_http_requests_total", "HTTP requests by endpoint and status"),
            &["endpoint", "status"],
        )?;
        let llm_calls = IntCounterVec::new(
            Opts::new("carbozen_llm_calls_total", "Upstream model calls by role and outcome"),
            &["role", "outcome"],
        )?;
        let judge_parse_fallbacks = IntCounter::new(
            "carbozen_judge_parse_fallbacks_total",
            "Judge replies without a parseable JSON object",
        )?;
        let analysis_duration = Histogram::with_opts(
            HistogramOpts::new(
                "carbozen_analysis_duration_seconds",
                "Wall time of a full meal analysis",
            )
            .buckets(vec![1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0, 160.0]),
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(llm_calls.clone()))?;
        registry.register(Box::new(judge_parse_fallbacks.clone()))?;
        registry.register(Box::new(analysis_duration.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            llm_calls,
            judge_parse_fallbacks,
            analysis_duration,
        })
    }

    pub fn record_request(&self, endpoint: &str, status: u16) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
    }

    pub fn record_llm_call(&self, role: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.llm_calls.with_label_values(&[role, outcome]).inc();
    }

    pub fn record_parse_fallback(&self) {
        self.judge_parse_fallbacks.inc();
    }

    pub fn observe_analysis(&self, elapsed: Duration) {
        self.analysis_duration.observe(elapsed.as_secs_f64());
    }

    pub fn request_count(&self, endpoint: &str, status: u16) -> u64 {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[endpoint, status.as_str()])
            .get()
    }

    pub fn llm_call_count(&self, role: &str, success: bool) -> u64 {
        let outcome = if success { "ok" } else { "error" };
        self.llm_calls.with_label_values(&[role, outcome]).get()
    }

    pub fn parse_fallback_count(&self) -> u64 {
        self.judge_parse_fallbacks.get()
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| super::error::ServiceError::Internal(format!("metrics utf8: {}", e)))
    }
}
