//! Prometheus instrumentation for the assessment pipeline.
//!
//! Each engine owns its own `Registry`, so several engines (or tests) in one
//! process never collide on metric names.

use crate::domain::anomaly::AnomalyKind;
use crate::domain::verdict::Decision;
use crate::error::{EngineError, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub const CLASSIFIER: &str = "classifier";
pub const HISTORY: &str = "history";
pub const AUDIT: &str = "audit";

#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    assessments: IntCounterVec,
    anomalies: IntCounterVec,
    collaborator_failures: IntCounterVec,
    duration: Histogram,
    slow_assessments: IntCounter,
}

impl EngineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let assessments = IntCounterVec::new(
            Opts::new("assessments_total", "Payment assessments by final decision"),
            &["decision"],
        )
        .map_err(metric_error)?;
        let anomalies = IntCounterVec::new(
            Opts::new("anomalies_total", "Anomalies raised by kind"),
            &["kind"],
        )
        .map_err(metric_error)?;
        let collaborator_failures = IntCounterVec::new(
            Opts::new(
                "collaborator_failures_total",
                "Collaborator calls that failed and were degraded to a fallback",
            ),
            &["collaborator"],
        )
        .map_err(metric_error)?;
        let duration = Histogram::with_opts(
            HistogramOpts::new(
                "assessment_duration_seconds",
                "Wall-clock time from request entry to verdict",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0]),
        )
        .map_err(metric_error)?;
        let slow_assessments = IntCounter::new(
            "slow_assessments_total",
            "Assessments that exceeded the configured response-time budget",
        )
        .map_err(metric_error)?;

        registry
            .register(Box::new(assessments.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(anomalies.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(collaborator_failures.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(duration.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(slow_assessments.clone()))
            .map_err(metric_error)?;

        Ok(Self {
            registry,
            assessments,
            anomalies,
            collaborator_failures,
            duration,
            slow_assessments,
        })
    }

    pub fn record_assessment(&self, decision: Decision, seconds: f64) {
        self.assessments
            .with_label_values(&[decision.as_str()])
            .inc();
        self.duration.observe(seconds);
    }

    pub fn record_anomaly(&self, kind: AnomalyKind) {
        self.anomalies.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn record_collaborator_failure(&self, collaborator: &str) {
        self.collaborator_failures
            .with_label_values(&[collaborator])
            .inc();
    }

    pub fn record_slow_assessment(&self) {
        self.slow_assessments.inc();
    }

    pub fn assessments(&self, decision: Decision) -> u64 {
        self.assessments
            .with_label_values(&[decision.as_str()])
            .get()
    }

    pub fn collaborator_failures(&self, collaborator: &str) -> u64 {
        self.collaborator_failures
            .with_label_values(&[collaborator])
            .get()
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metric_error)?;
        String::from_utf8(buffer).map_err(|e| EngineError::InternalError(Box::new(e)))
    }
}

fn metric_error(e: prometheus::Error) -> EngineError {
    EngineError::InternalError(Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_render() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.record_assessment(Decision::Review, 0.004);
        metrics.record_assessment(Decision::Review, 0.002);
        metrics.record_collaborator_failure(CLASSIFIER);
        metrics.record_anomaly(AnomalyKind::Velocity);

        assert_eq!(metrics.assessments(Decision::Review), 2);
        assert_eq!(metrics.assessments(Decision::Allow), 0);
        assert_eq!(metrics.collaborator_failures(CLASSIFIER), 1);

        let text = metrics.render().unwrap();
        assert!(text.contains("assessments_total{decision=\"REVIEW\"} 2"));
        assert!(text.contains("anomalies_total{kind=\"velocity\"} 1"));
    }

    #[test]
    fn test_independent_registries() {
        let a = EngineMetrics::new().unwrap();
        let b = EngineMetrics::new().unwrap();
        a.record_slow_assessment();
        assert!(b.render().unwrap().contains("slow_assessments_total 0"));
    }
}
