use crate::application::audit::AuditEmitter;
use crate::application::detector::{AnomalyDetector, Signals};
use crate::application::synthesizer::{DecisionSynthesizer, Ruling};
use crate::config::EngineConfig;
use crate::domain::anomaly::Anomaly;
use crate::domain::classification::Classification;
use crate::domain::iban;
use crate::domain::ports::{AuditSinkRef, ClockRef, PaymentHistoryRef, RiskClassifierRef};
use crate::domain::request::PaymentAssessmentRequest;
use crate::domain::verdict::Verdict;
use crate::error::Result;
use crate::infrastructure::clock::SystemClock;
use crate::metrics::{self, EngineMetrics};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub const ANALYSIS_ERROR_REASON: &str = "analysis error — manual review required";

/// Outcome of [`AssessmentEngine::health_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub classifier_ok: bool,
    pub history_ok: bool,
    pub response_time_ms: u64,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.classifier_ok && self.history_ok
    }
}

/// The pre-payment fraud gate.
///
/// `AssessmentEngine` runs Validate → Classify → Detect → Synthesize → Emit
/// for each request. It keeps no per-request state, so a shared reference can
/// serve any number of concurrent assessments. Collaborator failures are
/// absorbed into conservative defaults and internal faults become a REVIEW
/// verdict: [`assess`](Self::assess) always returns a `Verdict`.
pub struct AssessmentEngine {
    config: Arc<EngineConfig>,
    classifier: RiskClassifierRef,
    history: PaymentHistoryRef,
    detector: AnomalyDetector,
    synthesizer: DecisionSynthesizer,
    audit: AuditEmitter,
    clock: ClockRef,
    metrics: EngineMetrics,
}

impl AssessmentEngine {
    /// Creates a new `AssessmentEngine` instance.
    ///
    /// Compiles the anomaly rule table from `config` and spawns the audit
    /// worker, so it must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Thresholds, windows and policies; validated here.
    /// * `classifier` - The IBAN risk-classification store.
    /// * `history` - Previously assessed payments, for duplicate and velocity rules.
    /// * `audit` - Receives every final verdict.
    pub fn new(
        config: EngineConfig,
        classifier: RiskClassifierRef,
        history: PaymentHistoryRef,
        audit: AuditSinkRef,
    ) -> Result<Self> {
        Self::with_clock(config, classifier, history, audit, Arc::new(SystemClock))
    }

    /// Same as [`new`](Self::new) with an explicit clock for the off-hours
    /// rule and verdict timestamps.
    pub fn with_clock(
        config: EngineConfig,
        classifier: RiskClassifierRef,
        history: PaymentHistoryRef,
        audit: AuditSinkRef,
        clock: ClockRef,
    ) -> Result<Self> {
        config.validate()?;
        let metrics = EngineMetrics::new()?;
        let detector = AnomalyDetector::new(&config, history.clone(), metrics.clone())?;
        let synthesizer = DecisionSynthesizer::new(&config);
        let audit = AuditEmitter::spawn(audit, metrics.clone());

        Ok(Self {
            config: Arc::new(config),
            classifier,
            history,
            detector,
            synthesizer,
            audit,
            clock,
            metrics,
        })
    }

    /// Assesses one payment and returns its verdict.
    ///
    /// Never fails: errors and panics raised while evaluating are turned into a
    /// REVIEW/CRITICAL verdict that carries the fault description.
    pub async fn assess(&self, request: &PaymentAssessmentRequest) -> Verdict {
        let started = Instant::now();

        let outcome = AssertUnwindSafe(self.evaluate(request, started))
            .catch_unwind()
            .await;

        let verdict = match outcome {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                error!(invoice_id = request.invoice_id(), error = %e, "assessment failed, failing closed");
                self.fail_closed(request, &e.to_string(), started)
            }
            Err(panic) => {
                let fault = panic_message(&*panic);
                error!(invoice_id = request.invoice_id(), fault = %fault, "assessment panicked, failing closed");
                self.fail_closed(request, &fault, started)
            }
        };

        self.observe(&verdict, started);
        self.audit.emit(verdict.clone(), request.clone());
        verdict
    }

    async fn evaluate(&self, request: &PaymentAssessmentRequest, started: Instant) -> Result<Verdict> {
        if !iban::validate(request.supplier_iban()) {
            let ruling = DecisionSynthesizer::invalid_iban();
            return self.finish(request, ruling, vec![Anomaly::invalid_iban()], started);
        }

        let normalized = iban::normalize(request.supplier_iban());
        let classification = self.classify(&normalized).await;

        let signals = Signals {
            request,
            iban: &normalized,
            classification,
            now: self.clock.now(),
        };
        let anomalies = self.detector.detect(&signals).await?;

        let ruling = self
            .synthesizer
            .synthesize(classification, request.amount(), &anomalies);
        let verdict = self.finish(request, ruling, anomalies, started)?;
        self.remember(&verdict, request).await;
        Ok(verdict)
    }

    async fn classify(&self, iban: &str) -> Classification {
        match self.classifier.classify(iban).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "risk classification unavailable, treating IBAN as UNKNOWN");
                self.metrics.record_collaborator_failure(metrics::CLASSIFIER);
                Classification::Unknown
            }
        }
    }

    /// Records the payment in history so the next assessment sees it,
    /// independently of the audit worker.
    async fn remember(&self, verdict: &Verdict, request: &PaymentAssessmentRequest) {
        if let Err(e) = self.history.remember(verdict, request).await {
            warn!(invoice_id = verdict.invoice_id(), error = %e, "could not record payment in history");
            self.metrics.record_collaborator_failure(metrics::HISTORY);
        }
    }

    fn finish(
        &self,
        request: &PaymentAssessmentRequest,
        ruling: Ruling,
        anomalies: Vec<Anomaly>,
        started: Instant,
    ) -> Result<Verdict> {
        Verdict::new(
            request.invoice_id(),
            ruling.decision,
            ruling.risk_level,
            ruling.reason,
            anomalies,
            elapsed_ms(started),
            self.clock.now(),
        )
    }

    fn fail_closed(&self, request: &PaymentAssessmentRequest, fault: &str, started: Instant) -> Verdict {
        Verdict::fail_safe(
            request.invoice_id(),
            ANALYSIS_ERROR_REASON,
            Anomaly::analysis_error(fault),
            elapsed_ms(started),
            self.clock.now(),
        )
    }

    fn observe(&self, verdict: &Verdict, started: Instant) {
        self.metrics
            .record_assessment(verdict.decision(), started.elapsed().as_secs_f64());
        for anomaly in verdict.anomalies() {
            self.metrics.record_anomaly(anomaly.kind);
        }

        if !self.within_budget(verdict) {
            warn!(
                invoice_id = verdict.invoice_id(),
                response_time_ms = verdict.response_time_ms(),
                budget_ms = self.config.max_response_time_ms,
                "assessment exceeded response-time budget"
            );
            self.metrics.record_slow_assessment();
        }

        info!(
            invoice_id = verdict.invoice_id(),
            transaction_id = %verdict.transaction_id(),
            decision = %verdict.decision(),
            risk_level = %verdict.risk_level(),
            anomalies = verdict.anomalies().len(),
            "payment assessed"
        );
    }

    /// Whether the verdict was produced inside the configured response-time
    /// budget. Informational only; the engine never aborts a slow assessment.
    pub fn within_budget(&self, verdict: &Verdict) -> bool {
        verdict.response_time_ms() <= self.config.max_response_time_ms
    }

    /// Probes both read-side collaborators.
    pub async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        let classifier_ok = match self.classifier.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "risk classifier health probe failed");
                false
            }
        };
        let history_ok = match self.history.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "payment history health probe failed");
                false
            }
        };
        HealthReport {
            classifier_ok,
            history_ok,
            response_time_ms: elapsed_ms(started),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Waits until every verdict emitted so far has reached the audit sink.
    pub async fn flush_audit(&self) {
        self.audit.flush().await;
    }

    /// Drains pending audit records and stops the audit worker.
    pub async fn shutdown(self) {
        self.audit.shutdown().await;
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
