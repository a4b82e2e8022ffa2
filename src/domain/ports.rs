use super::classification::Classification;
use super::request::PaymentAssessmentRequest;
use super::verdict::Verdict;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Lookup into the external IBAN risk-classification store.
///
/// Implementations return `Classification::Unknown` when the IBAN is not
/// present; an `Err` is reserved for transport or storage failures.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    async fn classify(&self, iban: &str) -> Result<Classification>;

    /// Liveness probe used by health checks.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Access to previously assessed payments.
#[async_trait]
pub trait PaymentHistory: Send + Sync {
    /// Payments to `iban` for exactly `amount` within the trailing `window`.
    async fn count_matching(&self, iban: &str, amount: Decimal, window: TimeDelta) -> Result<u64>;

    /// Payments to `iban` of any amount within the trailing `window`.
    async fn count_by_iban(&self, iban: &str, window: TimeDelta) -> Result<u64>;

    /// Makes an assessed payment visible to later counts before `assess`
    /// returns. Stores that also receive the audit record must treat both
    /// writes for one `transaction_id` as a single payment.
    async fn remember(&self, _verdict: &Verdict, _request: &PaymentAssessmentRequest) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Destination for final verdicts. The engine ignores the result.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, verdict: &Verdict, request: &PaymentAssessmentRequest) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type RiskClassifierRef = Arc<dyn RiskClassifier>;
pub type PaymentHistoryRef = Arc<dyn PaymentHistory>;
pub type AuditSinkRef = Arc<dyn AuditSink>;
pub type ClockRef = Arc<dyn Clock>;
