//! Adapters for the domain ports.

pub mod clock;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::request::PaymentAssessmentRequest;
use crate::domain::verdict::{Decision, Verdict};
use crate::error::{EngineError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One assessed payment as kept by the history stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Identity of the payment; the remembered and audited copies share it.
    pub transaction_id: Uuid,
    pub invoice_id: String,
    /// Normalized IBAN.
    pub iban: String,
    pub amount: Decimal,
    pub decision: Option<Decision>,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn from_verdict(verdict: &Verdict, request: &PaymentAssessmentRequest) -> Self {
        Self {
            transaction_id: verdict.transaction_id(),
            invoice_id: verdict.invoice_id().to_string(),
            iban: crate::domain::iban::normalize(request.supplier_iban()),
            amount: request.amount().value(),
            decision: Some(verdict.decision()),
            recorded_at: verdict.timestamp(),
        }
    }
}

/// Exclusive start of the trailing `window` ending at `now`.
pub(crate) fn window_start(now: DateTime<Utc>, window: TimeDelta) -> Result<DateTime<Utc>> {
    now.checked_sub_signed(window).ok_or_else(|| {
        EngineError::HistoryError(format!("window of {window} reaches before the supported calendar"))
    })
}
