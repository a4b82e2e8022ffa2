use super::{PaymentRecord, window_start};
use super::clock::SystemClock;
use crate::domain::classification::Classification;
use crate::domain::iban;
use crate::domain::ports::{AuditSink, ClockRef, PaymentHistory, RiskClassifier};
use crate::domain::request::PaymentAssessmentRequest;
use crate::domain::verdict::Verdict;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory IBAN classification table.
///
/// Keys are normalized IBANs; anything not in the table classifies as
/// `Unknown`. Cloning shares the underlying map.
#[derive(Default, Clone)]
pub struct InMemoryRiskRegistry {
    entries: Arc<RwLock<HashMap<String, Classification>>>,
}

impl InMemoryRiskRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, iban: &str, classification: Classification) {
        let mut entries = self.entries.write().await;
        entries.insert(iban::normalize(iban), classification);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RiskClassifier for InMemoryRiskRegistry {
    async fn classify(&self, iban: &str) -> Result<Classification> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&iban::normalize(iban))
            .copied()
            .unwrap_or(Classification::Unknown))
    }
}

/// A thread-safe in-memory log of assessed payments.
///
/// Serves as both the audit sink and the payment history, so every verdict
/// the engine emits becomes input to later duplicate and velocity checks.
/// The remembered and audited copies of one verdict collapse into a single
/// record keyed by transaction id. Windows are measured against the log's
/// own clock.
#[derive(Clone)]
pub struct InMemoryPaymentLog {
    records: Arc<RwLock<Vec<PaymentRecord>>>,
    clock: ClockRef,
}

impl Default for InMemoryPaymentLog {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemoryPaymentLog {
    /// Creates a new, empty log on the system clock.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: ClockRef) -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            clock,
        }
    }

    /// Adds a payment directly, bypassing the engine. Used to seed history.
    pub async fn record_payment(
        &self,
        invoice_id: &str,
        iban: &str,
        amount: Decimal,
        at: DateTime<Utc>,
    ) {
        self.upsert(PaymentRecord {
            transaction_id: Uuid::new_v4(),
            invoice_id: invoice_id.to_string(),
            iban: iban::normalize(iban),
            amount,
            decision: None,
            recorded_at: at,
        })
        .await;
    }

    pub async fn records(&self) -> Vec<PaymentRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn upsert(&self, record: PaymentRecord) {
        let mut records = self.records.write().await;
        match records
            .iter_mut()
            .rev()
            .find(|r| r.transaction_id == record.transaction_id)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    async fn count_where<F>(&self, window: TimeDelta, predicate: F) -> Result<u64>
    where
        F: Fn(&PaymentRecord) -> bool + Send,
    {
        let cutoff = window_start(self.clock.now(), window)?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.recorded_at > cutoff && predicate(r))
            .count() as u64)
    }
}

#[async_trait]
impl PaymentHistory for InMemoryPaymentLog {
    async fn count_matching(&self, iban: &str, amount: Decimal, window: TimeDelta) -> Result<u64> {
        let iban = iban::normalize(iban);
        self.count_where(window, |r| r.iban == iban && r.amount == amount)
            .await
    }

    async fn count_by_iban(&self, iban: &str, window: TimeDelta) -> Result<u64> {
        let iban = iban::normalize(iban);
        self.count_where(window, |r| r.iban == iban).await
    }

    async fn remember(&self, verdict: &Verdict, request: &PaymentAssessmentRequest) -> Result<()> {
        self.upsert(PaymentRecord::from_verdict(verdict, request)).await;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for InMemoryPaymentLog {
    async fn record(&self, verdict: &Verdict, request: &PaymentAssessmentRequest) -> Result<()> {
        self.upsert(PaymentRecord::from_verdict(verdict, request)).await;
        Ok(())
    }
}
