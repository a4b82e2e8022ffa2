use super::{PaymentRecord, window_start};
use super::clock::SystemClock;
use crate::domain::classification::Classification;
use crate::domain::iban;
use crate::domain::ports::{AuditSink, ClockRef, PaymentHistory, RiskClassifier};
use crate::domain::request::PaymentAssessmentRequest;
use crate::domain::verdict::Verdict;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::TimeDelta;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;

/// Column Family for IBAN risk classifications.
pub const CF_CLASSIFICATIONS: &str = "classifications";
/// Column Family for assessed payments.
pub const CF_PAYMENTS: &str = "payments";

const KEY_SEPARATOR: u8 = b'/';

/// A persistent store implementation using RocksDB.
///
/// Serves as risk classifier, payment history and audit sink at once, so
/// duplicate and velocity checks see payments assessed by earlier runs.
/// Payment keys are `<iban>/<time key>/<transaction id>`, which keeps one
/// IBAN's payments contiguous and in time order. Writing the same verdict
/// twice overwrites one key.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbPaymentLog {
    db: Arc<DB>,
    clock: ClockRef,
}

impl RocksDbPaymentLog {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("classifications" and
    /// "payments") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock<P: AsRef<Path>>(path: P, clock: ClockRef) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_classifications = ColumnFamilyDescriptor::new(CF_CLASSIFICATIONS, Options::default());
        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_classifications, cf_payments])?;

        Ok(Self {
            db: Arc::new(db),
            clock,
        })
    }

    /// Stores or replaces the classification for an IBAN.
    pub fn insert_classification(&self, iban: &str, classification: Classification) -> Result<()> {
        let cf = self.cf(CF_CLASSIFICATIONS)?;
        let value = serde_json::to_vec(&classification).map_err(serialization_error)?;
        self.db.put_cf(&cf, iban::normalize(iban), value)?;
        Ok(())
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            EngineError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put_payment(&self, record: &PaymentRecord) -> Result<()> {
        let cf = self.cf(CF_PAYMENTS)?;
        let mut key = iban_prefix(&record.iban);
        key.extend_from_slice(&time_key(record.recorded_at.timestamp_millis()));
        key.push(KEY_SEPARATOR);
        key.extend_from_slice(record.transaction_id.as_bytes());

        let value = serde_json::to_vec(record).map_err(serialization_error)?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    /// Counts payments for `iban` recorded inside `window` that satisfy
    /// `predicate`. Only keys from the window start onward are read.
    fn count_recent<F>(&self, iban: &str, window: TimeDelta, predicate: F) -> Result<u64>
    where
        F: Fn(&PaymentRecord) -> bool,
    {
        let cf = self.cf(CF_PAYMENTS)?;
        let cutoff = window_start(self.clock.now(), window)?;
        let prefix = iban_prefix(&iban::normalize(iban));
        let mut start = prefix.clone();
        start.extend_from_slice(&time_key(cutoff.timestamp_millis()));

        let mut count = 0;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(start.as_slice(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let record: PaymentRecord =
                serde_json::from_slice(&value).map_err(serialization_error)?;
            // Keys in the cutoff millisecond can still fall outside the window.
            if record.recorded_at > cutoff && predicate(&record) {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn iban_prefix(normalized: &str) -> Vec<u8> {
    let mut prefix = normalized.as_bytes().to_vec();
    prefix.push(KEY_SEPARATOR);
    prefix
}

/// Big-endian millis with the sign bit flipped, so byte order matches time
/// order across the epoch.
fn time_key(millis: i64) -> [u8; 8] {
    ((millis as u64) ^ (1 << 63)).to_be_bytes()
}

fn serialization_error(e: serde_json::Error) -> EngineError {
    EngineError::InternalError(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("Serialization error: {e}"),
    )))
}

#[async_trait]
impl RiskClassifier for RocksDbPaymentLog {
    async fn classify(&self, iban: &str) -> Result<Classification> {
        let cf = self.cf(CF_CLASSIFICATIONS)?;
        match self.db.get_cf(&cf, iban::normalize(iban))? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(serialization_error),
            None => Ok(Classification::Unknown),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.cf(CF_CLASSIFICATIONS).map(|_| ())
    }
}

#[async_trait]
impl PaymentHistory for RocksDbPaymentLog {
    async fn count_matching(&self, iban: &str, amount: Decimal, window: TimeDelta) -> Result<u64> {
        self.count_recent(iban, window, |r| r.amount == amount)
    }

    async fn count_by_iban(&self, iban: &str, window: TimeDelta) -> Result<u64> {
        self.count_recent(iban, window, |_| true)
    }

    async fn remember(&self, verdict: &Verdict, request: &PaymentAssessmentRequest) -> Result<()> {
        self.put_payment(&PaymentRecord::from_verdict(verdict, request))
    }

    async fn ping(&self) -> Result<()> {
        self.cf(CF_PAYMENTS).map(|_| ())
    }
}

#[async_trait]
impl AuditSink for RocksDbPaymentLog {
    async fn record(&self, verdict: &Verdict, request: &PaymentAssessmentRequest) -> Result<()> {
        self.put_payment(&PaymentRecord::from_verdict(verdict, request))
    }
}
