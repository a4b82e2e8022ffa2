use crate::domain::verdict::Verdict;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct VerdictRow<'a> {
    invoice_id: &'a str,
    decision: &'static str,
    risk_level: &'static str,
    reason: &'a str,
    anomalies: String,
    recommendation: &'a str,
    requires_manual_review: bool,
    transaction_id: String,
    response_time_ms: u64,
    within_budget: bool,
    timestamp: String,
}

/// Writes one CSV row per verdict, header included.
pub struct VerdictWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> VerdictWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// `within_budget` is supplied by the engine that produced the verdict.
    pub fn write_verdict(&mut self, verdict: &Verdict, within_budget: bool) -> Result<()> {
        let anomalies = verdict
            .anomalies()
            .iter()
            .map(|a| a.description.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        self.writer.serialize(VerdictRow {
            invoice_id: verdict.invoice_id(),
            decision: verdict.decision().as_str(),
            risk_level: verdict.risk_level().as_str(),
            reason: verdict.reason(),
            anomalies,
            recommendation: verdict.recommendation(),
            requires_manual_review: verdict.requires_manual_review(),
            transaction_id: verdict.transaction_id().to_string(),
            response_time_ms: verdict.response_time_ms(),
            within_budget,
            timestamp: verdict.timestamp().to_rfc3339(),
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
