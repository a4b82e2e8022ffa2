use super::anomaly::Anomaly;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final disposition of a payment. Ordered from most to least permissive so
/// that `max` yields the stricter of two decisions.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Allow,
    Review,
    Block,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Review => "REVIEW",
            Decision::Block => "BLOCK",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Decision::Allow => "process immediately",
            Decision::Review => "manual review recommended",
            Decision::Block => "block — high fraud risk",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's answer for one payment.
///
/// Built once by [`Verdict::new`], which derives the recommendation and the
/// manual-review flag from the decision and refuses combinations that break
/// the `Block => Critical` invariant. There are no setters.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    invoice_id: String,
    decision: Decision,
    risk_level: RiskLevel,
    reason: String,
    anomalies: Vec<Anomaly>,
    recommendation: String,
    requires_manual_review: bool,
    transaction_id: Uuid,
    response_time_ms: u64,
    timestamp: DateTime<Utc>,
}

impl Verdict {
    pub fn new(
        invoice_id: impl Into<String>,
        decision: Decision,
        risk_level: RiskLevel,
        reason: impl Into<String>,
        anomalies: Vec<Anomaly>,
        response_time_ms: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        if decision == Decision::Block && risk_level != RiskLevel::Critical {
            return Err(EngineError::InvariantViolation(format!(
                "BLOCK decision requires CRITICAL risk, got {risk_level}"
            )));
        }

        Ok(Self {
            invoice_id: invoice_id.into(),
            decision,
            risk_level,
            reason: reason.into(),
            anomalies,
            recommendation: decision.recommendation().to_string(),
            requires_manual_review: decision != Decision::Allow,
            transaction_id: Uuid::new_v4(),
            response_time_ms,
            timestamp,
        })
    }

    /// Verdict for an assessment that could not be completed: REVIEW at
    /// CRITICAL risk, carrying the fault as its only anomaly.
    pub fn fail_safe(
        invoice_id: impl Into<String>,
        reason: impl Into<String>,
        fault: Anomaly,
        response_time_ms: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let decision = Decision::Review;
        Self {
            invoice_id: invoice_id.into(),
            decision,
            risk_level: RiskLevel::Critical,
            reason: reason.into(),
            anomalies: vec![fault],
            recommendation: decision.recommendation().to_string(),
            requires_manual_review: true,
            transaction_id: Uuid::new_v4(),
            response_time_ms,
            timestamp,
        }
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    pub fn requires_manual_review(&self) -> bool {
        self.requires_manual_review
    }

    pub fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    pub fn response_time_ms(&self) -> u64 {
        self.response_time_ms
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn has_anomaly(&self, kind: super::anomaly::AnomalyKind) -> bool {
        self.anomalies.iter().any(|a| a.kind == kind)
    }
}
