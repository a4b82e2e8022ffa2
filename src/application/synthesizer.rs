use crate::config::{AmountThresholds, EngineConfig};
use crate::domain::anomaly::Anomaly;
use crate::domain::classification::Classification;
use crate::domain::request::Amount;
use crate::domain::verdict::{Decision, RiskLevel};
use rust_decimal::Decimal;

/// Running decision while the precedence rules are applied.
///
/// Both the decision and the risk level can only move towards stricter
/// values; the reason follows whichever step last tightened either of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruling {
    pub decision: Decision,
    pub risk_level: RiskLevel,
    pub reason: String,
}

impl Ruling {
    fn new(decision: Decision, risk_level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            decision,
            risk_level,
            reason: reason.into(),
        }
    }

    pub fn escalate(&mut self, decision: Decision, risk_level: RiskLevel, reason: impl Into<String>) {
        if decision > self.decision || risk_level > self.risk_level {
            self.reason = reason.into();
        }
        self.decision = self.decision.max(decision);
        self.risk_level = self.risk_level.max(risk_level);
    }
}

/// Combines classification, amount policy and anomalies into a [`Ruling`].
pub struct DecisionSynthesizer {
    thresholds: AmountThresholds,
    unknown_risk: RiskLevel,
}

impl DecisionSynthesizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            unknown_risk: config.unknown_classification_risk.risk_level(),
        }
    }

    /// A malformed IBAN overrides every other signal.
    pub fn invalid_iban() -> Ruling {
        Ruling::new(Decision::Block, RiskLevel::Critical, "invalid IBAN format")
    }

    pub fn synthesize(
        &self,
        classification: Classification,
        amount: Amount,
        anomalies: &[Anomaly],
    ) -> Ruling {
        let mut ruling = self.base_ruling(classification);
        self.apply_amount_policy(&mut ruling, amount.value());
        Self::apply_anomalies(&mut ruling, anomalies);
        ruling
    }

    fn base_ruling(&self, classification: Classification) -> Ruling {
        match classification {
            Classification::Block => Ruling::new(
                Decision::Block,
                RiskLevel::Critical,
                "IBAN is flagged as blocked",
            ),
            Classification::Review => Ruling::new(
                Decision::Review,
                RiskLevel::High,
                "IBAN requires manual review",
            ),
            Classification::Unknown => Ruling::new(
                Decision::Review,
                self.unknown_risk,
                "IBAN has no usable risk classification",
            ),
            Classification::Good => {
                Ruling::new(Decision::Allow, RiskLevel::Low, "IBAN verified as good")
            }
        }
    }

    fn apply_amount_policy(&self, ruling: &mut Ruling, amount: Decimal) {
        if amount > self.thresholds.review_amount {
            ruling.escalate(
                Decision::Review,
                RiskLevel::High,
                format!(
                    "amount exceeds mandatory review threshold of {}",
                    self.thresholds.review_amount.normalize()
                ),
            );
        } else if amount > self.thresholds.auto_approve_limit && ruling.decision == Decision::Allow {
            ruling.escalate(
                Decision::Review,
                RiskLevel::Medium,
                format!(
                    "amount exceeds auto-approval limit of {}",
                    self.thresholds.auto_approve_limit.normalize()
                ),
            );
        }
    }

    fn apply_anomalies(ruling: &mut Ruling, anomalies: &[Anomaly]) {
        let (decision, risk_level) = match anomalies.len() {
            0 => return,
            1 => (Decision::Review, RiskLevel::Medium),
            2 => (Decision::Review, RiskLevel::High),
            _ => (Decision::Review, RiskLevel::Critical),
        };
        let reason = match anomalies {
            [only] => format!("anomaly detected: {}", only.description),
            _ => format!("{} anomalies detected", anomalies.len()),
        };
        ruling.escalate(decision, risk_level, reason);
    }
}
