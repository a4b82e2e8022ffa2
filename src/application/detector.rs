//! Rule-table anomaly detection.
//!
//! The table is compiled once from [`EngineConfig`] when the engine is built
//! and is read-only afterwards. Rules run in table order and each contributes
//! at most one [`Anomaly`]; adding a rule means adding a [`Check`] variant and
//! a table entry, the synthesizer never changes.

use crate::config::{EngineConfig, OffHours};
use crate::domain::anomaly::{Anomaly, AnomalyKind};
use crate::domain::classification::Classification;
use crate::domain::ports::PaymentHistoryRef;
use crate::domain::request::PaymentAssessmentRequest;
use crate::error::{EngineError, Result};
use crate::metrics::{self, EngineMetrics};
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use tracing::warn;

/// Everything a rule may look at for one assessment.
pub struct Signals<'a> {
    pub request: &'a PaymentAssessmentRequest,
    /// Normalized IBAN used as the history key.
    pub iban: &'a str,
    pub classification: Classification,
    pub now: DateTime<Utc>,
}

enum Check {
    AmountBelow(Decimal),
    AmountAbove(Decimal),
    FractionEquals(Decimal),
    /// Round amounts are expected from suppliers classified GOOD, so the rule
    /// is skipped for them.
    MultipleOf(Decimal),
    GenericName {
        keywords: Option<Regex>,
        min_len: usize,
    },
    InvoiceReference(Option<Regex>),
    CurrencyOutside(HashSet<String>),
    DuplicateWithin(TimeDelta),
    VelocityWithin {
        window: TimeDelta,
        max_payments: u64,
    },
    OffHours(OffHours),
}

struct Rule {
    kind: AnomalyKind,
    check: Check,
}

pub struct AnomalyDetector {
    rules: Vec<Rule>,
    history: PaymentHistoryRef,
    metrics: EngineMetrics,
}

impl AnomalyDetector {
    pub fn new(
        config: &EngineConfig,
        history: PaymentHistoryRef,
        metrics: EngineMetrics,
    ) -> Result<Self> {
        let t = &config.thresholds;
        let rules = vec![
            Rule {
                kind: AnomalyKind::LowAmount,
                check: Check::AmountBelow(t.low_amount),
            },
            Rule {
                kind: AnomalyKind::HighAmount,
                check: Check::AmountAbove(t.high_amount),
            },
            Rule {
                kind: AnomalyKind::SuspiciousSuffix,
                check: Check::FractionEquals(t.suspicious_suffix),
            },
            Rule {
                kind: AnomalyKind::RoundThousand,
                check: Check::MultipleOf(dec!(1000)),
            },
            Rule {
                kind: AnomalyKind::RoundHundred,
                check: Check::MultipleOf(dec!(100)),
            },
            Rule {
                kind: AnomalyKind::GenericSupplierName,
                check: Check::GenericName {
                    keywords: keyword_pattern(&config.generic_name_keywords)?,
                    min_len: config.min_supplier_name_len,
                },
            },
            Rule {
                kind: AnomalyKind::SuspiciousInvoiceReference,
                check: Check::InvoiceReference(keyword_pattern(
                    &config.invoice_reference_keywords,
                )?),
            },
            Rule {
                kind: AnomalyKind::CurrencyOutlier,
                check: Check::CurrencyOutside(
                    config
                        .currency_allow_list
                        .iter()
                        .map(|c| c.trim().to_ascii_uppercase())
                        .collect(),
                ),
            },
            Rule {
                kind: AnomalyKind::DuplicatePayment,
                check: Check::DuplicateWithin(config.history.duplicate_window()?),
            },
            Rule {
                kind: AnomalyKind::Velocity,
                check: Check::VelocityWithin {
                    window: config.history.velocity_window()?,
                    max_payments: config.history.velocity_max_payments,
                },
            },
            Rule {
                kind: AnomalyKind::OffHours,
                check: Check::OffHours(config.off_hours.clone()),
            },
        ];

        Ok(Self {
            rules,
            history,
            metrics,
        })
    }

    /// Runs every rule in order and returns the anomalies found.
    ///
    /// History lookups that fail count as "nothing found" for that rule only.
    pub async fn detect(&self, signals: &Signals<'_>) -> Result<Vec<Anomaly>> {
        let mut anomalies = Vec::new();
        for rule in &self.rules {
            if let Some(description) = self.evaluate(&rule.check, signals).await? {
                anomalies.push(Anomaly::new(rule.kind, description));
            }
        }
        Ok(anomalies)
    }

    async fn evaluate(&self, check: &Check, signals: &Signals<'_>) -> Result<Option<String>> {
        let request = signals.request;
        let amount = request.amount().value();

        let found = match check {
            Check::AmountBelow(limit) => (amount < *limit)
                .then(|| format!("Suspiciously low payment amount: {}", request.amount())),
            Check::AmountAbove(limit) => (amount > *limit)
                .then(|| format!("Unusually high payment amount: {}", request.amount())),
            Check::FractionEquals(fraction) => (amount.fract() == *fraction)
                .then(|| format!("Amount ends in a pricing suffix: {}", request.amount())),
            Check::MultipleOf(divisor) => {
                if signals.classification == Classification::Good {
                    None
                } else {
                    let remainder = amount.checked_rem(*divisor).ok_or_else(|| {
                        EngineError::ArithmeticError(format!("{amount} mod {divisor}"))
                    })?;
                    remainder.is_zero().then(|| {
                        format!(
                            "Round amount (multiple of {}): {}",
                            divisor.normalize(),
                            request.amount()
                        )
                    })
                }
            }
            Check::GenericName { keywords, min_len } => {
                let name = request.supplier_name().trim();
                let generic = name.chars().count() < *min_len
                    || keywords.as_ref().is_some_and(|re| re.is_match(name));
                generic.then(|| format!("Generic or placeholder supplier name: {name}"))
            }
            Check::InvoiceReference(keywords) => keywords.as_ref().and_then(|re| {
                std::iter::once(request.invoice_id())
                    .chain(request.previous_invoice_id())
                    .find(|reference| re.is_match(reference))
                    .map(|reference| format!("Suspicious invoice reference: {reference}"))
            }),
            Check::CurrencyOutside(allowed) => request
                .currency()
                .filter(|c| !allowed.contains(&c.trim().to_ascii_uppercase()))
                .map(|c| format!("Unusual currency for supplier payment: {c}")),
            Check::DuplicateWithin(window) => {
                let count = match self
                    .history
                    .count_matching(signals.iban, amount, *window)
                    .await
                {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(error = %e, rule = "duplicate-payment", "payment history unavailable, rule skipped");
                        self.metrics.record_collaborator_failure(metrics::HISTORY);
                        0
                    }
                };
                (count > 0).then(|| {
                    format!(
                        "Potential duplicate payment: {count} matching payment(s) in the last {}h",
                        window.num_hours()
                    )
                })
            }
            Check::VelocityWithin {
                window,
                max_payments,
            } => {
                let prior = match self.history.count_by_iban(signals.iban, *window).await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(error = %e, rule = "velocity", "payment history unavailable, rule skipped");
                        self.metrics.record_collaborator_failure(metrics::HISTORY);
                        0
                    }
                };
                // The payment under assessment counts towards the window.
                let total = prior.saturating_add(1);
                (total > *max_payments).then(|| {
                    format!(
                        "High-frequency payment pattern: {total} payments in the last {} minutes",
                        window.num_minutes()
                    )
                })
            }
            Check::OffHours(window) => {
                let hour = signals.now.hour();
                window
                    .contains(hour)
                    .then(|| format!("Payment assessed outside business hours ({hour:02}:00 UTC)"))
            }
        };

        Ok(found)
    }
}

/// Compiles a keyword list into one case-insensitive alternation.
fn keyword_pattern(keywords: &[String]) -> Result<Option<Regex>> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| EngineError::ConfigError(format!("invalid keyword pattern: {e}")))
}
