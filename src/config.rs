use crate::domain::verdict::RiskLevel;
use crate::error::{EngineError, Result};
use chrono::TimeDelta;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Static engine configuration, read once at process start.
///
/// Every section has defaults, so a TOML file only needs to list the values
/// it overrides.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: AmountThresholds,
    pub history: HistoryWindows,
    pub off_hours: OffHours,
    pub currency_allow_list: Vec<String>,
    pub generic_name_keywords: Vec<String>,
    pub min_supplier_name_len: usize,
    pub invoice_reference_keywords: Vec<String>,
    pub unknown_classification_risk: UnknownRiskPolicy,
    pub max_response_time_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AmountThresholds {
    /// Amounts strictly below this are flagged as test payments.
    pub low_amount: Decimal,
    /// Amounts strictly above this are flagged as unusually high.
    pub high_amount: Decimal,
    /// An ALLOW above this amount is downgraded to REVIEW.
    pub auto_approve_limit: Decimal,
    /// Anything above this amount is reviewed regardless of classification.
    pub review_amount: Decimal,
    /// Fractional part treated as a pricing trick, e.g. `0.99`.
    pub suspicious_suffix: Decimal,
}

/// Longest accepted duplicate window: one leap year.
pub const MAX_DUPLICATE_WINDOW_HOURS: i64 = 366 * 24;
/// Longest accepted velocity window: 31 days.
pub const MAX_VELOCITY_WINDOW_MINUTES: i64 = 31 * 24 * 60;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HistoryWindows {
    pub duplicate_window_hours: i64,
    pub velocity_window_minutes: i64,
    /// Largest number of payments (including the one being assessed) allowed
    /// inside the velocity window.
    pub velocity_max_payments: u64,
}

/// Hours on the engine clock (UTC) considered outside business hours.
/// `start_hour` is inclusive and `end_hour` exclusive; the window may wrap
/// midnight.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OffHours {
    pub enabled: bool,
    pub start_hour: u32,
    pub end_hour: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownRiskPolicy {
    Medium,
    #[default]
    High,
}

impl UnknownRiskPolicy {
    pub fn risk_level(&self) -> RiskLevel {
        match self {
            UnknownRiskPolicy::Medium => RiskLevel::Medium,
            UnknownRiskPolicy::High => RiskLevel::High,
        }
    }
}

impl Default for AmountThresholds {
    fn default() -> Self {
        Self {
            low_amount: dec!(1),
            high_amount: dec!(100000),
            auto_approve_limit: dec!(10000),
            review_amount: dec!(50000),
            suspicious_suffix: dec!(0.99),
        }
    }
}

impl Default for HistoryWindows {
    fn default() -> Self {
        Self {
            duplicate_window_hours: 24,
            velocity_window_minutes: 60,
            velocity_max_payments: 3,
        }
    }
}

impl Default for OffHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 23,
            end_hour: 6,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: AmountThresholds::default(),
            history: HistoryWindows::default(),
            off_hours: OffHours::default(),
            currency_allow_list: ["EUR", "USD", "BGN"].map(String::from).to_vec(),
            generic_name_keywords: ["test", "demo", "example", "fake"]
                .map(String::from)
                .to_vec(),
            min_supplier_name_len: 3,
            invoice_reference_keywords: ["test", "dummy"].map(String::from).to_vec(),
            unknown_classification_risk: UnknownRiskPolicy::default(),
            max_response_time_ms: 200,
        }
    }
}

impl HistoryWindows {
    pub fn duplicate_window(&self) -> Result<TimeDelta> {
        TimeDelta::try_hours(self.duplicate_window_hours).ok_or_else(|| {
            EngineError::ConfigError(format!(
                "history.duplicate_window_hours {} is out of range",
                self.duplicate_window_hours
            ))
        })
    }

    pub fn velocity_window(&self) -> Result<TimeDelta> {
        TimeDelta::try_minutes(self.velocity_window_minutes).ok_or_else(|| {
            EngineError::ConfigError(format!(
                "history.velocity_window_minutes {} is out of range",
                self.velocity_window_minutes
            ))
        })
    }
}

impl OffHours {
    pub fn contains(&self, hour: u32) -> bool {
        if !self.enabled || self.start_hour == self.end_hour {
            return false;
        }
        if self.start_hour < self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl EngineConfig {
    /// Loads a TOML file and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| EngineError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if t.low_amount < Decimal::ZERO {
            return Err(EngineError::ConfigError(
                "thresholds.low_amount must not be negative".to_string(),
            ));
        }
        if t.auto_approve_limit > t.review_amount {
            return Err(EngineError::ConfigError(
                "thresholds.auto_approve_limit must not exceed thresholds.review_amount".to_string(),
            ));
        }
        if t.suspicious_suffix < Decimal::ZERO || t.suspicious_suffix >= Decimal::ONE {
            return Err(EngineError::ConfigError(
                "thresholds.suspicious_suffix must be a fraction in [0, 1)".to_string(),
            ));
        }
        let h = &self.history;
        if h.duplicate_window_hours <= 0 || h.velocity_window_minutes <= 0 {
            return Err(EngineError::ConfigError(
                "history windows must be positive".to_string(),
            ));
        }
        if h.duplicate_window_hours > MAX_DUPLICATE_WINDOW_HOURS {
            return Err(EngineError::ConfigError(format!(
                "history.duplicate_window_hours must be at most {MAX_DUPLICATE_WINDOW_HOURS}"
            )));
        }
        if h.velocity_window_minutes > MAX_VELOCITY_WINDOW_MINUTES {
            return Err(EngineError::ConfigError(format!(
                "history.velocity_window_minutes must be at most {MAX_VELOCITY_WINDOW_MINUTES}"
            )));
        }
        if self.off_hours.start_hour > 23 || self.off_hours.end_hour > 23 {
            return Err(EngineError::ConfigError(
                "off_hours bounds must be hours in 0..=23".to_string(),
            ));
        }
        if self.currency_allow_list.is_empty() {
            return Err(EngineError::ConfigError(
                "currency_allow_list must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
