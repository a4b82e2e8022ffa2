use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    InvalidIban,
    LowAmount,
    HighAmount,
    SuspiciousSuffix,
    RoundThousand,
    RoundHundred,
    #[serde(rename = "generic-name")]
    GenericSupplierName,
    SuspiciousInvoiceReference,
    CurrencyOutlier,
    DuplicatePayment,
    Velocity,
    OffHours,
    AnalysisError,
}

impl AnomalyKind {
    /// Stable label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::InvalidIban => "invalid-iban",
            AnomalyKind::LowAmount => "low-amount",
            AnomalyKind::HighAmount => "high-amount",
            AnomalyKind::SuspiciousSuffix => "suspicious-suffix",
            AnomalyKind::RoundThousand => "round-thousand",
            AnomalyKind::RoundHundred => "round-hundred",
            AnomalyKind::GenericSupplierName => "generic-name",
            AnomalyKind::SuspiciousInvoiceReference => "suspicious-invoice-reference",
            AnomalyKind::CurrencyOutlier => "currency-outlier",
            AnomalyKind::DuplicatePayment => "duplicate-payment",
            AnomalyKind::Velocity => "velocity",
            AnomalyKind::OffHours => "off-hours",
            AnomalyKind::AnalysisError => "analysis-error",
        }
    }
}

/// A single suspicious signal attached to one assessment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub description: String,
}

impl Anomaly {
    pub fn new(kind: AnomalyKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn invalid_iban() -> Self {
        Self::new(AnomalyKind::InvalidIban, "invalid IBAN format or checksum")
    }

    pub fn analysis_error(fault: impl std::fmt::Display) -> Self {
        Self::new(AnomalyKind::AnalysisError, format!("Analysis error: {fault}"))
    }
}
