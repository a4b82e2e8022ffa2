use crate::error::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MAX_INVOICE_ID_LEN: usize = 50;
pub const MAX_SUPPLIER_NAME_LEN: usize = 100;

/// A strictly positive payment amount.
///
/// Wraps `rust_decimal::Decimal` so a non-positive amount can never reach the
/// engine: construction and deserialization both go through [`Amount::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0.normalize(), f)
    }
}

/// A proposed supplier payment submitted for a fraud verdict.
///
/// Created once per assessment and never mutated: fields are private and the
/// optional attributes are attached through consuming `with_*` calls before
/// the request is handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAssessmentRequest {
    invoice_id: String,
    supplier_iban: String,
    amount: Amount,
    supplier_name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    currency: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    supplier_country: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    payment_purpose: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    previous_invoice_id: Option<String>,
}

// CSV sources leave optional columns blank rather than omitting them.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl PaymentAssessmentRequest {
    pub fn new(
        invoice_id: impl Into<String>,
        supplier_iban: impl Into<String>,
        amount: Amount,
        supplier_name: impl Into<String>,
    ) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            supplier_iban: supplier_iban.into(),
            amount,
            supplier_name: supplier_name.into(),
            currency: None,
            supplier_country: None,
            payment_purpose: None,
            previous_invoice_id: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_supplier_country(mut self, country: impl Into<String>) -> Self {
        self.supplier_country = Some(country.into());
        self
    }

    pub fn with_payment_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.payment_purpose = Some(purpose.into());
        self
    }

    pub fn with_previous_invoice_id(mut self, invoice_id: impl Into<String>) -> Self {
        self.previous_invoice_id = Some(invoice_id.into());
        self
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn supplier_iban(&self) -> &str {
        &self.supplier_iban
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn supplier_name(&self) -> &str {
        &self.supplier_name
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn supplier_country(&self) -> Option<&str> {
        self.supplier_country.as_deref()
    }

    pub fn payment_purpose(&self) -> Option<&str> {
        self.payment_purpose.as_deref()
    }

    pub fn previous_invoice_id(&self) -> Option<&str> {
        self.previous_invoice_id.as_deref()
    }

    /// Checks the request shape before it is submitted for assessment.
    ///
    /// This is the caller's gate for malformed input; the engine itself never
    /// rejects a request and always answers with a verdict.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.invoice_id.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "Invoice ID is required".to_string(),
            ));
        }
        if self.invoice_id.chars().count() > MAX_INVOICE_ID_LEN {
            return Err(EngineError::ValidationError(format!(
                "Invoice ID must not exceed {MAX_INVOICE_ID_LEN} characters"
            )));
        }
        if self.supplier_iban.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "Supplier IBAN is required".to_string(),
            ));
        }
        if self.supplier_name.trim().is_empty() {
            return Err(EngineError::ValidationError(
                "Supplier name is required".to_string(),
            ));
        }
        if self.supplier_name.chars().count() > MAX_SUPPLIER_NAME_LEN {
            return Err(EngineError::ValidationError(format!(
                "Supplier name must not exceed {MAX_SUPPLIER_NAME_LEN} characters"
            )));
        }
        Ok(())
    }
}
