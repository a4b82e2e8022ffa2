use crate::domain::request::PaymentAssessmentRequest;
use crate::error::{EngineError, Result};
use std::io::Read;

/// Reads payment assessment requests from a CSV source.
///
/// Expected header: `invoice_id, supplier_iban, amount, supplier_name`,
/// optionally followed by `currency, supplier_country, payment_purpose,
/// previous_invoice_id`. Optional columns may be missing or blank.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    ///
    /// A malformed row yields an `Err` for that row only; reading continues
    /// with the next one.
    pub fn requests(self) -> impl Iterator<Item = Result<PaymentAssessmentRequest>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "\
invoice_id, supplier_iban, amount, supplier_name, currency, previous_invoice_id
INV-1, DE89370400440532013000, 500.00, Acme Industrial GmbH, EUR,
INV-2, GB82WEST12345698765432, 12.5, Widget Ltd, , INV-1";
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentAssessmentRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.invoice_id(), "INV-1");
        assert_eq!(first.amount().value(), dec!(500.00));
        assert_eq!(first.currency(), Some("EUR"));
        assert_eq!(first.previous_invoice_id(), None);

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.currency(), None);
        assert_eq!(second.previous_invoice_id(), Some("INV-1"));
    }

    #[test]
    fn test_reader_minimal_columns() {
        let data = "invoice_id,supplier_iban,amount,supplier_name\nINV-1,DE89370400440532013000,1,Acme";
        let results: Vec<_> = RequestReader::new(data.as_bytes()).requests().collect();
        assert!(results[0].is_ok());
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "\
invoice_id, supplier_iban, amount, supplier_name
INV-1, DE89370400440532013000, not_a_number, Acme
INV-2, DE89370400440532013000, -5, Acme
INV-3, DE89370400440532013000, 5, Acme";
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentAssessmentRequest>> = reader.requests().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
