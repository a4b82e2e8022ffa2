use crate::domain::classification::Classification;
use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct ClassificationRow {
    iban: String,
    classification: String,
}

/// Reads `iban, classification` rows used to seed a risk registry.
///
/// Labels other than GOOD, REVIEW and BLOCK load as `Unknown`.
pub struct ClassificationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ClassificationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn entries(self) -> impl Iterator<Item = Result<(String, Classification)>> {
        self.reader
            .into_deserialize::<ClassificationRow>()
            .map(|result| {
                let row = result.map_err(EngineError::from)?;
                let classification = row
                    .classification
                    .parse()
                    .unwrap_or(Classification::Unknown);
                Ok((row.iban, classification))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_labels() {
        let data = "\
iban, classification
DE89370400440532013000, GOOD
GB82WEST12345698765432, block
FR1420041010050500013M02606, whatever";
        let entries: Vec<(String, Classification)> = ClassificationReader::new(data.as_bytes())
            .entries()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            entries,
            vec![
                ("DE89370400440532013000".to_string(), Classification::Good),
                ("GB82WEST12345698765432".to_string(), Classification::Block),
                ("FR1420041010050500013M02606".to_string(), Classification::Unknown),
            ]
        );
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let data = "iban\nDE89370400440532013000";
        let mut entries = ClassificationReader::new(data.as_bytes()).entries();
        assert!(entries.next().unwrap().is_err());
    }
}
