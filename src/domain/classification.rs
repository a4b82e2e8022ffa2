use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Externally supplied risk label for an IBAN.
///
/// `Unknown` stands for both "not found" and "lookup failed"; callers cannot
/// tell the two apart and neither is ever treated as safe.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Good,
    Review,
    Block,
    #[default]
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Good => "GOOD",
            Classification::Review => "REVIEW",
            Classification::Block => "BLOCK",
            Classification::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for Classification {
    type Err = std::convert::Infallible;

    /// Unrecognised labels map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "GOOD" => Classification::Good,
            "REVIEW" => Classification::Review,
            "BLOCK" => Classification::Block,
            _ => Classification::Unknown,
        })
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!("GOOD".parse::<Classification>().unwrap(), Classification::Good);
        assert_eq!(" review ".parse::<Classification>().unwrap(), Classification::Review);
        assert_eq!("Block".parse::<Classification>().unwrap(), Classification::Block);
        assert_eq!("HIGH".parse::<Classification>().unwrap(), Classification::Unknown);
    }
}
