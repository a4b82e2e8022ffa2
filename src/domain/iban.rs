//! ISO 13616 IBAN structural and checksum validation.

use regex::Regex;
use std::sync::LazyLock;

pub const MIN_LENGTH: usize = 15;
pub const MAX_LENGTH: usize = 34;

static IBAN_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]+$").expect("IBAN pattern is a valid regex")
});

/// Strips all whitespace and uppercases the input.
///
/// Classification and history lookups are keyed by the normalized form, so
/// `"de89 3704 0044 0532 0130 00"` and `"DE89370400440532013000"` refer to
/// the same account.
pub fn normalize(iban: &str) -> String {
    iban.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Returns `true` if `iban` is well formed and its mod-97 checksum equals 1.
///
/// The rearranged numeric string is folded one digit at a time so no
/// big-integer arithmetic is needed.
pub fn validate(iban: &str) -> bool {
    let iban = normalize(iban);

    if !(MIN_LENGTH..=MAX_LENGTH).contains(&iban.len()) || !IBAN_SHAPE.is_match(&iban) {
        return false;
    }

    let (head, tail) = iban.split_at(4);
    let remainder = tail
        .chars()
        .chain(head.chars())
        .filter_map(|c| c.to_digit(36))
        .fold(0u32, |acc, value| {
            // Letters expand to two decimal digits (A=10 .. Z=35).
            if value >= 10 {
                (acc * 100 + value) % 97
            } else {
                (acc * 10 + value) % 97
            }
        });

    remainder == 1
}
