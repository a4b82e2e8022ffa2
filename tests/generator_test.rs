use iban_guard::domain::iban;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;

mod common;

#[test]
fn test_check_digits_match_known_iban() {
    assert_eq!(common::check_digits("DE", "370400440532013000"), 89);
}

#[test]
fn test_random_ibans_are_valid() {
    let mut rng = StdRng::seed_from_u64(7);
    let ibans: HashSet<String> = (0..500).map(|_| common::random_iban(&mut rng)).collect();

    assert!(ibans.len() > 490, "Generator should rarely repeat itself");
    for candidate in &ibans {
        assert!(iban::validate(candidate), "{candidate} should validate");
    }
}

#[test]
fn test_generate_simple_csv() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("generated.csv");
    common::generate_csv(&output_path, 5).expect("Failed to generate CSV");

    let content = std::fs::read_to_string(&output_path).expect("Failed to read file");
    // Header + 5 rows = 6 lines
    assert_eq!(content.lines().count(), 6);
}
