use iban_guard::application::engine::AssessmentEngine;
use iban_guard::config::EngineConfig;
use iban_guard::domain::anomaly::AnomalyKind;
use iban_guard::domain::classification::Classification;
use iban_guard::domain::verdict::{Decision, RiskLevel};
use iban_guard::infrastructure::clock::FixedClock;
use iban_guard::infrastructure::in_memory::{InMemoryPaymentLog, InMemoryRiskRegistry};
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

mod common;
use common::{BLOCK_IBAN, GOOD_IBAN, REVIEW_IBAN, UNLISTED_IBAN, request};

#[tokio::test]
async fn test_good_iban_small_amount_is_allowed() {
    let (engine, _) = common::engine().await;
    let verdict = engine
        .assess(&request("INV-2025-001", GOOD_IBAN, dec!(500)))
        .await;

    assert_eq!(verdict.decision(), Decision::Allow);
    assert_eq!(verdict.risk_level(), RiskLevel::Low);
    assert!(verdict.anomalies().is_empty());
    assert!(!verdict.requires_manual_review());
    assert_eq!(verdict.recommendation(), "process immediately");
    assert_eq!(verdict.invoice_id(), "INV-2025-001");
}

#[tokio::test]
async fn test_malformed_iban_is_blocked() {
    let (engine, _) = common::engine().await;
    let verdict = engine
        .assess(&request("INV-2025-002", "XX00INVALID1234567", dec!(500)))
        .await;

    assert_eq!(verdict.decision(), Decision::Block);
    assert_eq!(verdict.risk_level(), RiskLevel::Critical);
    assert_eq!(verdict.anomalies().len(), 1);
    assert_eq!(verdict.anomalies()[0].kind, AnomalyKind::InvalidIban);
    assert_eq!(
        verdict.anomalies()[0].description,
        "invalid IBAN format or checksum"
    );
    assert_eq!(verdict.recommendation(), "block — high fraud risk");
}

#[tokio::test]
async fn test_checksum_mismatch_is_blocked() {
    let (engine, _) = common::engine().await;
    let verdict = engine
        .assess(&request("INV-2025-003", "DE88370400440532013000", dec!(500)))
        .await;
    assert_eq!(verdict.decision(), Decision::Block);
}

#[tokio::test]
async fn test_review_classification_requires_manual_review() {
    let (engine, _) = common::engine().await;
    let verdict = engine
        .assess(&request("INV-2025-004", REVIEW_IBAN, dec!(200)))
        .await;

    assert_eq!(verdict.decision(), Decision::Review);
    assert!(verdict.requires_manual_review());
    assert_eq!(verdict.reason(), "IBAN requires manual review");
}

#[tokio::test]
async fn test_large_amount_is_reviewed_even_when_good() {
    let (engine, _) = common::engine().await;
    let verdict = engine
        .assess(&request("INV-2025-005", GOOD_IBAN, dec!(60000)))
        .await;

    assert_eq!(verdict.decision(), Decision::Review);
    assert_eq!(verdict.risk_level(), RiskLevel::High);
}

#[tokio::test]
async fn test_block_classification_always_blocks() {
    let (engine, _) = common::engine().await;
    for amount in [dec!(0.5), dec!(500), dec!(60000), dec!(250000)] {
        let verdict = engine
            .assess(&request("INV-2025-006", BLOCK_IBAN, amount))
            .await;
        assert_eq!(verdict.decision(), Decision::Block, "amount {amount}");
        assert_eq!(verdict.risk_level(), RiskLevel::Critical);
        assert_eq!(verdict.reason(), "IBAN is flagged as blocked");
    }
}

#[tokio::test]
async fn test_unlisted_iban_is_reviewed() {
    let (engine, _) = common::engine().await;
    let verdict = engine
        .assess(&request("INV-2025-007", UNLISTED_IBAN, dec!(512.40)))
        .await;

    assert_eq!(verdict.decision(), Decision::Review);
    assert_eq!(verdict.risk_level(), RiskLevel::High);
}

#[tokio::test]
async fn test_fourth_payment_in_an_hour_trips_velocity() {
    let (engine, _) = common::engine().await;
    let amounts = [dec!(512.40), dec!(613.15), dec!(714.20), dec!(815.35)];

    let mut verdicts = Vec::new();
    for (i, amount) in amounts.into_iter().enumerate() {
        let verdict = engine
            .assess(&request(&format!("INV-V-{i}"), GOOD_IBAN, amount))
            .await;
        verdicts.push(verdict);
    }

    for verdict in &verdicts[..3] {
        assert_eq!(verdict.decision(), Decision::Allow);
        assert!(!verdict.has_anomaly(AnomalyKind::Velocity));
    }
    let fourth = &verdicts[3];
    assert!(fourth.has_anomaly(AnomalyKind::Velocity));
    assert!(fourth.decision() >= Decision::Review);
}

#[tokio::test]
async fn test_double_submission_is_flagged_as_duplicate() {
    let (engine, log) = common::engine().await;

    let first = engine
        .assess(&request("INV-2025-010", GOOD_IBAN, dec!(1234.56)))
        .await;
    let second = engine
        .assess(&request("INV-2025-010", GOOD_IBAN, dec!(1234.56)))
        .await;

    assert_eq!(first.decision(), Decision::Allow);
    assert!(!first.has_anomaly(AnomalyKind::DuplicatePayment));
    assert!(second.has_anomaly(AnomalyKind::DuplicatePayment));
    assert_eq!(second.decision(), Decision::Review);

    engine.shutdown().await;
    assert_eq!(log.len().await, 2);
}

#[tokio::test]
async fn test_repeated_payment_is_flagged_as_duplicate() {
    let (engine, log) = common::engine().await;
    log.record_payment(
        "INV-OLD",
        GOOD_IBAN,
        dec!(1234.56),
        common::business_hours() - chrono::TimeDelta::hours(3),
    )
    .await;

    let verdict = engine
        .assess(&request("INV-NEW", GOOD_IBAN, dec!(1234.56)))
        .await;

    assert!(verdict.has_anomaly(AnomalyKind::DuplicatePayment));
    assert_eq!(verdict.decision(), Decision::Review);
    assert_eq!(verdict.risk_level(), RiskLevel::Medium);
}

#[tokio::test]
async fn test_multiple_anomalies_escalate_to_critical() {
    let (engine, _) = common::engine().await;
    let req = iban_guard::domain::request::PaymentAssessmentRequest::new(
        "TEST-INVOICE-1",
        UNLISTED_IBAN,
        iban_guard::domain::request::Amount::new(dec!(5000)).unwrap(),
        "Demo Supplier",
    )
    .with_currency("CHF");
    let verdict = engine.assess(&req).await;

    assert!(verdict.anomalies().len() >= 3);
    assert_eq!(verdict.decision(), Decision::Review);
    assert_eq!(verdict.risk_level(), RiskLevel::Critical);
}

#[tokio::test]
async fn test_off_hours_payment_is_flagged() {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 3, 12, 2, 30, 0).unwrap(),
    ));
    let registry = InMemoryRiskRegistry::new();
    registry.insert(GOOD_IBAN, Classification::Good).await;
    let log = InMemoryPaymentLog::with_clock(clock.clone());
    let engine = AssessmentEngine::with_clock(
        EngineConfig::default(),
        Arc::new(registry),
        Arc::new(log.clone()),
        Arc::new(log),
        clock,
    )
    .unwrap();

    let verdict = engine
        .assess(&request("INV-NIGHT", GOOD_IBAN, dec!(512.40)))
        .await;
    assert!(verdict.has_anomaly(AnomalyKind::OffHours));
    assert_eq!(verdict.decision(), Decision::Review);
}

#[tokio::test]
async fn test_verdicts_are_deterministic() {
    let req = request("INV-2025-008", UNLISTED_IBAN, dec!(3000));

    let (first_engine, _) = common::engine().await;
    let (second_engine, _) = common::engine().await;
    let first = first_engine.assess(&req).await;
    let second = second_engine.assess(&req).await;

    assert_eq!(first.decision(), second.decision());
    assert_eq!(first.risk_level(), second.risk_level());
    assert_eq!(first.reason(), second.reason());
    assert_eq!(first.anomalies(), second.anomalies());
    assert_eq!(first.timestamp(), second.timestamp());
    assert_ne!(first.transaction_id(), second.transaction_id());
}
