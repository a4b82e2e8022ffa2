#![allow(dead_code)]

use iban_guard::application::engine::AssessmentEngine;
use iban_guard::config::EngineConfig;
use iban_guard::domain::classification::Classification;
use iban_guard::domain::request::{Amount, PaymentAssessmentRequest};
use iban_guard::infrastructure::clock::FixedClock;
use iban_guard::infrastructure::in_memory::{InMemoryPaymentLog, InMemoryRiskRegistry};
use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const GOOD_IBAN: &str = "DE89370400440532013000";
pub const REVIEW_IBAN: &str = "GB82WEST12345698765432";
pub const BLOCK_IBAN: &str = "NL91ABNA0417164300";
pub const UNLISTED_IBAN: &str = "CH9300762011623852957";

/// Wednesday, inside business hours.
pub fn business_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap()
}

pub async fn seeded_registry() -> InMemoryRiskRegistry {
    let registry = InMemoryRiskRegistry::new();
    registry.insert(GOOD_IBAN, Classification::Good).await;
    registry.insert(REVIEW_IBAN, Classification::Review).await;
    registry.insert(BLOCK_IBAN, Classification::Block).await;
    registry
}

/// Engine over in-memory stores with a clock fixed at [`business_hours`].
pub async fn engine() -> (AssessmentEngine, InMemoryPaymentLog) {
    let clock = Arc::new(FixedClock::new(business_hours()));
    let log = InMemoryPaymentLog::with_clock(clock.clone());
    let engine = AssessmentEngine::with_clock(
        EngineConfig::default(),
        Arc::new(seeded_registry().await),
        Arc::new(log.clone()),
        Arc::new(log.clone()),
        clock,
    )
    .expect("Failed to build engine");
    (engine, log)
}

pub fn request(invoice_id: &str, iban: &str, amount: Decimal) -> PaymentAssessmentRequest {
    PaymentAssessmentRequest::new(
        invoice_id,
        iban,
        Amount::new(amount).expect("amount must be positive"),
        "Acme Industrial GmbH",
    )
    .with_currency("EUR")
}

/// Computes the two check digits for `country` + `bban`.
pub fn check_digits(country: &str, bban: &str) -> u32 {
    let rearranged = format!("{bban}{country}00");
    let remainder = rearranged.chars().fold(0u32, |acc, c| {
        let value = c.to_digit(36).expect("alphanumeric");
        if value > 9 {
            (acc * 100 + value) % 97
        } else {
            (acc * 10 + value) % 97
        }
    });
    98 - remainder
}

/// A random German IBAN with correct check digits.
pub fn random_iban<R: Rng>(rng: &mut R) -> String {
    let bban: String = (0..18)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!("DE{:02}{bban}", check_digits("DE", &bban))
}

pub fn generate_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record(["invoice_id", "supplier_iban", "amount", "supplier_name", "currency"])?;

    for i in 1..=rows {
        let cents: u32 = rng.gen_range(100..5_000_000);
        wtr.write_record([
            format!("INV-{i}").as_str(),
            random_iban(&mut rng).as_str(),
            format!("{}.{:02}", cents / 100, cents % 100).as_str(),
            "Acme Industrial GmbH",
            "EUR",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
