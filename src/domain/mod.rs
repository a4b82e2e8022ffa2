//! Domain model: payment requests, classifications, anomalies and verdicts,
//! plus the ports the engine consumes.

pub mod anomaly;
pub mod classification;
pub mod iban;
pub mod ports;
pub mod request;
pub mod verdict;
