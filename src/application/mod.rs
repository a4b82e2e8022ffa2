//! Application layer containing the assessment pipeline.
//!
//! `AssessmentEngine` is the entry point: it validates the IBAN, consults the
//! risk classifier, runs the anomaly rule table, synthesizes the verdict and
//! hands it to the audit worker.

pub mod audit;
pub mod detector;
pub mod engine;
pub mod synthesizer;
