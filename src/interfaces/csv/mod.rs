//! CSV adapters used by the command-line front end.

pub mod classification_reader;
pub mod request_reader;
pub mod verdict_writer;
