use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Classification lookup failed: {0}")]
    ClassificationError(String),
    #[error("Payment history lookup failed: {0}")]
    HistoryError(String),
    #[error("Audit sink error: {0}")]
    AuditError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Arithmetic error: {0}")]
    ArithmeticError(String),
    #[error("Verdict invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
