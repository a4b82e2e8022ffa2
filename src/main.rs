use clap::Parser;
use iban_guard::application::engine::AssessmentEngine;
use iban_guard::config::EngineConfig;
use iban_guard::domain::classification::Classification;
use iban_guard::domain::ports::{AuditSinkRef, PaymentHistoryRef, RiskClassifierRef};
use iban_guard::infrastructure::in_memory::{InMemoryPaymentLog, InMemoryRiskRegistry};
#[cfg(feature = "storage-rocksdb")]
use iban_guard::infrastructure::rocksdb::RocksDbPaymentLog;
use iban_guard::interfaces::csv::classification_reader::ClassificationReader;
use iban_guard::interfaces::csv::request_reader::RequestReader;
use iban_guard::interfaces::csv::verdict_writer::VerdictWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Pre-payment fraud gate: assesses supplier payments from a CSV file and
/// prints one verdict per request.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment requests CSV file
    input: PathBuf,

    /// CSV of `iban, classification` rows used to seed the risk registry
    #[arg(long)]
    classifications: Option<PathBuf>,

    /// TOML file overriding the default engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,
}

enum Storage {
    InMemory {
        registry: InMemoryRiskRegistry,
        log: InMemoryPaymentLog,
    },
    #[cfg(feature = "storage-rocksdb")]
    RocksDb(RocksDbPaymentLog),
}

impl Storage {
    fn in_memory() -> Self {
        Storage::InMemory {
            registry: InMemoryRiskRegistry::new(),
            log: InMemoryPaymentLog::new(),
        }
    }

    fn open(db_path: Option<PathBuf>) -> Result<Self> {
        match db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => Ok(Storage::RocksDb(
                RocksDbPaymentLog::open(path).into_diagnostic()?,
            )),
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(_) => {
                eprintln!(
                    "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
                );
                Ok(Self::in_memory())
            }
            None => Ok(Self::in_memory()),
        }
    }

    async fn seed(&self, iban: &str, classification: Classification) -> Result<()> {
        match self {
            Storage::InMemory { registry, .. } => {
                registry.insert(iban, classification).await;
                Ok(())
            }
            #[cfg(feature = "storage-rocksdb")]
            Storage::RocksDb(store) => store
                .insert_classification(iban, classification)
                .into_diagnostic(),
        }
    }

    fn ports(&self) -> (RiskClassifierRef, PaymentHistoryRef, AuditSinkRef) {
        match self {
            Storage::InMemory { registry, log } => (
                Arc::new(registry.clone()),
                Arc::new(log.clone()),
                Arc::new(log.clone()),
            ),
            #[cfg(feature = "storage-rocksdb")]
            Storage::RocksDb(store) => (
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(store.clone()),
            ),
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iban_guard=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };

    let storage = Storage::open(cli.db_path)?;

    if let Some(path) = &cli.classifications {
        let file = File::open(path).into_diagnostic()?;
        for entry in ClassificationReader::new(file).entries() {
            match entry {
                Ok((iban, classification)) => storage.seed(&iban, classification).await?,
                Err(e) => warn!(error = %e, "Error reading classification"),
            }
        }
    }

    let (classifier, history, audit) = storage.ports();
    let engine = AssessmentEngine::new(config, classifier, history, audit).into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = VerdictWriter::new(stdout.lock());

    for request_result in RequestReader::new(file).requests() {
        match request_result {
            Ok(request) => {
                if let Err(e) = request.validate() {
                    warn!(invoice_id = %request.invoice_id(), error = %e, "Invalid request");
                    continue;
                }
                let verdict = engine.assess(&request).await;
                writer
                    .write_verdict(&verdict, engine.within_budget(&verdict))
                    .into_diagnostic()?;
            }
            Err(e) => {
                warn!(error = %e, "Error reading request");
            }
        }
    }
    writer.flush().into_diagnostic()?;

    if cli.metrics {
        eprintln!("{}", engine.metrics().render().into_diagnostic()?);
    }
    engine.shutdown().await;

    Ok(())
}
