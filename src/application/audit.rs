//! Fire-and-forget verdict auditing.
//!
//! Verdicts are pushed onto an unbounded channel and written to the
//! [`AuditSink`](crate::domain::ports::AuditSink) by a background worker, so a
//! slow or failing sink can never delay or alter a verdict.

use crate::domain::ports::AuditSinkRef;
use crate::domain::request::PaymentAssessmentRequest;
use crate::domain::verdict::Verdict;
use crate::metrics::{self, EngineMetrics};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

enum AuditCommand {
    Record(Box<Verdict>, Box<PaymentAssessmentRequest>),
    Flush(oneshot::Sender<()>),
}

pub struct AuditEmitter {
    sender: mpsc::UnboundedSender<AuditCommand>,
    worker: JoinHandle<()>,
}

impl AuditEmitter {
    /// Spawns the background worker. Must be called from within a Tokio
    /// runtime.
    pub fn spawn(sink: AuditSinkRef, metrics: EngineMetrics) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    AuditCommand::Record(verdict, request) => {
                        let outcome = AssertUnwindSafe(sink.record(&verdict, &request))
                            .catch_unwind()
                            .await;
                        match outcome {
                            Ok(Ok(())) => {
                                debug!(invoice_id = verdict.invoice_id(), "verdict audited")
                            }
                            Ok(Err(e)) => {
                                error!(invoice_id = verdict.invoice_id(), error = %e, "failed to audit verdict");
                                metrics.record_collaborator_failure(metrics::AUDIT);
                            }
                            Err(_) => {
                                error!(invoice_id = verdict.invoice_id(), "audit sink panicked");
                                metrics.record_collaborator_failure(metrics::AUDIT);
                            }
                        }
                    }
                    AuditCommand::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self { sender, worker }
    }

    /// Queues a verdict for auditing without waiting for the sink.
    pub fn emit(&self, verdict: Verdict, request: PaymentAssessmentRequest) {
        let command = AuditCommand::Record(Box::new(verdict), Box::new(request));
        if self.sender.send(command).is_err() {
            warn!("audit worker has stopped, verdict not recorded");
        }
    }

    /// Resolves once every verdict queued before the call has been handed to
    /// the sink.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(AuditCommand::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Drains the queue and stops the worker.
    pub async fn shutdown(self) {
        let Self { sender, worker } = self;
        drop(sender);
        if let Err(e) = worker.await {
            error!(error = %e, "audit worker terminated abnormally");
        }
    }
}
