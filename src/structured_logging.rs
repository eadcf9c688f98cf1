//! Structured logging for submissions
//!
//! Each pipeline run gets a [`SubmissionLogger`] carrying a correlation id,
//! so the restore sub-submission and the main submission can be tied together
//! in the logs. Failure events always include the transaction hash, the
//! encoded envelope and every diagnostic event.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Structured logger for pipeline events
#[derive(Debug, Clone)]
pub struct SubmissionLogger {
    submission_id: String,
    operation: &'static str,
}

impl SubmissionLogger {
    pub fn new(operation: &'static str) -> Self {
        Self {
            submission_id: Uuid::new_v4().to_string(),
            operation,
        }
    }

    /// Logger for a nested step that shares this submission's id
    pub fn child(&self, operation: &'static str) -> Self {
        Self {
            submission_id: self.submission_id.clone(),
            operation,
        }
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn log_simulated(&self, outcome: &str, sequence: i64) {
        tracing::debug!(
            submission_id = %self.submission_id,
            operation = self.operation,
            outcome = outcome,
            sequence = sequence,
            "Simulated transaction"
        );
    }

    pub fn log_simulation_error(&self, message: &str, envelope_xdr: &str, events: &[String]) {
        tracing::error!(
            submission_id = %self.submission_id,
            operation = self.operation,
            error = %message,
            xdr = %envelope_xdr,
            "Simulation failed"
        );
        self.log_events(events);
    }

    pub fn log_restore_start(&self, fee: u32) {
        tracing::info!(
            submission_id = %self.submission_id,
            fee = fee,
            "Restoring archived footprint"
        );
    }

    pub fn log_restore_complete(&self, hash: &str, sequence: i64) {
        tracing::info!(
            submission_id = %self.submission_id,
            hash = %hash,
            sequence = sequence,
            "Restored"
        );
    }

    pub fn log_tx_hash(&self, hash: &str) {
        tracing::info!(
            submission_id = %self.submission_id,
            operation = self.operation,
            hash = %hash,
            "Transaction hash"
        );
    }

    pub fn log_send_retry(&self, hash: &str, attempt: u32, elapsed_ms: u64) {
        tracing::debug!(
            submission_id = %self.submission_id,
            hash = %hash,
            attempt = attempt,
            elapsed_ms = elapsed_ms,
            "Send returned TRY_AGAIN_LATER, resending"
        );
    }

    pub fn log_send_failure(
        &self,
        hash: &str,
        status: &str,
        error_result_xdr: Option<&str>,
        envelope_xdr: &str,
        events: &[String],
    ) {
        tracing::error!(
            submission_id = %self.submission_id,
            hash = %hash,
            status = %status,
            error_result_xdr = ?error_result_xdr,
            xdr = %envelope_xdr,
            "Transaction failed to send"
        );
        self.log_events(events);
    }

    pub fn log_confirmation_failure(
        &self,
        hash: &str,
        result_xdr: Option<&str>,
        envelope_xdr: &str,
        events: &[String],
    ) {
        tracing::error!(
            submission_id = %self.submission_id,
            hash = %hash,
            result_xdr = ?result_xdr,
            xdr = %envelope_xdr,
            "Transaction failed"
        );
        self.log_events(events);
    }

    pub fn log_submitted(&self, hash: &str, ledger: Option<u32>, latency_ms: u64) {
        tracing::info!(
            submission_id = %self.submission_id,
            operation = self.operation,
            hash = %hash,
            ledger = ?ledger,
            latency_ms = latency_ms,
            "Tx Submitted!"
        );
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            submission_id = %self.submission_id,
            operation = self.operation,
            message = %message,
            "Error"
        );
    }

    fn log_events(&self, events: &[String]) {
        for event in events {
            tracing::error!(
                submission_id = %self.submission_id,
                event = %event,
                "Event"
            );
        }
    }
}

/// Install a global `tracing` subscriber honoring `RUST_LOG`
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).try_init().is_ok()
    } else {
        registry.with(fmt::layer()).try_init().is_ok()
    }
}
