//! Send and confirm state machine
//!
//! ```text
//! SENT --TRY_AGAIN_LATER (bounded window)--> SENT
//!   |
//!   +--PENDING--> POLLING --NOT_FOUND (unbounded)--> POLLING
//!                   |
//!                   +--SUCCESS--> Confirmed
//!                   +--FAILED---> SubmissionError::Confirmation
//! ```
//!
//! Every resend reuses the same [`SignedTransaction`]. The confirmation loop
//! has no limit unless `confirmation_timeout_ms` is configured; dropping the
//! future stops it at the next sleep or RPC call.

use std::sync::Arc;

use stellar_xdr::curr::ScVal;
use tokio::time::{sleep, Instant};

use crate::config::SubmitterConfig;
use crate::metrics::metrics;
use crate::rpc::{ConfirmationOutcome, SendOutcome, SendRejection, SendStatus, SorobanRpc};
use crate::structured_logging::SubmissionLogger;
use crate::tx_builder::{SignedTransaction, SubmissionError, SubmissionResult};

/// Terminal success record of a submitted transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmed {
    pub hash: String,
    /// Raw return value, undecoded
    pub return_value: Option<ScVal>,
    pub ledger: Option<u32>,
}

/// Drives a signed transaction from first send to a terminal record
#[derive(Clone)]
pub struct Submitter {
    rpc: Arc<dyn SorobanRpc>,
    config: SubmitterConfig,
}

impl Submitter {
    pub fn new(rpc: Arc<dyn SorobanRpc>, config: SubmitterConfig) -> Self {
        Self { rpc, config }
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Send, then poll until the ledger has a record for the transaction
    pub async fn submit(
        &self,
        signed: &SignedTransaction,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<Confirmed> {
        let start = Instant::now();
        let hash = self.send_with_retry(signed, logger).await?;
        let confirmed = self.await_confirmation(&hash, signed, logger).await?;

        let elapsed = start.elapsed();
        metrics().submit_latency.observe(elapsed.as_secs_f64());
        logger.log_submitted(&confirmed.hash, confirmed.ledger, elapsed.as_millis() as u64);
        Ok(confirmed)
    }

    /// Send until the server accepts the transaction or the retry window closes
    ///
    /// Only `TRY_AGAIN_LATER` is retried. The window is measured from the first
    /// send; a resend happens only while less than the window has elapsed.
    pub async fn send_with_retry(
        &self,
        signed: &SignedTransaction,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<String> {
        let interval = self.config.send_retry_interval();
        let window = self.config.send_retry_window();

        let start = Instant::now();
        let mut attempt: u32 = 1;
        let mut response = self.rpc.send_transaction(signed.envelope()).await?;

        while response.status == SendStatus::TryAgainLater && start.elapsed() < window {
            sleep(interval).await;
            attempt += 1;
            metrics().send_retries_total.inc();
            logger.log_send_retry(signed.hash(), attempt, start.elapsed().as_millis() as u64);
            response = self.rpc.send_transaction(signed.envelope()).await?;
        }

        match response.into_outcome() {
            SendOutcome::Pending { hash } => {
                if hash.is_empty() {
                    Ok(signed.hash().to_string())
                } else {
                    Ok(hash)
                }
            }
            SendOutcome::Transient(rejection) | SendOutcome::Terminal(rejection) => {
                Err(self.send_failure(signed, rejection, logger))
            }
        }
    }

    /// Poll `getTransaction` until the record is no longer `NOT_FOUND`
    ///
    /// `signed` is only read to report the envelope when the ledger records a failure.
    pub async fn await_confirmation(
        &self,
        hash: &str,
        signed: &SignedTransaction,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<Confirmed> {
        let interval = self.config.confirmation_poll_interval();
        let timeout = self.config.confirmation_timeout();
        let start = Instant::now();

        loop {
            metrics().confirmation_polls_total.inc();
            match self.rpc.get_transaction(hash).await?.into_outcome() {
                ConfirmationOutcome::NotFoundYet => {
                    if let Some(limit) = timeout {
                        if start.elapsed() >= limit {
                            return Err(SubmissionError::ConfirmationTimeout {
                                hash: hash.to_string(),
                                waited_ms: start.elapsed().as_millis() as u64,
                            });
                        }
                    }
                    sleep(interval).await;
                }
                ConfirmationOutcome::Success {
                    return_value,
                    ledger,
                } => {
                    return Ok(Confirmed {
                        hash: hash.to_string(),
                        return_value,
                        ledger,
                    });
                }
                ConfirmationOutcome::Failed {
                    result_xdr,
                    diagnostic_events,
                } => {
                    let envelope_xdr = signed.to_xdr_base64().unwrap_or_default();
                    logger.log_confirmation_failure(
                        hash,
                        result_xdr.as_deref(),
                        &envelope_xdr,
                        &diagnostic_events,
                    );
                    return Err(SubmissionError::Confirmation {
                        hash: hash.to_string(),
                        result_xdr,
                        diagnostic_events,
                        envelope_xdr,
                    });
                }
            }
        }
    }

    fn send_failure(
        &self,
        signed: &SignedTransaction,
        rejection: SendRejection,
        logger: &SubmissionLogger,
    ) -> SubmissionError {
        let hash = if rejection.hash.is_empty() {
            signed.hash().to_string()
        } else {
            rejection.hash
        };
        let envelope_xdr = signed.to_xdr_base64().unwrap_or_default();
        logger.log_send_failure(
            &hash,
            rejection.status.as_str(),
            rejection.error_result_xdr.as_deref(),
            &envelope_xdr,
            &rejection.diagnostic_events,
        );
        SubmissionError::Send {
            hash,
            status: rejection.status.to_string(),
            error_result_xdr: rejection.error_result_xdr,
            diagnostic_events: rejection.diagnostic_events,
            envelope_xdr,
        }
    }
}
