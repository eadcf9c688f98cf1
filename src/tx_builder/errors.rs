//! Error types for the submission pipeline
//!
//! Every failure that can leave the pipeline is represented here. Transient
//! statuses (`TRY_AGAIN_LATER`, `NOT_FOUND`) never show up as errors: the
//! submitter retries them internally. Everything else is fatal and carries
//! enough context (hash, encoded envelope, diagnostic events) to diagnose the
//! failure without re-running the submission.

use thiserror::Error;

use crate::rpc::RpcError;
use crate::signer::SignerError;

/// Convenience alias used across the pipeline
pub type SubmissionResult<T> = std::result::Result<T, SubmissionError>;

/// Error taxonomy for the simulate → restore → assemble → sign → send → poll pipeline
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// The RPC boundary reported a simulation failure
    ///
    /// Carries the diagnostic events attached by the boundary and the
    /// unsigned envelope that was simulated.
    #[error("Simulation failed: {message}")]
    Simulation {
        message: String,
        diagnostic_events: Vec<String>,
        envelope_xdr: String,
    },

    /// The nested restore-and-resubmit cycle failed
    ///
    /// Side effects of a partially completed restoration (for example a
    /// consumed sequence number) are not rolled back.
    #[error("Restoration failed: {0}")]
    Restoration(#[source] Box<SubmissionError>),

    /// The transaction never reached `PENDING`
    #[error("Transaction failed to send (hash={hash}, status={status})")]
    Send {
        hash: String,
        status: String,
        error_result_xdr: Option<String>,
        diagnostic_events: Vec<String>,
        envelope_xdr: String,
    },

    /// The ledger recorded the transaction as failed
    #[error("Transaction failed (hash={hash})")]
    Confirmation {
        hash: String,
        result_xdr: Option<String>,
        diagnostic_events: Vec<String>,
        envelope_xdr: String,
    },

    /// Opt-in confirmation deadline elapsed while the record was still missing
    #[error("Transaction {hash} not confirmed after {waited_ms}ms")]
    ConfirmationTimeout { hash: String, waited_ms: u64 },

    /// The caller-supplied parser rejected an otherwise successful result
    #[error("Failed to decode result: {0}")]
    Decode(#[source] anyhow::Error),

    /// The signer capability failed or rejected the envelope
    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    /// A classic (non-simulated) submission failed; the cause is logged, not kept
    #[error("failed to submit classic op TX")]
    ClassicSubmission,

    /// The simulation response had a shape the pipeline cannot act on
    #[error("Invalid simulation response: {0}")]
    InvalidSimulation(String),

    /// XDR encoding or decoding failed
    #[error("XDR error: {0}")]
    Xdr(String),

    /// RPC transport or protocol failure
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Invalid builder options or engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SubmissionError {
    /// Check if resubmitting the same logical operation might succeed
    ///
    /// Nothing here is retried by the pipeline itself; this is a hint for
    /// callers that own the retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(err) => err.is_retryable(),
            Self::ConfirmationTimeout { .. } => true,
            Self::Send { status, .. } => status == "TRY_AGAIN_LATER",

            Self::Simulation { .. } => false,
            Self::Restoration(_) => false,
            Self::Confirmation { .. } => false,
            Self::Decode(_) => false,
            Self::Signing(_) => false,
            Self::ClassicSubmission => false,
            Self::InvalidSimulation(_) => false,
            Self::Xdr(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Simulation { .. } => "simulation",
            Self::Restoration(_) => "restoration",
            Self::Send { .. } => "send",
            Self::Confirmation { .. } => "confirmation",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::Decode(_) => "decode",
            Self::Signing(_) => "signing",
            Self::ClassicSubmission => "classic",
            Self::InvalidSimulation(_) => "invalid_simulation",
            Self::Xdr(_) => "xdr",
            Self::Rpc(_) => "rpc",
            Self::Configuration(_) => "config",
        }
    }

    /// Diagnostic events attached to this failure, if any
    pub fn diagnostic_events(&self) -> &[String] {
        match self {
            Self::Simulation {
                diagnostic_events, ..
            }
            | Self::Send {
                diagnostic_events, ..
            }
            | Self::Confirmation {
                diagnostic_events, ..
            } => diagnostic_events,
            Self::Restoration(inner) => inner.diagnostic_events(),
            _ => &[],
        }
    }
}

// Convenience constructors for common error scenarios
impl SubmissionError {
    /// Wrap a failure that happened inside the restoration cycle
    pub fn restoration(inner: SubmissionError) -> Self {
        Self::Restoration(Box::new(inner))
    }

    /// Create an XDR error from any displayable cause
    pub fn xdr(reason: impl std::fmt::Display) -> Self {
        Self::Xdr(reason.to_string())
    }

    /// Create an invalid simulation error
    pub fn invalid_simulation(reason: impl Into<String>) -> Self {
        Self::InvalidSimulation(reason.into())
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}
