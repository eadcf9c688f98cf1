//! Boundary types exchanged with the RPC server
//!
//! Simulation responses are classified into [`SimulationOutcome`] exactly
//! once, by the RPC implementation. Send and poll responses keep the raw
//! status alongside the data the pipeline needs, and are turned into
//! [`SendOutcome`] / [`ConfirmationOutcome`] by the submitter.

use std::fmt;

use stellar_xdr::curr::{ScVal, SorobanAuthorizationEntry, SorobanTransactionData};

/// Resource data from a successful simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSuccess {
    /// Simulated return value of the (single) host function, if any
    pub return_value: Option<ScVal>,
    /// Authorization entries the host function requires
    pub auth: Vec<SorobanAuthorizationEntry>,
    /// Footprint and resource limits to attach to the transaction
    pub transaction_data: SorobanTransactionData,
    /// Resource fee, in stroops
    pub min_resource_fee: i64,
    pub latest_ledger: u32,
}

/// What a restoration transaction must declare
#[derive(Debug, Clone, PartialEq)]
pub struct RestorePreamble {
    pub min_resource_fee: i64,
    pub transaction_data: SorobanTransactionData,
}

/// A simulation the boundary reported as failed
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationFailure {
    pub message: String,
    /// Base64 `DiagnosticEvent`s
    pub diagnostic_events: Vec<String>,
}

/// Classified simulation response; exactly one tag is active
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Success(SimulationSuccess),
    /// Some footprint entries are archived and must be restored first
    ///
    /// `return_value` is what the operation would return once restored.
    RestoreRequired {
        preamble: RestorePreamble,
        return_value: Option<ScVal>,
    },
    Error(SimulationFailure),
}

impl SimulationOutcome {
    /// Tag name, for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SimulationOutcome::Success(_) => "success",
            SimulationOutcome::RestoreRequired { .. } => "restore_required",
            SimulationOutcome::Error(_) => "error",
        }
    }

    /// Simulated return value, available for reads even when a restore is needed
    pub fn return_value(&self) -> Option<&ScVal> {
        match self {
            SimulationOutcome::Success(success) => success.return_value.as_ref(),
            SimulationOutcome::RestoreRequired { return_value, .. } => return_value.as_ref(),
            SimulationOutcome::Error(_) => None,
        }
    }
}

/// `sendTransaction` status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
    Unknown(String),
}

impl SendStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "PENDING" => SendStatus::Pending,
            "DUPLICATE" => SendStatus::Duplicate,
            "TRY_AGAIN_LATER" => SendStatus::TryAgainLater,
            "ERROR" => SendStatus::Error,
            other => SendStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SendStatus::Pending => "PENDING",
            SendStatus::Duplicate => "DUPLICATE",
            SendStatus::TryAgainLater => "TRY_AGAIN_LATER",
            SendStatus::Error => "ERROR",
            SendStatus::Unknown(other) => other,
        }
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `sendTransaction` response
#[derive(Debug, Clone, PartialEq)]
pub struct SendTransactionResponse {
    pub status: SendStatus,
    pub hash: String,
    /// Base64 `TransactionResult` when the server rejected the transaction
    pub error_result_xdr: Option<String>,
    /// Base64 `DiagnosticEvent`s
    pub diagnostic_events: Vec<String>,
    pub latest_ledger: u32,
}

/// Why a send never reached `PENDING`
#[derive(Debug, Clone, PartialEq)]
pub struct SendRejection {
    pub status: SendStatus,
    pub hash: String,
    pub error_result_xdr: Option<String>,
    pub diagnostic_events: Vec<String>,
}

/// Classified send response
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Pending { hash: String },
    /// `TRY_AGAIN_LATER`; the response data is kept in case the retry window closes
    Transient(SendRejection),
    Terminal(SendRejection),
}

impl SendTransactionResponse {
    pub fn into_outcome(self) -> SendOutcome {
        match self.status {
            SendStatus::Pending => SendOutcome::Pending { hash: self.hash },
            SendStatus::TryAgainLater => SendOutcome::Transient(self.into_rejection()),
            _ => SendOutcome::Terminal(self.into_rejection()),
        }
    }

    fn into_rejection(self) -> SendRejection {
        SendRejection {
            status: self.status,
            hash: self.hash,
            error_result_xdr: self.error_result_xdr,
            diagnostic_events: self.diagnostic_events,
        }
    }
}

/// `getTransaction` status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    NotFound,
    Success,
    Failed,
    Unknown(String),
}

impl TransactionStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "NOT_FOUND" => TransactionStatus::NotFound,
            "SUCCESS" => TransactionStatus::Success,
            "FAILED" => TransactionStatus::Failed,
            other => TransactionStatus::Unknown(other.to_string()),
        }
    }
}

/// `getTransaction` response
#[derive(Debug, Clone, PartialEq)]
pub struct GetTransactionResponse {
    pub status: TransactionStatus,
    /// Return value extracted from the Soroban meta, when present
    pub return_value: Option<ScVal>,
    /// Base64 `TransactionResult`
    pub result_xdr: Option<String>,
    /// Base64 `DiagnosticEvent`s
    pub diagnostic_events: Vec<String>,
    pub ledger: Option<u32>,
}

impl GetTransactionResponse {
    pub fn not_found() -> Self {
        Self {
            status: TransactionStatus::NotFound,
            return_value: None,
            result_xdr: None,
            diagnostic_events: Vec::new(),
            ledger: None,
        }
    }

    pub fn success(return_value: Option<ScVal>, ledger: u32) -> Self {
        Self {
            status: TransactionStatus::Success,
            return_value,
            result_xdr: None,
            diagnostic_events: Vec::new(),
            ledger: Some(ledger),
        }
    }

    pub fn failed(result_xdr: Option<String>, diagnostic_events: Vec<String>) -> Self {
        Self {
            status: TransactionStatus::Failed,
            return_value: None,
            result_xdr,
            diagnostic_events,
            ledger: None,
        }
    }

    pub fn into_outcome(self) -> ConfirmationOutcome {
        match self.status {
            TransactionStatus::NotFound => ConfirmationOutcome::NotFoundYet,
            TransactionStatus::Success => ConfirmationOutcome::Success {
                return_value: self.return_value,
                ledger: self.ledger,
            },
            TransactionStatus::Failed | TransactionStatus::Unknown(_) => {
                ConfirmationOutcome::Failed {
                    result_xdr: self.result_xdr,
                    diagnostic_events: self.diagnostic_events,
                }
            }
        }
    }
}

/// Classified confirmation record
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    NotFoundYet,
    Success {
        return_value: Option<ScVal>,
        ledger: Option<u32>,
    },
    Failed {
        result_xdr: Option<String>,
        diagnostic_events: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(status: &str) -> SendTransactionResponse {
        SendTransactionResponse {
            status: SendStatus::from_wire(status),
            hash: "ab".to_string(),
            error_result_xdr: None,
            diagnostic_events: vec!["ev".to_string()],
            latest_ledger: 10,
        }
    }

    #[test]
    fn test_send_classification() {
        assert_eq!(
            send("PENDING").into_outcome(),
            SendOutcome::Pending {
                hash: "ab".to_string()
            }
        );
        match send("TRY_AGAIN_LATER").into_outcome() {
            SendOutcome::Transient(rejection) => {
                assert_eq!(rejection.hash, "ab");
                assert_eq!(rejection.diagnostic_events, vec!["ev".to_string()]);
            }
            other => panic!("TRY_AGAIN_LATER classified as {other:?}"),
        }

        for status in ["DUPLICATE", "ERROR", "SOMETHING_NEW"] {
            match send(status).into_outcome() {
                SendOutcome::Terminal(rejection) => {
                    assert_eq!(rejection.status.as_str(), status);
                    assert_eq!(rejection.diagnostic_events, vec!["ev".to_string()]);
                }
                other => panic!("{status} classified as {other:?}"),
            }
        }
    }

    #[test]
    fn test_confirmation_classification() {
        assert_eq!(
            GetTransactionResponse::not_found().into_outcome(),
            ConfirmationOutcome::NotFoundYet
        );
        assert!(matches!(
            GetTransactionResponse::success(Some(ScVal::U32(3)), 5).into_outcome(),
            ConfirmationOutcome::Success {
                return_value: Some(ScVal::U32(3)),
                ledger: Some(5)
            }
        ));

        let unknown = GetTransactionResponse {
            status: TransactionStatus::from_wire("WEIRD"),
            ..GetTransactionResponse::not_found()
        };
        assert!(matches!(
            unknown.into_outcome(),
            ConfirmationOutcome::Failed { .. }
        ));
    }
}
