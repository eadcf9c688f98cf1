use thiserror::Error;

/// Errors raised at the RPC boundary
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Transport-level errors (network, connection, TLS)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Request exceeded the configured timeout
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// Non-2xx HTTP status
    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    /// JSON-RPC error object returned by the server
    #[error("RPC response error: {message} (method: {method}, code: {code})")]
    RpcResponse {
        method: String,
        code: i64,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Malformed response for {method}: {reason}")]
    MalformedResponse { method: String, reason: String },

    /// Account lookup returned no ledger entry
    #[error("Account not found: {account}")]
    AccountNotFound { account: String },

    /// XDR in a response could not be decoded
    #[error("XDR decode error in {field}: {reason}")]
    Xdr { field: String, reason: String },
}

impl RpcError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport { .. } => true,
            RpcError::Timeout { .. } => true,
            RpcError::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),

            RpcError::RpcResponse { .. } => false,
            RpcError::MalformedResponse { .. } => false,
            RpcError::AccountNotFound { .. } => false,
            RpcError::Xdr { .. } => false,
        }
    }

    pub(crate) fn malformed(method: &str, reason: impl Into<String>) -> Self {
        RpcError::MalformedResponse {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn xdr(field: &str, reason: impl std::fmt::Display) -> Self {
        RpcError::Xdr {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for RPC calls
pub type RpcResult<T> = Result<T, RpcError>;
