//! RPC boundary
//!
//! The pipeline talks to the ledger only through [`SorobanRpc`]. The handle is
//! passed explicitly into the engine; there is no process-wide client. Tests
//! substitute scripted fakes, production uses [`HttpRpcClient`].

use async_trait::async_trait;
use stellar_xdr::curr::{AccountId, TransactionEnvelope};

use crate::tx_builder::Account;

mod http_client;
mod rpc_errors;
mod types;
mod wire;

pub use http_client::HttpRpcClient;
pub use rpc_errors::{RpcError, RpcResult};
pub use types::{
    ConfirmationOutcome, GetTransactionResponse, RestorePreamble, SendOutcome, SendRejection,
    SendStatus, SendTransactionResponse, SimulationFailure, SimulationOutcome, SimulationSuccess,
    TransactionStatus,
};

/// Abstract contract of the RPC server
#[async_trait]
pub trait SorobanRpc: Send + Sync {
    /// Current on-ledger state of an account; fails if the account is unknown
    async fn get_account(&self, id: &AccountId) -> RpcResult<Account>;

    /// Dry-run an unsigned envelope and classify the outcome
    async fn simulate_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> RpcResult<SimulationOutcome>;

    /// Submit a signed envelope
    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> RpcResult<SendTransactionResponse>;

    /// Look up the terminal record of a submitted transaction by hex hash
    async fn get_transaction(&self, hash: &str) -> RpcResult<GetTransactionResponse>;
}
