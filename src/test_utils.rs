//! Test Utilities Module
//!
//! Scripted fakes for the RPC boundary and the signer capability, plus XDR
//! fixtures. Nothing here touches the network: every response is queued by
//! the test up front and every call is recorded with its (virtual) time.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use stellar_xdr::curr::{
    AccountId, Hash, HostFunction, InvokeHostFunctionOp, LedgerFootprint, LedgerKey,
    LedgerKeyContractCode, Operation, OperationBody, ScVal, SorobanResources,
    SorobanTransactionData, SorobanTransactionDataExt, Transaction, TransactionEnvelope,
    TransactionExt,
};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::rpc::{
    GetTransactionResponse, RestorePreamble, RpcError, RpcResult, SendStatus,
    SendTransactionResponse, SimulationFailure, SimulationOutcome, SimulationSuccess, SorobanRpc,
};
use crate::signer::{KeypairSigner, SignerError, TransactionSigner};
use crate::tx_builder::Account;

pub const TEST_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// One call received by [`ScriptedRpc`]
#[derive(Debug, Clone, PartialEq)]
pub enum RpcCall {
    GetAccount,
    Simulate { sequence: i64, fee: u32 },
    Send { sequence: i64, fee: u32, envelope: TransactionEnvelope },
    GetTransaction { hash: String },
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: RpcCall,
    pub at: Instant,
}

/// Scripted RPC server
///
/// Responses are served from per-method queues. When the send or poll queue
/// is empty the server answers `PENDING` / `SUCCESS` with no return value; an
/// empty simulation queue is an error. The account sequence advances by one
/// for every send answered with `PENDING`.
#[derive(Clone)]
pub struct ScriptedRpc {
    account_sequence: Arc<Mutex<Option<i64>>>,
    simulations: Arc<Mutex<VecDeque<SimulationOutcome>>>,
    sends: Arc<Mutex<VecDeque<SendTransactionResponse>>>,
    transactions: Arc<Mutex<VecDeque<GetTransactionResponse>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedRpc {
    /// Server whose account starts at sequence 0
    pub fn new() -> Self {
        Self::with_sequence(0)
    }

    pub fn with_sequence(sequence: i64) -> Self {
        Self {
            account_sequence: Arc::new(Mutex::new(Some(sequence))),
            simulations: Arc::new(Mutex::new(VecDeque::new())),
            sends: Arc::new(Mutex::new(VecDeque::new())),
            transactions: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make `get_account` fail with `AccountNotFound`
    pub async fn remove_account(&self) {
        *self.account_sequence.lock().await = None;
    }

    pub async fn account_sequence(&self) -> Option<i64> {
        *self.account_sequence.lock().await
    }

    pub async fn push_simulation(&self, outcome: SimulationOutcome) {
        self.simulations.lock().await.push_back(outcome);
    }

    pub async fn push_send(&self, response: SendTransactionResponse) {
        self.sends.lock().await.push_back(response);
    }

    pub async fn push_sends(&self, status: SendStatus, count: usize) {
        let mut sends = self.sends.lock().await;
        for _ in 0..count {
            sends.push_back(send_response(status.clone()));
        }
    }

    pub async fn push_transaction(&self, response: GetTransactionResponse) {
        self.transactions.lock().await.push_back(response);
    }

    pub async fn push_not_found(&self, count: usize) {
        let mut transactions = self.transactions.lock().await;
        for _ in 0..count {
            transactions.push_back(GetTransactionResponse::not_found());
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Sequence numbers of every simulated transaction, in order
    pub async fn simulated_sequences(&self) -> Vec<i64> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match &c.call {
                RpcCall::Simulate { sequence, .. } => Some(*sequence),
                _ => None,
            })
            .collect()
    }

    /// Every envelope received by `send_transaction`, in order
    pub async fn sent_envelopes(&self) -> Vec<TransactionEnvelope> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match &c.call {
                RpcCall::Send { envelope, .. } => Some(envelope.clone()),
                _ => None,
            })
            .collect()
    }

    /// Virtual time of every send
    pub async fn send_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c.call, RpcCall::Send { .. }))
            .map(|c| c.at)
            .collect()
    }

    pub async fn send_count(&self) -> usize {
        self.send_times().await.len()
    }

    pub async fn poll_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c.call, RpcCall::GetTransaction { .. }))
            .count()
    }

    async fn record(&self, call: RpcCall) {
        self.calls.lock().await.push(RecordedCall {
            call,
            at: Instant::now(),
        });
    }
}

impl Default for ScriptedRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SorobanRpc for ScriptedRpc {
    async fn get_account(&self, id: &AccountId) -> RpcResult<Account> {
        self.record(RpcCall::GetAccount).await;
        match *self.account_sequence.lock().await {
            Some(sequence) => Ok(Account::new(id.clone(), sequence)),
            None => Err(RpcError::AccountNotFound {
                account: Account::new(id.clone(), 0).address(),
            }),
        }
    }

    async fn simulate_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> RpcResult<SimulationOutcome> {
        let tx = envelope_tx(envelope);
        self.record(RpcCall::Simulate {
            sequence: tx.seq_num.0,
            fee: tx.fee,
        })
        .await;
        self.simulations
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| RpcError::malformed("simulateTransaction", "no scripted simulation"))
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> RpcResult<SendTransactionResponse> {
        let tx = envelope_tx(envelope);
        self.record(RpcCall::Send {
            sequence: tx.seq_num.0,
            fee: tx.fee,
            envelope: envelope.clone(),
        })
        .await;
        let response = self
            .sends
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| send_response(SendStatus::Pending));
        if response.status == SendStatus::Pending {
            if let Some(sequence) = self.account_sequence.lock().await.as_mut() {
                *sequence += 1;
            }
        }
        Ok(response)
    }

    async fn get_transaction(&self, hash: &str) -> RpcResult<GetTransactionResponse> {
        self.record(RpcCall::GetTransaction {
            hash: hash.to_string(),
        })
        .await;
        Ok(self
            .transactions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| GetTransactionResponse::success(None, 1)))
    }
}

fn envelope_tx(envelope: &TransactionEnvelope) -> Transaction {
    match envelope {
        TransactionEnvelope::Tx(v1) => v1.tx.clone(),
        other => panic!("unexpected envelope type {:?}", other.discriminant()),
    }
}

/// Real ed25519 signer that records every envelope it was asked to sign
#[derive(Clone)]
pub struct RecordingSigner {
    inner: Arc<KeypairSigner>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(KeypairSigner::new([7u8; 32], TEST_PASSPHRASE)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Account controlled by this signer at `sequence`
    pub fn account(&self, sequence: i64) -> Account {
        Account::from_ed25519(self.inner.public_key(), sequence)
    }

    pub async fn sign_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

impl Default for RecordingSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionSigner for RecordingSigner {
    async fn sign(&self, envelope_xdr: &str) -> Result<String, SignerError> {
        self.requests.lock().await.push(envelope_xdr.to_string());
        self.inner.sign(envelope_xdr).await
    }
}

/// Signer that always refuses
#[derive(Debug, Clone, Default)]
pub struct FailingSigner;

#[async_trait]
impl TransactionSigner for FailingSigner {
    async fn sign(&self, _envelope_xdr: &str) -> Result<String, SignerError> {
        Err(SignerError::Rejected("declined by test signer".to_string()))
    }
}

// ---------------------------------------------------------------------------
// XDR fixtures
// ---------------------------------------------------------------------------

pub fn contract_code_key(seed: u8) -> LedgerKey {
    LedgerKey::ContractCode(LedgerKeyContractCode {
        hash: Hash([seed; 32]),
    })
}

pub fn transaction_data(
    read_only: Vec<LedgerKey>,
    read_write: Vec<LedgerKey>,
    resource_fee: i64,
) -> SorobanTransactionData {
    SorobanTransactionData {
        ext: SorobanTransactionDataExt::V0,
        resources: SorobanResources {
            footprint: LedgerFootprint {
                read_only: read_only.try_into().unwrap_or_default(),
                read_write: read_write.try_into().unwrap_or_default(),
            },
            instructions: 1_000_000,
            disk_read_bytes: 1_024,
            write_bytes: 512,
        },
        resource_fee,
    }
}

/// `InvokeHostFunction(UploadContractWasm)` with no auth entries
pub fn upload_wasm_op() -> Operation {
    Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function: HostFunction::UploadContractWasm(
                vec![0x00, 0x61, 0x73, 0x6d].try_into().unwrap_or_default(),
            ),
            auth: Default::default(),
        }),
    }
}

pub fn success_outcome(return_value: Option<ScVal>, min_resource_fee: i64) -> SimulationOutcome {
    SimulationOutcome::Success(SimulationSuccess {
        return_value,
        auth: Vec::new(),
        transaction_data: transaction_data(
            vec![contract_code_key(1)],
            vec![contract_code_key(2)],
            min_resource_fee,
        ),
        min_resource_fee,
        latest_ledger: 100,
    })
}

pub fn restore_outcome(min_resource_fee: i64) -> SimulationOutcome {
    SimulationOutcome::RestoreRequired {
        preamble: RestorePreamble {
            min_resource_fee,
            transaction_data: transaction_data(Vec::new(), vec![contract_code_key(9)], min_resource_fee),
        },
        return_value: None,
    }
}

pub fn error_outcome(message: &str, diagnostic_events: Vec<String>) -> SimulationOutcome {
    SimulationOutcome::Error(SimulationFailure {
        message: message.to_string(),
        diagnostic_events,
    })
}

pub fn send_response(status: SendStatus) -> SendTransactionResponse {
    SendTransactionResponse {
        status,
        hash: String::new(),
        error_result_xdr: None,
        diagnostic_events: Vec::new(),
        latest_ledger: 100,
    }
}

/// Transaction inside a V1 envelope
pub fn tx_of(envelope: &TransactionEnvelope) -> Transaction {
    envelope_tx(envelope)
}

/// Soroban data carried by a transaction, if any
pub fn soroban_data_of(tx: &Transaction) -> Option<&SorobanTransactionData> {
    match &tx.ext {
        TransactionExt::V1(data) => Some(data),
        TransactionExt::V0 => None,
    }
}
