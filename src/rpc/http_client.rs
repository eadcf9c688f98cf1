use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stellar_xdr::curr::{AccountId, LedgerKey, LedgerKeyAccount, Limits, TransactionEnvelope, WriteXdr};
use tracing::{debug, trace};

use super::rpc_errors::{RpcError, RpcResult};
use super::types::{GetTransactionResponse, SendTransactionResponse, SimulationOutcome};
use super::wire::{
    account_sequence, GetLedgerEntriesResult, GetTransactionResult, HashParam, JsonRpcRequest,
    JsonRpcResponse, KeysParam, SendTransactionResult, SimulateTransactionResult, TransactionParam,
};
use super::SorobanRpc;
use crate::config::RpcConfig;
use crate::tx_builder::Account;

/// JSON-RPC 2.0 client for a Soroban RPC server
pub struct HttpRpcClient {
    client: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(config: &RpcConfig) -> RpcResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| RpcError::Transport {
                endpoint: config.url.clone(),
                message: format!("invalid header name {}: {}", name, e),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| RpcError::Transport {
                endpoint: config.url.clone(),
                message: format!("invalid header value: {}", e),
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| RpcError::Transport {
                endpoint: config.url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.url.clone(),
            timeout_ms: config.request_timeout_ms,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<P, R>(&self, method: &str, params: P) -> RpcResult<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::HttpStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RpcError::malformed(method, e.to_string()))?;

        trace!(
            method = method,
            id = id,
            latency_ms = start.elapsed().as_millis() as u64,
            "RPC call completed"
        );

        if let Some(error) = body.error {
            return Err(RpcError::RpcResponse {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| RpcError::malformed(method, "response has neither result nor error"))
    }

    fn transport_error(&self, err: reqwest::Error) -> RpcError {
        if err.is_timeout() {
            RpcError::Timeout {
                endpoint: self.endpoint.clone(),
                timeout_ms: self.timeout_ms,
            }
        } else {
            RpcError::Transport {
                endpoint: self.endpoint.clone(),
                message: err.to_string(),
            }
        }
    }

    fn encode_envelope(envelope: &TransactionEnvelope) -> RpcResult<String> {
        envelope
            .to_xdr_base64(Limits::none())
            .map_err(|e| RpcError::xdr("transaction", e))
    }
}

#[async_trait]
impl SorobanRpc for HttpRpcClient {
    async fn get_account(&self, id: &AccountId) -> RpcResult<Account> {
        let key = LedgerKey::Account(LedgerKeyAccount {
            account_id: id.clone(),
        })
        .to_xdr_base64(Limits::none())
        .map_err(|e| RpcError::xdr("keys[0]", e))?;

        let result: GetLedgerEntriesResult = self
            .call("getLedgerEntries", KeysParam { keys: vec![key] })
            .await?;

        let account = Account::new(id.clone(), 0);
        let entry = result
            .entries
            .and_then(|entries| entries.into_iter().next())
            .ok_or_else(|| RpcError::AccountNotFound {
                account: account.address(),
            })?;
        let sequence = account_sequence(&entry.xdr)?;
        debug!(account = %account.address(), sequence = sequence, "Fetched account");
        Ok(Account::new(id.clone(), sequence))
    }

    async fn simulate_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> RpcResult<SimulationOutcome> {
        let raw: SimulateTransactionResult = self
            .call(
                "simulateTransaction",
                TransactionParam {
                    transaction: Self::encode_envelope(envelope)?,
                },
            )
            .await?;
        raw.classify()
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> RpcResult<SendTransactionResponse> {
        let raw: SendTransactionResult = self
            .call(
                "sendTransaction",
                TransactionParam {
                    transaction: Self::encode_envelope(envelope)?,
                },
            )
            .await?;
        Ok(raw.into())
    }

    async fn get_transaction(&self, hash: &str) -> RpcResult<GetTransactionResponse> {
        let raw: GetTransactionResult = self.call("getTransaction", HashParam { hash }).await?;
        raw.into_response()
    }
}
