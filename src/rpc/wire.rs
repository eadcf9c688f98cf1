//! JSON shapes of the Soroban RPC methods, and their conversion into
//! boundary types

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{
    LedgerEntryData, Limits, ReadXdr, ScVal, SorobanAuthorizationEntry, SorobanTransactionData,
    TransactionMeta,
};

use super::rpc_errors::{RpcError, RpcResult};
use super::types::{
    GetTransactionResponse, RestorePreamble, SendStatus, SendTransactionResponse,
    SimulationFailure, SimulationOutcome, SimulationSuccess, TransactionStatus,
};

#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse<R> {
    pub result: Option<R>,
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransactionParam {
    pub transaction: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HashParam<'a> {
    pub hash: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeysParam {
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetLedgerEntriesResult {
    #[serde(default)]
    pub entries: Option<Vec<LedgerEntryResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LedgerEntryResult {
    pub xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SimulateTransactionResult {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub transaction_data: Option<String>,
    #[serde(default)]
    pub min_resource_fee: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
    #[serde(default)]
    pub results: Option<Vec<SimulateHostFunctionResult>>,
    #[serde(default)]
    pub restore_preamble: Option<RestorePreambleWire>,
    #[serde(default)]
    pub latest_ledger: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimulateHostFunctionResult {
    #[serde(default)]
    pub auth: Vec<String>,
    pub xdr: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RestorePreambleWire {
    pub transaction_data: String,
    pub min_resource_fee: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendTransactionResult {
    pub status: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub error_result_xdr: Option<String>,
    #[serde(default)]
    pub diagnostic_events_xdr: Option<Vec<String>>,
    #[serde(default)]
    pub latest_ledger: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetTransactionResult {
    pub status: String,
    #[serde(default)]
    pub result_xdr: Option<String>,
    #[serde(default)]
    pub result_meta_xdr: Option<String>,
    #[serde(default)]
    pub diagnostic_events_xdr: Option<Vec<String>>,
    #[serde(default)]
    pub ledger: Option<u32>,
}

fn parse_fee(method: &str, fee: &str) -> RpcResult<i64> {
    fee.parse::<i64>()
        .map_err(|e| RpcError::malformed(method, format!("minResourceFee {:?}: {}", fee, e)))
}

fn decode_transaction_data(field: &str, b64: &str) -> RpcResult<SorobanTransactionData> {
    SorobanTransactionData::from_xdr_base64(b64, Limits::none()).map_err(|e| RpcError::xdr(field, e))
}

impl SimulateTransactionResult {
    /// Classify the raw response into exactly one outcome tag
    pub fn classify(self) -> RpcResult<SimulationOutcome> {
        const METHOD: &str = "simulateTransaction";

        if let Some(message) = self.error {
            return Ok(SimulationOutcome::Error(SimulationFailure {
                message,
                diagnostic_events: self.events.unwrap_or_default(),
            }));
        }

        let first = self.results.and_then(|results| results.into_iter().next());
        let (return_value, auth) = match first {
            Some(result) => {
                let value = ScVal::from_xdr_base64(&result.xdr, Limits::none())
                    .map_err(|e| RpcError::xdr("results[0].xdr", e))?;
                let auth = result
                    .auth
                    .iter()
                    .map(|entry| {
                        SorobanAuthorizationEntry::from_xdr_base64(entry, Limits::none())
                            .map_err(|e| RpcError::xdr("results[0].auth", e))
                    })
                    .collect::<RpcResult<Vec<_>>>()?;
                (Some(value), auth)
            }
            None => (None, Vec::new()),
        };

        if let Some(preamble) = self.restore_preamble {
            return Ok(SimulationOutcome::RestoreRequired {
                preamble: RestorePreamble {
                    min_resource_fee: parse_fee(METHOD, &preamble.min_resource_fee)?,
                    transaction_data: decode_transaction_data(
                        "restorePreamble.transactionData",
                        &preamble.transaction_data,
                    )?,
                },
                return_value,
            });
        }

        let transaction_data = self
            .transaction_data
            .ok_or_else(|| RpcError::malformed(METHOD, "missing transactionData"))?;
        let min_resource_fee = self
            .min_resource_fee
            .ok_or_else(|| RpcError::malformed(METHOD, "missing minResourceFee"))?;

        Ok(SimulationOutcome::Success(SimulationSuccess {
            return_value,
            auth,
            transaction_data: decode_transaction_data("transactionData", &transaction_data)?,
            min_resource_fee: parse_fee(METHOD, &min_resource_fee)?,
            latest_ledger: self.latest_ledger,
        }))
    }
}

impl From<SendTransactionResult> for SendTransactionResponse {
    fn from(raw: SendTransactionResult) -> Self {
        Self {
            status: SendStatus::from_wire(&raw.status),
            hash: raw.hash,
            error_result_xdr: raw.error_result_xdr,
            diagnostic_events: raw.diagnostic_events_xdr.unwrap_or_default(),
            latest_ledger: raw.latest_ledger,
        }
    }
}

/// Return value recorded in the Soroban part of a transaction meta
pub(crate) fn return_value_from_meta(meta: &TransactionMeta) -> Option<ScVal> {
    match meta {
        TransactionMeta::V3(v3) => v3.soroban_meta.as_ref().map(|m| m.return_value.clone()),
        TransactionMeta::V4(v4) => v4
            .soroban_meta
            .as_ref()
            .and_then(|m| m.return_value.clone()),
        _ => None,
    }
}

impl GetTransactionResult {
    pub fn into_response(self) -> RpcResult<GetTransactionResponse> {
        let status = TransactionStatus::from_wire(&self.status);
        let return_value = match (&status, &self.result_meta_xdr) {
            (TransactionStatus::Success, Some(meta_xdr)) => {
                let meta = TransactionMeta::from_xdr_base64(meta_xdr, Limits::none())
                    .map_err(|e| RpcError::xdr("resultMetaXdr", e))?;
                return_value_from_meta(&meta)
            }
            _ => None,
        };

        Ok(GetTransactionResponse {
            status,
            return_value,
            result_xdr: self.result_xdr,
            diagnostic_events: self.diagnostic_events_xdr.unwrap_or_default(),
            ledger: self.ledger,
        })
    }
}

/// Sequence number from a base64 `LedgerEntryData::Account`
pub(crate) fn account_sequence(entry_xdr: &str) -> RpcResult<i64> {
    match LedgerEntryData::from_xdr_base64(entry_xdr, Limits::none())
        .map_err(|e| RpcError::xdr("entries[0].xdr", e))?
    {
        LedgerEntryData::Account(account) => Ok(account.seq_num.0),
        other => Err(RpcError::malformed(
            "getLedgerEntries",
            format!("expected account entry, got {}", other.name()),
        )),
    }
}
