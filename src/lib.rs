//! Soroban transaction submission engine
//!
//! Client-side pipeline for resource-metered Stellar operations:
//! simulate → restore archived state if required → assemble footprint →
//! sign → send with bounded `TRY_AGAIN_LATER` retry → poll for the terminal
//! record → decode the return value. Classic operations skip simulation.
//!
//! The RPC server and the signer are capabilities handed in by the caller
//! ([`rpc::SorobanRpc`], [`signer::TransactionSigner`]).

pub mod config;
pub mod decode;
pub mod engine;
pub mod metrics;
pub mod rpc;
pub mod signer;
pub mod structured_logging;
pub mod submitter;
pub mod tx_builder;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;


pub use config::{ConfigError, EngineConfig, RpcConfig, SubmitterConfig};
pub use engine::{InvokeOptions, SubmissionEngine};
pub use rpc::{HttpRpcClient, SimulationOutcome, SorobanRpc};
pub use signer::{KeypairSigner, SignerError, TransactionSigner};
pub use tx_builder::{
    decode_operation, Account, SubmissionError, SubmissionResult, SubmitResult, TxBuilderOptions,
    TxParams,
};
