//! Simulation step
//!
//! Wraps one operation in an unsigned transaction and asks the RPC boundary
//! to dry-run it. The caller's account is only read: the simulated
//! transaction carries `account.next_sequence()` and nothing is consumed.

use std::sync::Arc;

use stellar_xdr::curr::{Operation, SorobanTransactionData, Transaction};

use super::builder::{encode_xdr, unsigned_envelope, TxBuilder};
use super::context::{Account, TxBuilderOptions};
use super::errors::{SubmissionError, SubmissionResult};
use crate::metrics::metrics;
use crate::rpc::{SimulationFailure, SimulationOutcome, SorobanRpc};
use crate::structured_logging::SubmissionLogger;

/// A simulated transaction and its classified outcome
#[derive(Debug, Clone)]
pub struct Simulated {
    pub transaction: Transaction,
    pub outcome: SimulationOutcome,
}

impl Simulated {
    /// Turn an `Error` outcome into a [`SubmissionError::Simulation`]
    ///
    /// Logs the message, the simulated envelope and every diagnostic event.
    pub fn simulation_error(
        transaction: &Transaction,
        failure: SimulationFailure,
        logger: &SubmissionLogger,
    ) -> SubmissionError {
        let envelope_xdr = encode_xdr(&unsigned_envelope(transaction.clone())).unwrap_or_default();
        logger.log_simulation_error(&failure.message, &envelope_xdr, &failure.diagnostic_events);
        metrics().simulation_errors.inc();
        SubmissionError::Simulation {
            message: failure.message,
            diagnostic_events: failure.diagnostic_events,
            envelope_xdr,
        }
    }
}

/// Builds and simulates single-operation transactions
#[derive(Clone)]
pub struct Simulator {
    rpc: Arc<dyn SorobanRpc>,
}

impl Simulator {
    pub fn new(rpc: Arc<dyn SorobanRpc>) -> Self {
        Self { rpc }
    }

    /// Build the unsigned transaction for `operation`
    pub fn build(
        operation: &Operation,
        account: &Account,
        options: &TxBuilderOptions,
        soroban_data: Option<&SorobanTransactionData>,
    ) -> SubmissionResult<Transaction> {
        let mut builder = TxBuilder::new(account, options).add_operation(operation.clone());
        if let Some(data) = soroban_data {
            builder = builder.soroban_data(data.clone());
        }
        builder.build()
    }

    /// Build and simulate against `account`
    pub async fn simulate(
        &self,
        operation: &Operation,
        account: &Account,
        options: &TxBuilderOptions,
        soroban_data: Option<&SorobanTransactionData>,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<Simulated> {
        let transaction = Self::build(operation, account, options, soroban_data)?;
        let outcome = self
            .rpc
            .simulate_transaction(&unsigned_envelope(transaction.clone()))
            .await?;
        logger.log_simulated(outcome.kind(), transaction.seq_num.0);
        Ok(Simulated {
            transaction,
            outcome,
        })
    }
}
