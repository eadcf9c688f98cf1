//! Submission engine
//!
//! Entry points for callers:
//! - [`SubmissionEngine::invoke_soroban_operation`]: simulate, restore if
//!   needed, assemble, sign, send, confirm, decode
//! - [`SubmissionEngine::invoke_classic_op`]: build, sign, send, confirm
//! - [`SubmissionEngine::simulate_operation`] and
//!   [`SubmissionEngine::simulate_operation_result`]: read-only simulation
//!
//! An `Error` simulation never reaches the signer, and a restoration is
//! followed by a fresh simulation of the original operation.

use std::sync::Arc;

use stellar_xdr::curr::{LedgerKey, Operation, ScVal, SorobanTransactionData};

use crate::config::{EngineConfig, SubmitterConfig};
use crate::decode::decode_result;
use crate::metrics::metrics;
use crate::rpc::{HttpRpcClient, SimulationOutcome, SorobanRpc};
use crate::structured_logging::SubmissionLogger;
use crate::submitter::Submitter;
use crate::tx_builder::{
    assemble, sign_transaction, unbounded_time_bounds, Restorer, Simulated, Simulator,
    SubmissionError, SubmissionResult, SubmitResult, TxBuilder, TxParams,
};

/// Optional inputs of [`SubmissionEngine::invoke_soroban_operation`]
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Resource data set on the transaction before simulation
    pub soroban_data: Option<SorobanTransactionData>,
    /// Keys appended to the simulated read-write footprint
    pub extra_footprint: Vec<LedgerKey>,
}

impl InvokeOptions {
    pub fn with_soroban_data(mut self, data: SorobanTransactionData) -> Self {
        self.soroban_data = Some(data);
        self
    }

    pub fn with_extra_footprint(mut self, keys: Vec<LedgerKey>) -> Self {
        self.extra_footprint = keys;
        self
    }
}

/// Two-phase transaction submission against a Soroban RPC server
#[derive(Clone)]
pub struct SubmissionEngine {
    rpc: Arc<dyn SorobanRpc>,
    simulator: Simulator,
    restorer: Restorer,
    submitter: Submitter,
}

impl SubmissionEngine {
    pub fn new(rpc: Arc<dyn SorobanRpc>, config: SubmitterConfig) -> Self {
        let submitter = Submitter::new(rpc.clone(), config);
        Self {
            simulator: Simulator::new(rpc.clone()),
            restorer: Restorer::new(rpc.clone(), submitter.clone()),
            submitter,
            rpc,
        }
    }

    /// Engine backed by an [`HttpRpcClient`] for `config.rpc`
    pub fn from_config(config: &EngineConfig) -> SubmissionResult<Self> {
        config
            .validate()
            .map_err(|e| SubmissionError::configuration(e.to_string()))?;
        let client = HttpRpcClient::new(&config.rpc)?;
        Ok(Self::new(Arc::new(client), config.submitter.clone()))
    }

    pub fn rpc(&self) -> &Arc<dyn SorobanRpc> {
        &self.rpc
    }

    pub fn submitter_config(&self) -> &SubmitterConfig {
        self.submitter.config()
    }

    /// Simulate `operation` from `params.account` without submitting
    pub async fn simulate_operation(
        &self,
        operation: &Operation,
        params: &TxParams,
    ) -> SubmissionResult<SimulationOutcome> {
        let logger = SubmissionLogger::new("simulate_operation");
        let simulated = self
            .simulator
            .simulate(operation, &params.account, &params.options, None, &logger)
            .await?;
        Ok(simulated.outcome)
    }

    /// Simulate `operation` and parse its simulated return value
    ///
    /// A pending restoration does not block the read.
    pub async fn simulate_operation_result<T, F>(
        &self,
        operation: &Operation,
        parser: F,
        params: &TxParams,
    ) -> SubmissionResult<T>
    where
        F: FnOnce(&ScVal) -> anyhow::Result<T>,
    {
        let logger = SubmissionLogger::new("simulate_operation_result");
        let simulated = self
            .simulator
            .simulate(operation, &params.account, &params.options, None, &logger)
            .await?;

        match simulated.outcome {
            SimulationOutcome::Error(failure) => Err(Simulated::simulation_error(
                &simulated.transaction,
                failure,
                &logger,
            )),
            outcome => match outcome.return_value() {
                Some(value) => parser(value).map_err(SubmissionError::Decode),
                None => Err(SubmissionError::invalid_simulation(
                    "simulation returned no result",
                )),
            },
        }
    }

    /// Submit a contract operation through the full pipeline
    pub async fn invoke_soroban_operation<T, F>(
        &self,
        operation: &Operation,
        parser: F,
        params: &TxParams,
        options: InvokeOptions,
    ) -> SubmissionResult<SubmitResult<T>>
    where
        F: FnOnce(&ScVal) -> anyhow::Result<T>,
    {
        let logger = SubmissionLogger::new("invoke_soroban_operation");
        metrics().submissions_total.inc();

        let result = self
            .invoke_soroban_inner(operation, parser, params, &options, &logger)
            .await;
        record_outcome(&result, &logger);
        result
    }

    async fn invoke_soroban_inner<T, F>(
        &self,
        operation: &Operation,
        parser: F,
        params: &TxParams,
        options: &InvokeOptions,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<SubmitResult<T>>
    where
        F: FnOnce(&ScVal) -> anyhow::Result<T>,
    {
        let soroban_data = options.soroban_data.as_ref();
        let mut account = self.rpc.get_account(params.account.id()).await?;
        let mut simulated = self
            .simulator
            .simulate(operation, &account, &params.options, soroban_data, logger)
            .await?;

        let preamble = match &simulated.outcome {
            SimulationOutcome::RestoreRequired { preamble, .. } => Some(preamble.clone()),
            _ => None,
        };
        let restored = preamble.is_some();
        if let Some(preamble) = preamble {
            account = self.restorer.restore(&preamble, params, logger).await?;
            simulated = self
                .simulator
                .simulate(operation, &account, &params.options, soroban_data, logger)
                .await?;
        }

        let success = match simulated.outcome {
            SimulationOutcome::Success(success) => success,
            SimulationOutcome::Error(failure) => {
                return Err(Simulated::simulation_error(
                    &simulated.transaction,
                    failure,
                    logger,
                ));
            }
            SimulationOutcome::RestoreRequired { .. } => {
                return Err(SubmissionError::invalid_simulation(
                    "restoration still required after restoring footprint",
                ));
            }
        };

        let assembled = assemble(simulated.transaction, &success, &options.extra_footprint)?;
        let signed = sign_transaction(
            params.signer.as_ref(),
            assembled.into_transaction(),
            &params.options.network_passphrase,
        )
        .await?;
        logger.log_tx_hash(signed.hash());

        let confirmed = self.submitter.submit(&signed, logger).await?;
        let value = decode_result(confirmed.return_value.as_ref(), parser)?;

        Ok(SubmitResult {
            hash: confirmed.hash,
            value,
            account: account.consume_sequence(),
            restored,
            ledger: confirmed.ledger,
        })
    }

    /// Submit an operation that needs no resource simulation
    ///
    /// The transaction never expires. Send and confirmation failures are
    /// logged and reported as [`SubmissionError::ClassicSubmission`].
    pub async fn invoke_classic_op(
        &self,
        operation: &Operation,
        params: &TxParams,
    ) -> SubmissionResult<SubmitResult<()>> {
        let logger = SubmissionLogger::new("invoke_classic_op");
        metrics().submissions_total.inc();

        let result = self.invoke_classic_inner(operation, params, &logger).await;
        record_outcome(&result, &logger);
        result
    }

    async fn invoke_classic_inner(
        &self,
        operation: &Operation,
        params: &TxParams,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<SubmitResult<()>> {
        let account = self.rpc.get_account(params.account.id()).await?;
        let tx = TxBuilder::new(&account, &params.options)
            .time_bounds(unbounded_time_bounds())
            .add_operation(operation.clone())
            .build()?;
        let signed = sign_transaction(
            params.signer.as_ref(),
            tx,
            &params.options.network_passphrase,
        )
        .await?;
        logger.log_tx_hash(signed.hash());

        let confirmed = self.submitter.submit(&signed, logger).await.map_err(|e| {
            logger.error(&e.to_string());
            SubmissionError::ClassicSubmission
        })?;

        Ok(SubmitResult {
            hash: confirmed.hash,
            value: None,
            account: account.consume_sequence(),
            restored: false,
            ledger: confirmed.ledger,
        })
    }
}

fn record_outcome<T>(result: &SubmissionResult<T>, logger: &SubmissionLogger) {
    match result {
        Ok(_) => metrics().submissions_success.inc(),
        Err(e) => {
            metrics().submissions_failed.inc();
            tracing::warn!(
                submission_id = %logger.submission_id(),
                operation = logger.operation(),
                category = e.category(),
                error = %e,
                "Submission failed"
            );
        }
    }
}
