//! Footprint restoration
//!
//! When a simulation reports archived entries, a dedicated
//! `RestoreFootprint` transaction is built from a freshly fetched account,
//! signed, and submitted to completion. The account returned has the
//! restoration's sequence number consumed; the caller rebuilds the original
//! operation from it.

use std::sync::Arc;

use stellar_xdr::curr::{ExtensionPoint, Operation, OperationBody, RestoreFootprintOp};

use super::builder::{sign_transaction, TxBuilder};
use super::context::{unbounded_time_bounds, Account, TxBuilderOptions, TxParams};
use super::errors::{SubmissionError, SubmissionResult};
use crate::metrics::metrics;
use crate::rpc::{RestorePreamble, SorobanRpc};
use crate::structured_logging::SubmissionLogger;
use crate::submitter::Submitter;

/// Submits restoration transactions
#[derive(Clone)]
pub struct Restorer {
    rpc: Arc<dyn SorobanRpc>,
    submitter: Submitter,
}

impl Restorer {
    pub fn new(rpc: Arc<dyn SorobanRpc>, submitter: Submitter) -> Self {
        Self { rpc, submitter }
    }

    /// Fee of the restoration transaction: resource fee plus the configured margin
    pub fn restore_fee(&self, preamble: &RestorePreamble) -> u32 {
        let resource_fee = u32::try_from(preamble.min_resource_fee.max(0)).unwrap_or(u32::MAX);
        resource_fee.saturating_add(self.submitter.config().restore_fee_margin)
    }

    /// Restore the entries named by `preamble`
    ///
    /// Any failure is wrapped in [`SubmissionError::Restoration`]. A sequence
    /// number consumed by a restoration that later failed is not given back.
    pub async fn restore(
        &self,
        preamble: &RestorePreamble,
        params: &TxParams,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<Account> {
        self.restore_inner(preamble, params, &logger.child("restore"))
            .await
            .map_err(SubmissionError::restoration)
    }

    async fn restore_inner(
        &self,
        preamble: &RestorePreamble,
        params: &TxParams,
        logger: &SubmissionLogger,
    ) -> SubmissionResult<Account> {
        let fee = self.restore_fee(preamble);
        logger.log_restore_start(fee);

        let account = self.rpc.get_account(params.account.id()).await?;
        let options = TxBuilderOptions {
            fee,
            time_bounds: Some(unbounded_time_bounds()),
            network_passphrase: params.options.network_passphrase.clone(),
        };
        let tx = TxBuilder::new(&account, &options)
            .soroban_data(preamble.transaction_data.clone())
            .add_operation(Operation {
                source_account: None,
                body: OperationBody::RestoreFootprint(RestoreFootprintOp {
                    ext: ExtensionPoint::V0,
                }),
            })
            .build()?;

        let signed =
            sign_transaction(params.signer.as_ref(), tx, &options.network_passphrase).await?;
        logger.log_tx_hash(signed.hash());

        self.submitter.submit(&signed, logger).await?;
        metrics().restorations_total.inc();

        let account = account.consume_sequence();
        logger.log_restore_complete(signed.hash(), account.sequence());
        Ok(account)
    }
}
