//! Footprint assembly
//!
//! Merges the resource data of a successful simulation into the transaction
//! that was simulated. Pure: no I/O, the input transaction is consumed and a
//! new [`AssembledTransaction`] is returned.

use stellar_xdr::curr::{LedgerKey, OperationBody, Transaction, TransactionExt, VecM};

use super::builder::AssembledTransaction;
use super::errors::{SubmissionError, SubmissionResult};
use crate::rpc::SimulationSuccess;

/// Finalize fee and footprint of `tx` from a successful simulation
///
/// `extra_keys` are appended to the read-write footprint in order, after the
/// simulated entries. Duplicates are kept.
pub fn assemble(
    mut tx: Transaction,
    simulation: &SimulationSuccess,
    extra_keys: &[LedgerKey],
) -> SubmissionResult<AssembledTransaction> {
    let mut data = simulation.transaction_data.clone();

    if !extra_keys.is_empty() {
        let mut read_write: Vec<LedgerKey> = data.resources.footprint.read_write.to_vec();
        read_write.extend_from_slice(extra_keys);
        data.resources.footprint.read_write = read_write
            .try_into()
            .map_err(|_| SubmissionError::xdr("read-write footprint too large"))?;
    }

    let resource_fee = u32::try_from(simulation.min_resource_fee.max(0)).unwrap_or(u32::MAX);
    tx.fee = tx.fee.saturating_add(resource_fee);

    if !simulation.auth.is_empty() {
        let mut operations = tx.operations.to_vec();
        for op in operations.iter_mut() {
            if let OperationBody::InvokeHostFunction(invoke) = &mut op.body {
                if invoke.auth.is_empty() {
                    invoke.auth = VecM::try_from(simulation.auth.clone())
                        .map_err(|_| SubmissionError::xdr("too many auth entries"))?;
                }
            }
        }
        tx.operations = operations
            .try_into()
            .map_err(|_| SubmissionError::xdr("too many operations"))?;
    }

    tx.ext = TransactionExt::V1(data);
    Ok(AssembledTransaction::new(tx))
}
