//! Transaction pipeline building blocks
//!
//! The submission engine is assembled from focused modules:
//! - **errors**: pipeline error taxonomy
//! - **context**: account state, builder options and per-submission params
//! - **builder**: transaction construction, hashing and envelope helpers
//! - **simulate**: build + simulate a single operation
//! - **restore**: restoration of archived footprint entries
//! - **assemble**: merge simulated resources into the transaction
//! - **output**: result of a completed submission
//!
//! ## Sequence numbers
//! Building a transaction reads `account.sequence + 1` and leaves the
//! account alone. Every submitted transaction, restorations included,
//! consumes exactly one sequence number; the pipeline reports the consumed
//! state back through [`SubmitResult::account`] instead of mutating its input.

pub mod errors;
pub use errors::{SubmissionError, SubmissionResult};

mod assemble;
mod builder;
mod context;
mod output;
mod restore;
mod simulate;

pub use assemble::assemble;
pub use builder::{
    decode_operation, encode_xdr, envelope_hash, network_id, sign_transaction, transaction_hash,
    unsigned_envelope, AssembledTransaction, SignedTransaction, TxBuilder,
};
pub use context::{unbounded_time_bounds, Account, TxBuilderOptions, TxParams};
pub use output::SubmitResult;
pub use restore::Restorer;
pub use simulate::{Simulated, Simulator};
