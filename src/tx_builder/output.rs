//! Result of a completed submission

use super::context::Account;

/// Outcome of a successful pipeline run
///
/// `account` is the source account with the submitted transaction's sequence
/// number consumed. Feed it back through [`TxParams::with_account`] for the
/// next submission from the same identity.
///
/// [`TxParams::with_account`]: super::TxParams::with_account
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResult<T> {
    /// Hex hash of the submitted transaction
    pub hash: String,
    /// Decoded return value; `None` when the record carried no value
    pub value: Option<T>,
    pub account: Account,
    /// Whether a restoration transaction was submitted first
    pub restored: bool,
    /// Ledger that included the transaction, if reported
    pub ledger: Option<u32>,
}

impl<T> SubmitResult<T> {
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Transform the decoded value, keeping the submission metadata
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SubmitResult<U> {
        SubmitResult {
            hash: self.hash,
            value: self.value.map(f),
            account: self.account,
            restored: self.restored,
            ledger: self.ledger,
        }
    }
}
