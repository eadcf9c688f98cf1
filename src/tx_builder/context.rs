//! Per-submission context: account state, builder options and signer
//!
//! [`TxParams`] is created once per logical submission by the caller and
//! passed by reference into every pipeline call. The account it carries is a
//! plain value: building a transaction reads `sequence + 1` but never mutates
//! the account, and consuming a sequence number is the explicit
//! [`Account::consume_sequence`] step that returns a new value.
//!
//! ## Concurrency
//! The engine assumes exclusive use of an account identity for the duration
//! of a submission, including any nested restoration. Callers must serialize
//! submissions per account.

use std::fmt;
use std::sync::Arc;

use stellar_xdr::curr::{AccountId, MuxedAccount, PublicKey, TimeBounds, TimePoint, Uint256};

use crate::signer::TransactionSigner;

/// Source account identity plus its current sequence number
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    sequence: i64,
}

impl Account {
    pub fn new(id: AccountId, sequence: i64) -> Self {
        Self { id, sequence }
    }

    /// Build an account from raw ed25519 public key bytes
    pub fn from_ed25519(public_key: [u8; 32], sequence: i64) -> Self {
        Self::new(
            AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(public_key))),
            sequence,
        )
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Sequence number the next transaction from this account must carry
    pub fn next_sequence(&self) -> i64 {
        self.sequence + 1
    }

    /// The account after one transaction consumed a sequence number
    #[must_use]
    pub fn consume_sequence(&self) -> Account {
        Self {
            id: self.id.clone(),
            sequence: self.next_sequence(),
        }
    }

    /// Raw ed25519 public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        match &self.id.0 {
            PublicKey::PublicKeyTypeEd25519(Uint256(bytes)) => *bytes,
        }
    }

    /// Muxed form used as a transaction source
    pub fn muxed(&self) -> MuxedAccount {
        MuxedAccount::Ed25519(Uint256(self.public_key()))
    }

    /// `G...` strkey address
    pub fn address(&self) -> String {
        stellar_strkey::ed25519::PublicKey(self.public_key()).to_string()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Options applied to every transaction built for a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBuilderOptions {
    /// Base (inclusion) fee in stroops
    pub fee: u32,
    /// Optional validity window; `(0, 0)` means unbounded
    pub time_bounds: Option<TimeBounds>,
    /// Network passphrase the transaction is bound to
    pub network_passphrase: String,
}

impl TxBuilderOptions {
    pub fn new(fee: u32, network_passphrase: impl Into<String>) -> Self {
        Self {
            fee,
            time_bounds: Some(unbounded_time_bounds()),
            network_passphrase: network_passphrase.into(),
        }
    }

    pub fn with_time_bounds(mut self, min_time: u64, max_time: u64) -> Self {
        self.time_bounds = Some(TimeBounds {
            min_time: TimePoint(min_time),
            max_time: TimePoint(max_time),
        });
        self
    }
}

/// Time bounds that never expire
pub fn unbounded_time_bounds() -> TimeBounds {
    TimeBounds {
        min_time: TimePoint(0),
        max_time: TimePoint(0),
    }
}

/// Everything a pipeline run needs from its caller
///
/// The signer is injected here rather than captured ambiently so that each
/// identity carries its own signing capability.
#[derive(Clone)]
pub struct TxParams {
    pub account: Account,
    pub signer: Arc<dyn TransactionSigner>,
    pub options: TxBuilderOptions,
}

impl TxParams {
    pub fn new(
        account: Account,
        signer: Arc<dyn TransactionSigner>,
        options: TxBuilderOptions,
    ) -> Self {
        Self {
            account,
            signer,
            options,
        }
    }

    /// Replace the tracked account, e.g. with the one returned by a submission
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.account = account;
        self
    }
}

impl fmt::Debug for TxParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxParams")
            .field("account", &self.account)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
