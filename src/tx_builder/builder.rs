//! Transaction construction and envelope helpers
//!
//! [`TxBuilder`] wraps one or more operations in a V1 transaction sourced
//! from an [`Account`]. The resulting transaction carries
//! `account.next_sequence()`; the account itself is left untouched.
//!
//! The remaining helpers deal with the bits of the envelope the pipeline must
//! read or write: base64 encoding, the network-bound hash, and the
//! signed/unsigned envelope wrappers.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Hash, Limits, Memo, Operation, Preconditions, ReadXdr, SequenceNumber,
    SorobanTransactionData, TimeBounds, Transaction, TransactionEnvelope, TransactionExt,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, VecM, WriteXdr,
};

use super::context::{Account, TxBuilderOptions};
use super::errors::{SubmissionError, SubmissionResult};
use crate::signer::{SignerError, TransactionSigner};

/// Builder for a single V1 transaction
#[derive(Debug, Clone)]
pub struct TxBuilder {
    account: Account,
    fee: u32,
    time_bounds: Option<TimeBounds>,
    soroban_data: Option<SorobanTransactionData>,
    operations: Vec<Operation>,
}

impl TxBuilder {
    pub fn new(account: &Account, options: &TxBuilderOptions) -> Self {
        Self {
            account: account.clone(),
            fee: options.fee,
            time_bounds: options.time_bounds.clone(),
            soroban_data: None,
            operations: Vec::new(),
        }
    }

    pub fn fee(mut self, fee: u32) -> Self {
        self.fee = fee;
        self
    }

    pub fn time_bounds(mut self, time_bounds: TimeBounds) -> Self {
        self.time_bounds = Some(time_bounds);
        self
    }

    pub fn soroban_data(mut self, data: SorobanTransactionData) -> Self {
        self.soroban_data = Some(data);
        self
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn build(self) -> SubmissionResult<Transaction> {
        if self.operations.is_empty() {
            return Err(SubmissionError::configuration(
                "transaction requires at least one operation",
            ));
        }
        let operations: VecM<Operation, 100> = self
            .operations
            .try_into()
            .map_err(|_| SubmissionError::configuration("too many operations (max 100)"))?;

        Ok(Transaction {
            source_account: self.account.muxed(),
            fee: self.fee,
            seq_num: SequenceNumber(self.account.next_sequence()),
            cond: match self.time_bounds {
                Some(tb) => Preconditions::Time(tb),
                None => Preconditions::None,
            },
            memo: Memo::None,
            operations,
            ext: match self.soroban_data {
                Some(data) => TransactionExt::V1(data),
                None => TransactionExt::V0,
            },
        })
    }
}

/// Network id: sha256 of the passphrase
pub fn network_id(passphrase: &str) -> Hash {
    Hash(Sha256::digest(passphrase.as_bytes()).into())
}

/// Hash a transaction for the given network
pub fn transaction_hash(tx: &Transaction, passphrase: &str) -> SubmissionResult<[u8; 32]> {
    let payload = TransactionSignaturePayload {
        network_id: network_id(passphrase),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload
        .to_xdr(Limits::none())
        .map_err(SubmissionError::xdr)?;
    Ok(Sha256::digest(&bytes).into())
}

/// Hash of the transaction inside a V1 or fee-bump envelope
pub fn envelope_hash(envelope: &TransactionEnvelope, passphrase: &str) -> SubmissionResult<[u8; 32]> {
    let tagged = match envelope {
        TransactionEnvelope::Tx(env) => TransactionSignaturePayloadTaggedTransaction::Tx(env.tx.clone()),
        TransactionEnvelope::TxFeeBump(env) => {
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(env.tx.clone())
        }
        TransactionEnvelope::TxV0(_) => {
            return Err(SubmissionError::xdr("V0 envelopes are not supported"));
        }
    };
    let payload = TransactionSignaturePayload {
        network_id: network_id(passphrase),
        tagged_transaction: tagged,
    };
    let bytes = payload
        .to_xdr(Limits::none())
        .map_err(SubmissionError::xdr)?;
    Ok(Sha256::digest(&bytes).into())
}

/// Wrap a transaction in an envelope with no signatures
pub fn unsigned_envelope(tx: Transaction) -> TransactionEnvelope {
    TransactionEnvelope::Tx(TransactionV1Envelope {
        tx,
        signatures: VecM::default(),
    })
}

/// Decode a base64 operation as handed over by callers
pub fn decode_operation(operation_xdr: &str) -> SubmissionResult<Operation> {
    Operation::from_xdr_base64(operation_xdr, Limits::none()).map_err(SubmissionError::xdr)
}

/// Base64 form of any XDR value, for logging and the RPC wire
pub fn encode_xdr<T: WriteXdr>(value: &T) -> SubmissionResult<String> {
    value
        .to_xdr_base64(Limits::none())
        .map_err(SubmissionError::xdr)
}

/// A transaction whose fee and resource footprint have been finalized
///
/// Produced only by the footprint assembler from a successful simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTransaction {
    tx: Transaction,
}

impl AssembledTransaction {
    pub(crate) fn new(tx: Transaction) -> Self {
        Self { tx }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }
}

/// A signed envelope plus its hex hash, ready to send
///
/// Every send retry reuses this same value.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    envelope: TransactionEnvelope,
    hash: String,
}

impl SignedTransaction {
    /// Decode the signer's output and bind it to the expected transaction hash
    ///
    /// The signer may only add signatures; an envelope whose hash differs from
    /// `expected_hash` is rejected.
    pub fn from_signed_xdr(
        signed_xdr: &str,
        passphrase: &str,
        expected_hash: &[u8; 32],
    ) -> SubmissionResult<Self> {
        let envelope = TransactionEnvelope::from_xdr_base64(signed_xdr, Limits::none())
            .map_err(|e| SubmissionError::Signing(SignerError::InvalidEnvelope(e.to_string())))?;
        let hash = envelope_hash(&envelope, passphrase)?;
        if &hash != expected_hash {
            return Err(SubmissionError::Signing(SignerError::InvalidEnvelope(format!(
                "signed envelope hash {} does not match {}",
                hex::encode(hash),
                hex::encode(expected_hash)
            ))));
        }
        Ok(Self {
            envelope,
            hash: hex::encode(hash),
        })
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn to_xdr_base64(&self) -> SubmissionResult<String> {
        encode_xdr(&self.envelope)
    }
}

/// Hand `tx` to the signer and bind the result to the transaction's hash
///
/// The signer is called exactly once; a failure is returned as-is.
pub async fn sign_transaction(
    signer: &dyn TransactionSigner,
    tx: Transaction,
    passphrase: &str,
) -> SubmissionResult<SignedTransaction> {
    let expected = transaction_hash(&tx, passphrase)?;
    let unsigned_xdr = encode_xdr(&unsigned_envelope(tx))?;
    let signed_xdr = signer.sign(&unsigned_xdr).await?;
    SignedTransaction::from_signed_xdr(&signed_xdr, passphrase, &expected)
}
