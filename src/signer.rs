//! Signer capability
//!
//! The pipeline never holds keys. It hands an unsigned base64 envelope to a
//! [`TransactionSigner`] and gets a signed base64 envelope back. The call may
//! suspend for as long as the backing device or custody service needs; the
//! pipeline never retries it, and any failure is fatal for the submission.
//!
//! [`KeypairSigner`] is the local implementation for plain ed25519 secret
//! seeds.

use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use stellar_xdr::curr::{
    DecoratedSignature, Limits, ReadXdr, Signature, SignatureHint, TransactionEnvelope, WriteXdr,
};
use thiserror::Error;

use crate::tx_builder::transaction_hash;

/// Signer failures
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    /// The signer refused to sign (user rejection, policy, device refusal)
    #[error("signer rejected the transaction: {0}")]
    Rejected(String),

    /// The envelope handed in or out could not be decoded or is not acceptable
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The signing backend could not be reached
    #[error("signer unavailable: {0}")]
    Unavailable(String),

    /// Bad key material
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Async signing capability, supplied per identity
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sign a base64 XDR `TransactionEnvelope`, returning the signed envelope
    async fn sign(&self, envelope_xdr: &str) -> Result<String, SignerError>;
}

/// Local ed25519 keypair signer
pub struct KeypairSigner {
    signing_key: SigningKey,
    network_passphrase: String,
}

impl KeypairSigner {
    pub fn new(secret: [u8; 32], network_passphrase: impl Into<String>) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&secret),
            network_passphrase: network_passphrase.into(),
        }
    }

    /// Create from an `S...` secret seed
    pub fn from_secret_seed(
        seed: &str,
        network_passphrase: impl Into<String>,
    ) -> Result<Self, SignerError> {
        let key = stellar_strkey::ed25519::PrivateKey::from_string(seed)
            .map_err(|e| SignerError::InvalidKey(format!("bad secret seed: {}", e)))?;
        Ok(Self::new(key.0, network_passphrase))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn decorated_signature(&self, hash: &[u8; 32]) -> Result<DecoratedSignature, SignerError> {
        let public_key = self.public_key();
        let signature = self.signing_key.sign(hash);
        Ok(DecoratedSignature {
            hint: SignatureHint([
                public_key[28],
                public_key[29],
                public_key[30],
                public_key[31],
            ]),
            signature: Signature(
                signature
                    .to_bytes()
                    .to_vec()
                    .try_into()
                    .map_err(|_| SignerError::InvalidKey("signature length".to_string()))?,
            ),
        })
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    async fn sign(&self, envelope_xdr: &str) -> Result<String, SignerError> {
        let envelope = TransactionEnvelope::from_xdr_base64(envelope_xdr, Limits::none())
            .map_err(|e| SignerError::InvalidEnvelope(e.to_string()))?;

        let TransactionEnvelope::Tx(mut v1) = envelope else {
            return Err(SignerError::InvalidEnvelope(
                "only V1 transaction envelopes can be signed".to_string(),
            ));
        };

        let hash = transaction_hash(&v1.tx, &self.network_passphrase)
            .map_err(|e| SignerError::InvalidEnvelope(e.to_string()))?;
        let mut signatures = v1.signatures.to_vec();
        signatures.push(self.decorated_signature(&hash)?);
        v1.signatures = signatures
            .try_into()
            .map_err(|_| SignerError::InvalidEnvelope("too many signatures".to_string()))?;

        TransactionEnvelope::Tx(v1)
            .to_xdr_base64(Limits::none())
            .map_err(|e| SignerError::InvalidEnvelope(e.to_string()))
    }
}
