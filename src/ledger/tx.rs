//! Transaction building and signing
//!
//! A transaction is a single-source, sequence-numbered list of payment
//! operations with at most one text memo. The signing payload is
//! `SHA-256(SHA-256(passphrase) || canonical transaction JSON)`; its hex
//! form is the 64-character transaction hash, and signatures are Ed25519
//! over those 32 bytes.

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AnchorError, Result};

/// Smallest expressible payment amount, used for anchoring self-payments
pub const MIN_PAYMENT_AMOUNT: &str = "0.0000001";

/// A single operation inside a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Payment { destination: String, amount: String },
}

/// Transaction memo; the ledger allows at most one per transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Memo {
    None,
    Text(String),
}

impl Memo {
    pub fn text(&self) -> Option<&str> {
        match self {
            Memo::Text(t) => Some(t),
            Memo::None => None,
        }
    }
}

/// An unsigned transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub source_account: String,
    pub sequence: i64,
    pub fee: u64,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Canonical signing payload for a network
    fn signing_payload(&self, passphrase: &str) -> Result<[u8; 32]> {
        let network_id = Sha256::digest(passphrase.as_bytes());
        let body = serde_json::to_vec(self)
            .map_err(|e| AnchorError::Internal(format!("Transaction encoding failed: {e}")))?;

        let mut hasher = Sha256::new();
        hasher.update(network_id);
        hasher.update(&body);
        Ok(hasher.finalize().into())
    }

    /// Hex transaction hash as it will appear on the ledger
    pub fn hash_hex(&self, passphrase: &str) -> Result<String> {
        Ok(hex::encode(self.signing_payload(passphrase)?))
    }

    /// Sign with the source account's key, producing a submittable envelope
    pub fn sign(self, passphrase: &str, key: &SigningKey) -> Result<TransactionEnvelope> {
        let payload = self.signing_payload(passphrase)?;
        let signature = key.sign(&payload);
        Ok(TransactionEnvelope {
            tx: self,
            signatures: vec![hex::encode(signature.to_bytes())],
        })
    }
}

/// A signed transaction ready for submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub tx: Transaction,
    pub signatures: Vec<String>,
}

/// Builder for anchoring transactions
pub struct TxBuilder {
    source_account: String,
    sequence: i64,
    base_fee: u64,
    memo: Memo,
    operations: Vec<Operation>,
}

impl TxBuilder {
    pub fn new(source_account: &str, sequence: i64, base_fee: u64) -> Self {
        Self {
            source_account: source_account.to_string(),
            sequence,
            base_fee,
            memo: Memo::None,
            operations: Vec::new(),
        }
    }

    /// Set the text memo; later calls replace earlier ones
    pub fn memo_text(mut self, text: &str) -> Self {
        self.memo = Memo::Text(text.to_string());
        self
    }

    /// Append a payment operation
    pub fn payment(mut self, destination: &str, amount: &str) -> Self {
        self.operations.push(Operation::Payment {
            destination: destination.to_string(),
            amount: amount.to_string(),
        });
        self
    }

    /// Total fee for the built transaction: base fee per operation
    pub fn fee(&self) -> u64 {
        self.base_fee * self.operations.len() as u64
    }

    pub fn build(self) -> Result<Transaction> {
        if self.operations.is_empty() {
            return Err(AnchorError::Validation(
                "transaction requires at least one operation".into(),
            ));
        }
        let fee = self.base_fee * self.operations.len() as u64;
        Ok(Transaction {
            source_account: self.source_account,
            sequence: self.sequence,
            fee,
            memo: self.memo,
            operations: self.operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::keys::generate_keypair;
    use crate::ledger::keys::signing_key_from_secret;

    const PASSPHRASE: &str = "Test SDF Network ; September 2015";

    fn sample_tx(sequence: i64) -> Transaction {
        TxBuilder::new("GSOURCE", sequence, 100)
            .payment("GSOURCE", MIN_PAYMENT_AMOUNT)
            .memo_text("abc123")
            .build()
            .unwrap()
    }

    #[test]
    fn test_hash_is_hex_64() {
        let hash = sample_tx(1).hash_hex(PASSPHRASE).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = sample_tx(1).hash_hex(PASSPHRASE).unwrap();
        let b = sample_tx(1).hash_hex(PASSPHRASE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_changes_with_sequence_and_network() {
        let base = sample_tx(1).hash_hex(PASSPHRASE).unwrap();
        assert_ne!(base, sample_tx(2).hash_hex(PASSPHRASE).unwrap());
        assert_ne!(base, sample_tx(1).hash_hex("other network").unwrap());
    }

    #[test]
    fn test_fee_scales_with_operations() {
        let tx = TxBuilder::new("GSOURCE", 1, 100)
            .payment("GSOURCE", MIN_PAYMENT_AMOUNT)
            .payment("GSOURCE", MIN_PAYMENT_AMOUNT)
            .payment("GSOURCE", MIN_PAYMENT_AMOUNT)
            .build()
            .unwrap();
        assert_eq!(tx.fee, 300);
    }

    #[test]
    fn test_empty_transaction_rejected() {
        let result = TxBuilder::new("GSOURCE", 1, 100).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_signed_envelope_carries_signature() {
        let pair = generate_keypair();
        let key = signing_key_from_secret(&pair.secret_key).unwrap();

        let envelope = sample_tx(1).sign(PASSPHRASE, &key).unwrap();
        assert_eq!(envelope.signatures.len(), 1);
        // 64-byte Ed25519 signature, hex encoded
        assert_eq!(envelope.signatures[0].len(), 128);
    }

    #[test]
    fn test_memo_single_slot() {
        let tx = TxBuilder::new("GSOURCE", 1, 100)
            .payment("GSOURCE", MIN_PAYMENT_AMOUNT)
            .memo_text("first")
            .memo_text("second")
            .build()
            .unwrap();
        assert_eq!(tx.memo.text(), Some("second"));
    }
}
