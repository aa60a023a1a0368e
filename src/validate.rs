//! Boundary validation
//!
//! Pure checks applied to request input before anything touches the
//! database or the ledger. Hashes are normalized to lowercase hex; keys
//! are checked against the strkey codec including their checksum.

use crate::error::{AnchorError, Result};
use crate::ledger::keys;

/// Expected length of a hex-encoded SHA-256 hash
pub const HASH_LEN: usize = 64;

/// Trim and lowercase a hash for storage and comparison
pub fn normalize_hash(hash: &str) -> String {
    hash.trim().to_lowercase()
}

fn validate_hex_hash(hash: &str, what: &str) -> Result<String> {
    let normalized = normalize_hash(hash);

    if normalized.is_empty() {
        return Err(AnchorError::Validation(format!("{what} must not be empty")));
    }
    if normalized.len() != HASH_LEN {
        return Err(AnchorError::Validation(format!(
            "{what} must be {HASH_LEN} hex characters, got {}",
            normalized.len()
        )));
    }
    if let Some(ch) = normalized.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(AnchorError::Validation(format!(
            "{what} contains non-hex character '{ch}'"
        )));
    }

    Ok(normalized)
}

/// Validate a document hash, returning the normalized form
pub fn document_hash(hash: &str) -> Result<String> {
    validate_hex_hash(hash, "document hash")
}

/// Validate a ledger transaction hash, returning the normalized form
pub fn transaction_hash(hash: &str) -> Result<String> {
    validate_hex_hash(hash, "transaction hash")
}

/// Validate a `G…` strkey public key
pub fn public_key(key: &str) -> Result<()> {
    keys::decode_public_key(key)
        .map(|_| ())
        .map_err(|_| AnchorError::Validation("invalid public key".into()))
}

/// Validate an `S…` strkey secret seed
pub fn secret_key(key: &str) -> Result<()> {
    keys::decode_secret_seed(key)
        .map(|_| ())
        .map_err(|_| AnchorError::Validation("invalid secret key".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::keys::generate_keypair;

    fn sample_hash() -> &'static str {
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    }

    #[test]
    fn test_valid_hash_passes() {
        assert!(document_hash(sample_hash()).is_ok());
        assert!(transaction_hash(sample_hash()).is_ok());
    }

    #[test]
    fn test_hash_is_normalized() {
        let upper = sample_hash().to_uppercase();
        let normalized = document_hash(&format!("  {upper}  ")).unwrap();
        assert_eq!(normalized, sample_hash());
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(document_hash(&"a".repeat(63)).is_err());
        assert!(document_hash(&"a".repeat(65)).is_err());
        assert!(document_hash("").is_err());
    }

    #[test]
    fn test_non_hex_rejected() {
        let mut hash = sample_hash().to_string();
        hash.replace_range(10..11, "g");
        let err = document_hash(&hash).unwrap_err();
        assert!(err.to_string().contains("'g'"));
    }

    #[test]
    fn test_key_validation() {
        let pair = generate_keypair();
        assert!(public_key(&pair.public_key).is_ok());
        assert!(secret_key(&pair.secret_key).is_ok());

        // Swapped prefixes fail
        assert!(public_key(&pair.secret_key).is_err());
        assert!(secret_key(&pair.public_key).is_err());
        assert!(public_key("not-a-key").is_err());
    }
}
