//! Account key handling
//!
//! Ed25519 key pairs rendered in the ledger's prefixed, fixed-length
//! "strkey" form: a version byte, the 32-byte key, and a CRC16-XModem
//! checksum, base32-encoded to exactly 56 characters. Public keys start
//! with `G`, secret seeds with `S`.
//!
//! Secret seeds are encrypted with ChaCha20-Poly1305 before they touch
//! the database; the plaintext leaves the gateway once, at creation.

use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{AnchorError, Result};

/// Strkey version byte for public keys (renders as leading `G`)
const VERSION_PUBLIC: u8 = 6 << 3;

/// Strkey version byte for secret seeds (renders as leading `S`)
const VERSION_SECRET: u8 = 18 << 3;

/// Encoded strkey length in characters
pub const STRKEY_LEN: usize = 56;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
const NONCE_LEN: usize = 12;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

// =============================================================================
// Strkey codec
// =============================================================================

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 8 / 5 + 1);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let index = ((buffer >> bits) & 0x1f) as usize;
            out.push(BASE32_ALPHABET[index] as char);
        }
    }
    if bits > 0 {
        let index = ((buffer << (5 - bits)) & 0x1f) as usize;
        out.push(BASE32_ALPHABET[index] as char);
    }
    out
}

fn base32_decode(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for ch in input.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&c| c == ch)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Some(out)
}

/// CRC16-XModem over the version byte and key payload
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

fn strkey_encode(version: u8, key: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(35);
    payload.push(version);
    payload.extend_from_slice(key);
    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());
    base32_encode(&payload)
}

fn strkey_decode(version: u8, input: &str) -> Result<[u8; 32]> {
    if input.len() != STRKEY_LEN {
        return Err(AnchorError::Validation(format!(
            "key must be {} characters, got {}",
            STRKEY_LEN,
            input.len()
        )));
    }

    let payload = base32_decode(input)
        .ok_or_else(|| AnchorError::Validation("key contains invalid characters".into()))?;
    if payload.len() != 35 {
        return Err(AnchorError::Validation("malformed key encoding".into()));
    }

    let (body, checksum_bytes) = payload.split_at(33);
    let expected = u16::from_le_bytes([checksum_bytes[0], checksum_bytes[1]]);
    if crc16_xmodem(body) != expected {
        return Err(AnchorError::Validation("key checksum mismatch".into()));
    }
    if body[0] != version {
        return Err(AnchorError::Validation("wrong key type prefix".into()));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&body[1..]);
    Ok(key)
}

/// Encode a 32-byte public key as a `G…` strkey
pub fn encode_public_key(key: &[u8; 32]) -> String {
    strkey_encode(VERSION_PUBLIC, key)
}

/// Decode a `G…` strkey into the raw public key bytes
pub fn decode_public_key(input: &str) -> Result<[u8; 32]> {
    strkey_decode(VERSION_PUBLIC, input)
}

/// Decode an `S…` strkey into the raw secret seed
pub fn decode_secret_seed(input: &str) -> Result<[u8; 32]> {
    strkey_decode(VERSION_SECRET, input)
}

// =============================================================================
// Key generation and signing
// =============================================================================

/// A freshly generated account key pair in strkey form
pub struct GeneratedKeypair {
    pub public_key: String,
    /// Zeroized when dropped; hand to the caller exactly once
    pub secret_key: Zeroizing<String>,
}

/// Generate a new Ed25519 account key pair
pub fn generate_keypair() -> GeneratedKeypair {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key = encode_public_key(&signing_key.verifying_key().to_bytes());
    let secret_key = Zeroizing::new(strkey_encode(VERSION_SECRET, &signing_key.to_bytes()));
    GeneratedKeypair {
        public_key,
        secret_key,
    }
}

/// Reconstruct a signing key from an `S…` strkey secret
pub fn signing_key_from_secret(secret: &str) -> Result<SigningKey> {
    let mut seed = decode_secret_seed(secret)?;
    let key = SigningKey::from_bytes(&seed);
    use zeroize::Zeroize;
    seed.zeroize();
    Ok(key)
}

// =============================================================================
// Secret-at-rest encryption
// =============================================================================

/// Encrypts account secret seeds before persistence.
///
/// Stored form is `hex(nonce) || hex(ciphertext)` with a random 12-byte
/// nonce per encryption.
#[derive(Clone)]
pub struct SecretStore {
    key: [u8; 32],
}

impl SecretStore {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Encrypt a strkey secret for storage
    pub fn encrypt(&self, secret: &str) -> Result<String> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), secret.as_bytes())
            .map_err(|e| AnchorError::Internal(format!("Secret encryption failed: {e}")))?;

        Ok(format!("{}{}", hex::encode(nonce), hex::encode(ciphertext)))
    }

    /// Decrypt a stored secret back to its strkey form
    pub fn decrypt(&self, stored: &str) -> Result<Zeroizing<String>> {
        let bytes = hex::decode(stored)
            .map_err(|_| AnchorError::Internal("Stored secret is not valid hex".into()))?;
        if bytes.len() <= NONCE_LEN {
            return Err(AnchorError::Internal("Stored secret is truncated".into()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AnchorError::Internal("Secret decryption failed".into()))?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| AnchorError::Internal("Decrypted secret is not valid UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_strkey_shape() {
        let pair = generate_keypair();
        assert_eq!(pair.public_key.len(), STRKEY_LEN);
        assert!(pair.public_key.starts_with('G'));
        assert_eq!(pair.secret_key.len(), STRKEY_LEN);
        assert!(pair.secret_key.starts_with('S'));
    }

    #[test]
    fn test_public_key_roundtrip() {
        let pair = generate_keypair();
        let decoded = decode_public_key(&pair.public_key).unwrap();
        assert_eq!(encode_public_key(&decoded), pair.public_key);
    }

    #[test]
    fn test_secret_reconstructs_same_public_key() {
        let pair = generate_keypair();
        let signing_key = signing_key_from_secret(&pair.secret_key).unwrap();
        let public = encode_public_key(&signing_key.verifying_key().to_bytes());
        assert_eq!(public, pair.public_key);
    }

    #[test]
    fn test_corrupted_key_rejected() {
        let pair = generate_keypair();

        // Flip one character; checksum must catch it
        let mut corrupted: Vec<char> = pair.public_key.chars().collect();
        corrupted[10] = if corrupted[10] == 'A' { 'B' } else { 'A' };
        let corrupted: String = corrupted.into_iter().collect();
        assert!(decode_public_key(&corrupted).is_err());

        // Secret prefix on a public decode must be rejected
        assert!(decode_public_key(&pair.secret_key).is_err());

        // Wrong length
        assert!(decode_public_key("GSHORT").is_err());
    }

    #[test]
    fn test_crc16_known_value() {
        // CRC16-XModem of "123456789" is 0x31C3
        assert_eq!(crc16_xmodem(b"123456789"), 0x31c3);
    }

    #[test]
    fn test_secret_store_roundtrip() {
        let store = SecretStore::new([7u8; 32]);
        let pair = generate_keypair();

        let stored = store.encrypt(&pair.secret_key).unwrap();
        assert_ne!(stored, *pair.secret_key);

        let recovered = store.decrypt(&stored).unwrap();
        assert_eq!(*recovered, *pair.secret_key);
    }

    #[test]
    fn test_secret_store_wrong_key_fails() {
        let store = SecretStore::new([7u8; 32]);
        let other = SecretStore::new([8u8; 32]);
        let pair = generate_keypair();

        let stored = store.encrypt(&pair.secret_key).unwrap();
        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn test_encrypt_uses_fresh_nonce() {
        let store = SecretStore::new([7u8; 32]);
        let pair = generate_keypair();

        let a = store.encrypt(&pair.secret_key).unwrap();
        let b = store.encrypt(&pair.secret_key).unwrap();
        assert_ne!(a, b);
    }
}
