//! Transcript encryption under identity key material.

use crate::error::MemoryError;
use crate::identity::KeyPair;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use sha2::{Digest, Sha256};

const KEY_DOMAIN: &[u8] = b"recollect.transcript.v1";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Symmetric encryption bound to an identity key pair.
pub trait TranscriptCipher: Send + Sync {
    /// Encrypt plaintext for the given identity.
    fn encrypt(&self, keys: &KeyPair, plaintext: &[u8]) -> Result<Vec<u8>, MemoryError>;

    /// Decrypt ciphertext produced by `encrypt` for the same identity.
    fn decrypt(&self, keys: &KeyPair, ciphertext: &[u8]) -> Result<Vec<u8>, MemoryError>;
}

/// ChaCha20-Poly1305 keyed by a SHA-256 digest of the key pair.
///
/// Output layout is `nonce (12 bytes) || ciphertext || tag`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPairCipher;

impl KeyPairCipher {
    fn aead(keys: &KeyPair) -> Result<ChaCha20Poly1305, MemoryError> {
        if keys.private().is_empty() {
            return Err(MemoryError::InvalidKey("private key is empty".to_string()));
        }
        let mut hasher = Sha256::new();
        hasher.update(KEY_DOMAIN);
        hasher.update((keys.private().len() as u64).to_le_bytes());
        hasher.update(keys.private());
        hasher.update(keys.public());
        let key = hasher.finalize();
        ChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|err| MemoryError::Crypto(format!("failed to initialize cipher: {err}")))
    }
}

impl TranscriptCipher for KeyPairCipher {
    fn encrypt(&self, keys: &KeyPair, plaintext: &[u8]) -> Result<Vec<u8>, MemoryError> {
        let aead = Self::aead(keys)?;
        let nonce: [u8; NONCE_LEN] = rand::random();
        let ciphertext = aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|err| MemoryError::Crypto(format!("encryption failed: {err}")))?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn decrypt(&self, keys: &KeyPair, ciphertext: &[u8]) -> Result<Vec<u8>, MemoryError> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(MemoryError::Crypto(format!(
                "ciphertext too short ({} bytes)",
                ciphertext.len()
            )));
        }
        let aead = Self::aead(keys)?;
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        aead.decrypt(Nonce::from_slice(nonce), body)
            .map_err(|err| MemoryError::Crypto(format!("decryption failed: {err}")))
    }
}
