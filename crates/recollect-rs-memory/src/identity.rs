//! Identity key material consumed by the transcript store.

use crate::error::MemoryError;
use crate::namespace::derive_namespace;
use std::fmt;

/// Asymmetric key pair identifying a user's storage namespace.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    public: Vec<u8>,
    private: Vec<u8>,
}

impl KeyPair {
    /// Wrap raw public and private key bytes.
    pub fn new(public: impl Into<Vec<u8>>, private: impl Into<Vec<u8>>) -> Self {
        Self {
            public: public.into(),
            private: private.into(),
        }
    }

    /// Decode a key pair from hex strings.
    pub fn from_hex(public: &str, private: &str) -> Result<Self, MemoryError> {
        let public = hex::decode(public.trim())
            .map_err(|err| MemoryError::InvalidKey(format!("public key: {err}")))?;
        let private = hex::decode(private.trim())
            .map_err(|err| MemoryError::InvalidKey(format!("private key: {err}")))?;
        if private.is_empty() {
            return Err(MemoryError::InvalidKey("private key is empty".to_string()));
        }
        Ok(Self::new(public, private))
    }

    /// Public key bytes.
    pub fn public(&self) -> &[u8] {
        &self.public
    }

    /// Private key bytes.
    pub fn private(&self) -> &[u8] {
        &self.private
    }

    /// Storage namespace derived from the private key.
    pub fn namespace(&self) -> String {
        derive_namespace(Some(&self.private))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(&self.public))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Availability of identity key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    /// The key provider has not finished loading.
    Loading,
    /// No key material is linked.
    Missing,
    /// Key material is available.
    Ready(KeyPair),
}

impl IdentityState {
    /// Key pair when available.
    pub fn key_pair(&self) -> Option<&KeyPair> {
        match self {
            IdentityState::Ready(keys) if !keys.private().is_empty() => Some(keys),
            _ => None,
        }
    }

    /// Whether the key provider is still loading.
    pub fn is_loading(&self) -> bool {
        matches!(self, IdentityState::Loading)
    }

    /// Storage namespace, or None while keys are loading.
    pub fn namespace(&self) -> Option<String> {
        match self {
            IdentityState::Loading => None,
            other => Some(derive_namespace(other.key_pair().map(KeyPair::private))),
        }
    }
}
