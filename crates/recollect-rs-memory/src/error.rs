//! Error types for memory operations.

/// Errors returned by memory stores and helpers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Key-value slot failure reported by a storage backend.
    #[error("storage error: {0}")]
    Storage(String),
    /// Encryption or decryption failure.
    #[error("crypto error: {0}")]
    Crypto(String),
    /// Base64 decoding failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// Decrypted bytes were not valid UTF-8.
    #[error("utf8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// Key material is malformed.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    /// Key material has not finished loading.
    #[error("identity key material is still loading")]
    IdentityLoading,
}
