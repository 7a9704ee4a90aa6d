//! Durable key-value slots used for ledger and transcript persistence.

use crate::error::MemoryError;
use async_trait::async_trait;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Durable string key-value slot.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under a key.
    async fn get(&self, key: &str) -> Result<Option<String>, MemoryError>;

    /// Replace the value stored under a key.
    async fn set(&self, key: &str, value: &str) -> Result<(), MemoryError>;
}

/// File-backed key-value store holding one file per key.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    /// Root directory for slot files.
    root: PathBuf,
}

impl FileKvStore {
    /// Create a new file-backed store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!("initialized file kv store (root={})", root.display());
        Ok(Self { root })
    }

    /// Path of the file backing a key.
    fn slot_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.slot", encode_key(key)))
    }

    /// Path of the temporary file used for atomic rewrites.
    fn temp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.slot.tmp", encode_key(key)))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, MemoryError> {
        match tokio::fs::read_to_string(self.slot_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Rewrite a slot atomically via a temp file and rename.
    async fn set(&self, key: &str, value: &str) -> Result<(), MemoryError> {
        let path = self.slot_path(key);
        let temp_path = self.temp_path(key);
        tokio::fs::write(&temp_path, value).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        debug!("wrote kv slot (key={}, len={})", key, value.len());
        Ok(())
    }
}

/// Encode a key into a file-name-safe form; `%` escapes keep the mapping injective.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
