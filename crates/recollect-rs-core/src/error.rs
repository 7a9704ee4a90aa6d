//! Error types for the core crate.

use recollect_rs_memory::MemoryError;
use recollect_rs_protocol::{AssistantError, RecordStoreError, UploadError};
use thiserror::Error;

/// Errors returned by core operations.
#[derive(Debug, Error)]
pub enum RecollectCoreError {
    /// Record collaborator failure.
    #[error("record store error: {0}")]
    Records(#[from] RecordStoreError),
    /// Remote assistant failure.
    #[error("assistant error: {0}")]
    Assistant(#[from] AssistantError),
    /// Ledger, transcript or key-value failure.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Upload processing failure.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// The active identity changed while the operation was in flight.
    #[error("identity changed during operation")]
    IdentityChanged,
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or parsing error.
    #[error("parse error: {0}")]
    Parse(String),
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}
