use crate::Record;
use async_trait::async_trait;
use std::path::PathBuf;

/// File handed to an upload processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    /// File name as shown to the user.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Source path when the upload came from disk.
    pub source: Option<PathBuf>,
}

impl PendingUpload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Records produced from one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedUpload {
    /// Records extracted from the file; multi-row imports yield several.
    pub records: Vec<Record>,
    /// Whether a remote system of record already stores these records.
    pub persisted: bool,
}

/// Errors returned by upload processors.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The file type is not supported.
    #[error("unsupported upload {name}: {reason}")]
    Unsupported { name: String, reason: String },
    /// Processing failed.
    #[error("failed to process upload {name}: {reason}")]
    Failed { name: String, reason: String },
}

/// Turns an uploaded file into records.
#[async_trait]
pub trait UploadProcessor: Send + Sync {
    async fn process(&self, upload: &PendingUpload) -> Result<ProcessedUpload, UploadError>;
}
