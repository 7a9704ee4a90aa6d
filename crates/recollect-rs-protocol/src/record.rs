use crate::Record;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Filter accepted by record store queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordFilter {
    /// Restrict results to a single record type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

impl RecordFilter {
    /// Filter on record type equality.
    pub fn by_type(record_type: impl Into<String>) -> Self {
        Self {
            record_type: Some(record_type.into()),
        }
    }

    /// Whether the record satisfies this filter.
    pub fn matches(&self, record: &Record) -> bool {
        match self.record_type.as_deref() {
            Some(record_type) => record.record_type == record_type,
            None => true,
        }
    }
}

/// Errors returned by record store collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    /// The store cannot be reached right now.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    /// The record was rejected.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// On-device record store used for lookups, uploads and local answering.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by id.
    async fn get(&self, id: &str) -> Result<Option<Record>, RecordStoreError>;

    /// Insert or replace a record.
    async fn put(&self, record: Record) -> Result<(), RecordStoreError>;

    /// List records, optionally narrowed by a filter.
    async fn query(&self, filter: Option<&RecordFilter>) -> Result<Vec<Record>, RecordStoreError>;
}
