//! Wire and storage types shared by the Recollect crates.

mod assistant;
mod record;
pub mod timestamp;
mod upload;

pub use assistant::{
    AssistantClient, AssistantError, AssistantReply, AssistantRequest, AssistantResponse,
    WireMessage,
};
pub use record::{RecordFilter, RecordStore, RecordStoreError};
pub use upload::{PendingUpload, ProcessedUpload, UploadError, UploadProcessor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a record in the on-device store.
pub type RecordId = String;

/// Full record as held by the on-device record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Record identifier; empty when the record has not been assigned one yet.
    #[serde(default)]
    pub id: RecordId,
    /// Record type (e.g. `invoice`, `workout`).
    #[serde(rename = "type", default)]
    pub record_type: String,
    /// Human readable summary.
    #[serde(default)]
    pub summary: String,
    /// Free-form property bag.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// References to files the record was derived from.
    #[serde(default)]
    pub file_refs: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Whether a remote system of record durably stores this record.
    #[serde(default)]
    pub synced: bool,
    /// Derived embedding, never carried in snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Record {
    /// Create an unsynced record stamped with the current time.
    pub fn new(
        id: impl Into<RecordId>,
        record_type: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            record_type: record_type.into(),
            summary: summary.into(),
            properties: Map::new(),
            file_refs: Vec::new(),
            created_at: now,
            updated_at: now,
            synced: false,
            embedding: None,
        }
    }

    /// Attach a property value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attach a file reference.
    pub fn with_file_ref(mut self, file_ref: impl Into<String>) -> Self {
        self.file_refs.push(file_ref.into());
        self
    }

    /// Mark the record as durably synced.
    pub fn synced(mut self) -> Self {
        self.synced = true;
        self
    }

    /// Whether the record carries a usable identifier.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Project the record into its stable snapshot form.
    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            id: self.id.clone(),
            record_type: self.record_type.clone(),
            summary: self.summary.clone(),
            properties: self.properties.clone(),
            file_refs: self.file_refs.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Stable projection of a record without embeddings or derived data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    pub id: RecordId,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub file_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry as transmitted to the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerProjection {
    pub id: RecordId,
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<RecordSnapshot>,
}

/// Speaker role for a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl ChatRole {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Parse a role, rejecting anything other than `user` or `assistant`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

/// Message stored in the chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Role that produced the message.
    pub role: ChatRole,
    /// Message content.
    pub content: String,
    /// Timestamp, serialized in canonical RFC 3339 form.
    #[serde(with = "timestamp::canonical")]
    pub timestamp: DateTime<Utc>,
    /// Records returned by the remote assistant for this answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_queried: Option<Vec<RecordSnapshot>>,
    /// Total count reported for a count question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_total_count: Option<usize>,
    /// Whether this message reports an error.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
    /// How many times an identical error has been reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u32>,
    /// Whether this is the synthetic intro message.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_intro: bool,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            records_queried: None,
            records_total_count: None,
            is_error: false,
            error_count: None,
            is_intro: false,
        }
    }

    /// Build a user message stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Build an assistant message stamped now.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Build the synthetic intro message.
    pub fn intro(content: impl Into<String>) -> Self {
        Self {
            is_intro: true,
            ..Self::new(ChatRole::Assistant, content)
        }
    }

    /// Build an assistant error message with an occurrence count of one.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            error_count: Some(1),
            ..Self::new(ChatRole::Assistant, content)
        }
    }

    /// Attach a locally computed record count.
    pub fn with_total_count(mut self, count: usize) -> Self {
        self.records_total_count = Some(count);
        self
    }

    /// Project the message to its wire form.
    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
