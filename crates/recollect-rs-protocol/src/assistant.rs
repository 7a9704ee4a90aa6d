use crate::{ChatRole, LedgerProjection, Record};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message as sent to the remote assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Request body for the remote assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantRequest {
    /// Transcript without intro content.
    pub messages: Vec<WireMessage>,
    /// Ledger projection carried as conversational context.
    #[serde(rename = "recentRecords")]
    pub recent_records: Vec<LedgerProjection>,
    /// Unsynced records referenced in the latest message.
    #[serde(
        rename = "localRecords",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub local_records: Option<Vec<Record>>,
}

/// Assistant reply text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantReply {
    pub content: String,
}

/// Response body from the remote assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantResponse {
    pub message: AssistantReply,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_queried: Option<Vec<Record>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_total_count: Option<usize>,
}

impl AssistantResponse {
    /// Build a plain text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: AssistantReply {
                content: content.into(),
            },
            records_queried: None,
            records_total_count: None,
        }
    }
}

/// Errors returned by assistant clients.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// The assistant could not be reached.
    #[error("assistant unreachable: {0}")]
    Unreachable(String),
    /// The assistant answered with a non-success status.
    #[error("assistant returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The assistant response could not be decoded.
    #[error("invalid assistant response: {0}")]
    InvalidResponse(String),
}

/// Remote assistant collaborator.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Send a chat request and wait for the reply.
    async fn send(&self, request: &AssistantRequest) -> Result<AssistantResponse, AssistantError>;
}
