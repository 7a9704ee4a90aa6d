//! HTTP client for the remote assistant.

use crate::error::RecollectCoreError;
use async_trait::async_trait;
use log::{debug, info};
use recollect_rs_protocol::{AssistantClient, AssistantError, AssistantRequest, AssistantResponse};
use std::time::Duration;

/// Posts assistant requests as JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpAssistantClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAssistantClient {
    /// Build a client with a request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RecollectCoreError> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RecollectCoreError::Config(err.to_string()))?;
        info!(
            "initialized assistant client (endpoint={endpoint}, timeout_secs={})",
            timeout.as_secs()
        );
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AssistantClient for HttpAssistantClient {
    async fn send(&self, request: &AssistantRequest) -> Result<AssistantResponse, AssistantError> {
        debug!(
            "sending assistant request (messages={}, recent_records={}, local_records={})",
            request.messages.len(),
            request.recent_records.len(),
            request.local_records.as_ref().map_or(0, Vec::len)
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| AssistantError::Unreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<AssistantResponse>()
            .await
            .map_err(|err| AssistantError::InvalidResponse(err.to_string()))
    }
}
