use async_trait::async_trait;
use parking_lot::Mutex;
use recollect_rs_protocol::{
    AssistantClient, AssistantError, AssistantRequest, AssistantResponse,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FixedAssistant {
    response: AssistantResponse,
}

impl FixedAssistant {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            response: AssistantResponse::text(content),
        }
    }

    pub fn with_response(response: AssistantResponse) -> Self {
        Self { response }
    }
}

#[async_trait]
impl AssistantClient for FixedAssistant {
    async fn send(&self, _request: &AssistantRequest) -> Result<AssistantResponse, AssistantError> {
        Ok(self.response.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FailingAssistant {
    reason: String,
}

impl FailingAssistant {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AssistantClient for FailingAssistant {
    async fn send(&self, _request: &AssistantRequest) -> Result<AssistantResponse, AssistantError> {
        Err(AssistantError::Unreachable(self.reason.clone()))
    }
}

/// Assistant that answers with a fixed response and keeps every request.
#[derive(Debug, Clone)]
pub struct RecordingAssistant {
    response: AssistantResponse,
    requests: Arc<Mutex<Vec<AssistantRequest>>>,
}

impl RecordingAssistant {
    pub fn new(response: AssistantResponse) -> (Self, Arc<Mutex<Vec<AssistantRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                response,
                requests: requests.clone(),
            },
            requests,
        )
    }
}

#[async_trait]
impl AssistantClient for RecordingAssistant {
    async fn send(&self, request: &AssistantRequest) -> Result<AssistantResponse, AssistantError> {
        self.requests.lock().push(request.clone());
        Ok(self.response.clone())
    }
}
