//! Chat session tying the transcript, ledger, local resolver and assistant
//! together for one active identity.
//!
//! Every transcript write is guarded by the identity generation captured when
//! the operation started; results of operations superseded by an identity
//! switch are dropped instead of being written into the new slot.

use crate::error::RecollectCoreError;
use crate::ingest::{Ingestor, UploadOutcome};
use crate::mentions::lookup_mentions;
use crate::query::{LocalQueryResolver, QueryContext, QueryOptions};
use log::{debug, info, warn};
use recollect_rs_memory::{
    IdentityState, MemoryError, RecordLedger, TranscriptLoad, TranscriptStore, append_message,
};
use recollect_rs_protocol::{
    AssistantClient, AssistantRequest, AssistantResponse, ChatMessage, PendingUpload, Record,
    RecordStore,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Shown when chatting remotely without linked key material.
pub const IDENTITY_REQUIRED_MESSAGE: &str =
    "Link an identity to chat with the assistant. Local record counts still work without one.";
/// Shown when chatting remotely while key material is still loading.
pub const IDENTITY_LOADING_MESSAGE: &str =
    "Your identity is still loading. Try again in a moment.";
/// Shown when no assistant endpoint is configured.
pub const ASSISTANT_UNCONFIGURED_MESSAGE: &str =
    "No assistant endpoint is configured, so only local record questions can be answered.";

/// How a message was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// Counted from on-device records.
    Local,
    /// Answered by the remote assistant.
    Remote,
    /// An instructive or error message produced on-device.
    Notice,
}

/// Reply to a sent message.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// The transcript entry representing the reply (coalesced errors included).
    pub reply: ChatMessage,
    pub source: AnswerSource,
}

struct SessionState {
    identity: IdentityState,
    messages: Vec<ChatMessage>,
    /// The slot could not be read yet; writes are held back until it can.
    awaiting_keys: bool,
    /// Messages added while the slot was unreadable.
    pending: Vec<ChatMessage>,
}

/// Builder for a `ChatSession`.
pub struct ChatSessionBuilder {
    transcript: TranscriptStore,
    ledger: Arc<RecordLedger>,
    records: Arc<dyn RecordStore>,
    assistant: Option<Arc<dyn AssistantClient>>,
    ingestor: Option<Ingestor>,
    query: QueryOptions,
}

impl ChatSessionBuilder {
    pub fn new(
        transcript: TranscriptStore,
        ledger: Arc<RecordLedger>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            transcript,
            ledger,
            records,
            assistant: None,
            ingestor: None,
            query: QueryOptions::default(),
        }
    }

    pub fn assistant(mut self, assistant: Arc<dyn AssistantClient>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn ingestor(mut self, ingestor: Ingestor) -> Self {
        self.ingestor = Some(ingestor);
        self
    }

    pub fn query_options(mut self, options: QueryOptions) -> Self {
        self.query = options;
        self
    }

    /// Open the session and load the identity's transcript.
    pub async fn open(self, identity: IdentityState) -> ChatSession {
        let resolver = LocalQueryResolver::new(self.records.clone(), self.query);
        let session = ChatSession {
            transcript: self.transcript,
            ledger: self.ledger,
            records: self.records,
            assistant: self.assistant,
            ingestor: self.ingestor,
            resolver,
            generation: AtomicU64::new(0),
            state: Mutex::new(SessionState {
                identity: IdentityState::Loading,
                messages: Vec::new(),
                awaiting_keys: true,
                pending: Vec::new(),
            }),
        };
        session.switch_identity(identity).await;
        session
    }
}

/// Long-lived chat session owning conversation state for the active identity.
pub struct ChatSession {
    transcript: TranscriptStore,
    ledger: Arc<RecordLedger>,
    records: Arc<dyn RecordStore>,
    assistant: Option<Arc<dyn AssistantClient>>,
    ingestor: Option<Ingestor>,
    resolver: LocalQueryResolver,
    generation: AtomicU64,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn builder(
        transcript: TranscriptStore,
        ledger: Arc<RecordLedger>,
        records: Arc<dyn RecordStore>,
    ) -> ChatSessionBuilder {
        ChatSessionBuilder::new(transcript, ledger, records)
    }

    /// Current transcript.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    /// Active identity.
    pub async fn identity(&self) -> IdentityState {
        self.state.lock().await.identity.clone()
    }

    /// Whether the transcript is waiting for key material.
    pub async fn is_awaiting_keys(&self) -> bool {
        self.state.lock().await.awaiting_keys
    }

    /// Shared ledger.
    pub fn ledger(&self) -> &Arc<RecordLedger> {
        &self.ledger
    }

    /// Local query resolver.
    pub fn resolver(&self) -> &LocalQueryResolver {
        &self.resolver
    }

    /// Make another identity active and load its transcript.
    ///
    /// Transcripts are never merged across identities; in-flight operations
    /// started under the previous identity are discarded.
    pub async fn switch_identity(&self, identity: IdentityState) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock().await;
        let load = self.transcript.load(&identity).await;
        debug!(
            "switching identity (generation={generation}, namespace={:?})",
            identity.namespace()
        );
        state.identity = identity;
        state.pending.clear();
        match load {
            TranscriptLoad::Ready(messages) => {
                state.messages = messages;
                state.awaiting_keys = false;
            }
            TranscriptLoad::NotYetReadable => {
                state.messages = Vec::new();
                state.awaiting_keys = true;
            }
        }
        info!(
            "transcript loaded (messages={}, awaiting_keys={})",
            state.messages.len(),
            state.awaiting_keys
        );
    }

    /// Retry a deferred transcript load once key material is available.
    ///
    /// Messages added while waiting are appended to the restored transcript.
    /// Returns true when the transcript became readable.
    pub async fn reload_if_awaiting_keys(&self, identity: IdentityState) -> bool {
        let mut state = self.state.lock().await;
        if !state.awaiting_keys {
            return false;
        }
        if state.identity.namespace() != identity.namespace() && !state.identity.is_loading() {
            drop(state);
            self.switch_identity(identity).await;
            return !self.is_awaiting_keys().await;
        }
        let TranscriptLoad::Ready(mut messages) = self.transcript.load(&identity).await else {
            state.identity = identity;
            return false;
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        state.identity = identity;
        let pending = std::mem::take(&mut state.pending);
        for message in pending {
            append_message(&mut messages, message);
        }
        state.messages = messages;
        state.awaiting_keys = false;
        self.persist(&mut state).await;
        true
    }

    /// Send a user message and wait for the reply.
    pub async fn send(
        &self,
        text: &str,
        context: &QueryContext<'_>,
    ) -> Result<SendOutcome, RecollectCoreError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let identity = {
            let mut state = self.state.lock().await;
            self.push(&mut state, ChatMessage::user(text));
            self.persist(&mut state).await;
            state.identity.clone()
        };

        if let Some(reply) = self.resolver.try_answer(text, context).await {
            return self.commit(generation, reply, AnswerSource::Local).await;
        }

        let notice = match (&identity, &self.assistant) {
            (IdentityState::Loading, _) => Some(IDENTITY_LOADING_MESSAGE),
            (IdentityState::Missing, _) => Some(IDENTITY_REQUIRED_MESSAGE),
            (IdentityState::Ready(_), None) => Some(ASSISTANT_UNCONFIGURED_MESSAGE),
            (IdentityState::Ready(_), Some(_)) => None,
        };
        let Some(assistant) = self.assistant.clone().filter(|_| notice.is_none()) else {
            let message = ChatMessage::assistant(notice.unwrap_or(IDENTITY_REQUIRED_MESSAGE));
            return self.commit(generation, message, AnswerSource::Notice).await;
        };

        let request = self.build_request(text).await;
        match assistant.send(&request).await {
            Ok(response) => {
                let reply = self.accept_response(response).await;
                self.commit(generation, reply, AnswerSource::Remote).await
            }
            Err(err) => {
                warn!("assistant request failed: {err}");
                let reply = ChatMessage::error(format!("Error: {err}"));
                self.commit(generation, reply, AnswerSource::Notice).await
            }
        }
    }

    /// Ingest uploads and report each outcome in the transcript.
    pub async fn upload(
        &self,
        uploads: Vec<PendingUpload>,
    ) -> Result<Vec<UploadOutcome>, RecollectCoreError> {
        let Some(ingestor) = &self.ingestor else {
            return Err(RecollectCoreError::Config(
                "no upload processor configured".to_string(),
            ));
        };
        let generation = self.generation.load(Ordering::SeqCst);
        let outcomes = ingestor.ingest(uploads).await;

        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("dropping upload notices for superseded identity");
            return Ok(outcomes);
        }
        for outcome in &outcomes {
            let message = match (&outcome.error, outcome.failed_writes) {
                (Some(err), _) => ChatMessage::error(format!("Error: {err}")),
                (None, 0) => ChatMessage::assistant(format!(
                    "Added {} record{} from {}.",
                    outcome.stored.len(),
                    if outcome.stored.len() == 1 { "" } else { "s" },
                    outcome.name
                )),
                (None, failed) => ChatMessage::error(format!(
                    "Error: failed to save {failed} record(s) from {}",
                    outcome.name
                )),
            };
            self.push(&mut state, message);
        }
        self.persist(&mut state).await;
        Ok(outcomes)
    }

    /// Assemble the remote request from the transcript and ledger.
    async fn build_request(&self, text: &str) -> AssistantRequest {
        let mentioned = lookup_mentions(self.records.as_ref(), text).await;
        for record in &mentioned {
            self.ledger.register_record(record, record.synced).await;
        }
        let local_records: Vec<Record> = mentioned
            .into_iter()
            .filter(|record| !record.synced)
            .collect();

        let messages = {
            let state = self.state.lock().await;
            state
                .messages
                .iter()
                .filter(|message| !message.is_intro)
                .map(ChatMessage::to_wire)
                .collect()
        };
        AssistantRequest {
            messages,
            recent_records: self.ledger.to_request_payload().await,
            local_records: (!local_records.is_empty()).then_some(local_records),
        }
    }

    /// Register returned records and convert the response into a message.
    async fn accept_response(&self, response: AssistantResponse) -> ChatMessage {
        let records = response.records_queried.unwrap_or_default();
        if !records.is_empty() {
            self.ledger.register_batch(&records, true).await;
        }
        let mut reply = ChatMessage::assistant(response.message.content);
        if !records.is_empty() {
            reply.records_queried = Some(records.iter().map(Record::snapshot).collect());
        }
        reply.records_total_count = response.records_total_count;
        reply
    }

    /// Append a reply if the identity is unchanged, then persist.
    async fn commit(
        &self,
        generation: u64,
        reply: ChatMessage,
        source: AnswerSource,
    ) -> Result<SendOutcome, RecollectCoreError> {
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("dropping reply for superseded identity (source={source:?})");
            return Err(RecollectCoreError::IdentityChanged);
        }
        let index = self.push(&mut state, reply);
        let reply = state.messages[index].clone();
        self.persist(&mut state).await;
        Ok(SendOutcome { reply, source })
    }

    fn push(&self, state: &mut SessionState, message: ChatMessage) -> usize {
        if state.awaiting_keys {
            state.pending.push(message.clone());
        }
        append_message(&mut state.messages, message)
    }

    /// Save the transcript unless the slot is not yet readable.
    ///
    /// Save failures surface as a coalesced error message that is kept in
    /// memory only.
    async fn persist(&self, state: &mut SessionState) {
        if state.awaiting_keys {
            debug!("transcript write deferred until keys load");
            return;
        }
        match self.transcript.save(&state.messages, &state.identity).await {
            Ok(()) => {}
            Err(MemoryError::IdentityLoading) => {
                debug!("transcript write skipped while identity loads");
            }
            Err(err) => {
                warn!("failed to save transcript: {err}");
                append_message(
                    &mut state.messages,
                    ChatMessage::error(format!("Error: failed to save conversation: {err}")),
                );
            }
        }
    }
}
