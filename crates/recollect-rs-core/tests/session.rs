//! Chat session integration tests.

use async_trait::async_trait;
use recollect_rs_core::session::{IDENTITY_LOADING_MESSAGE, IDENTITY_REQUIRED_MESSAGE};
use recollect_rs_core::{
    AnswerSource, ChatSession, Ingestor, QueryContext, RecollectCoreError, WriteQueue,
};
use recollect_rs_memory::{
    IdentityState, KeyPairCipher, LedgerOptions, RecordLedger, TranscriptOptions, TranscriptStore,
};
use recollect_rs_protocol::{
    AssistantClient, AssistantError, AssistantRequest, AssistantResponse, ChatMessage,
    PendingUpload, Record,
};
use recollect_rs_test_utils::{
    FailingAssistant, FailingKvStore, FixedAssistant, InMemoryKvStore, InMemoryRecordStore,
    RecordingAssistant, StubUploadProcessor, identity, sample_record,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::Notify;

const INTRO: &str = "Hi! Ask me about your records.";

struct Harness {
    kv: Arc<InMemoryKvStore>,
    records: Arc<InMemoryRecordStore>,
    ledger: Arc<RecordLedger>,
}

impl Harness {
    fn new(records: Vec<Record>) -> Self {
        let kv = Arc::new(InMemoryKvStore::new());
        let ledger = Arc::new(RecordLedger::new(kv.clone(), LedgerOptions::default()));
        Self {
            kv,
            records: Arc::new(InMemoryRecordStore::with_records(records)),
            ledger,
        }
    }

    fn transcript(&self) -> TranscriptStore {
        TranscriptStore::new(
            self.kv.clone(),
            Arc::new(KeyPairCipher),
            TranscriptOptions::with_intro(INTRO),
        )
    }

    async fn open(
        &self,
        assistant: Option<Arc<dyn AssistantClient>>,
        identity: IdentityState,
    ) -> ChatSession {
        let ingestor = Ingestor::new(
            Arc::new(StubUploadProcessor::new()),
            Arc::new(WriteQueue::new(self.records.clone())),
            self.ledger.clone(),
        );
        let mut builder = ChatSession::builder(
            self.transcript(),
            self.ledger.clone(),
            self.records.clone(),
        )
        .ingestor(ingestor);
        if let Some(assistant) = assistant {
            builder = builder.assistant(assistant);
        }
        builder.open(identity).await
    }
}

fn no_context() -> QueryContext<'static> {
    QueryContext::default()
}

/// An offline upload is counted locally without contacting the assistant.
#[tokio::test]
async fn offline_upload_is_answered_locally() {
    let harness = Harness::new(Vec::new());
    let (assistant, requests) = RecordingAssistant::new(AssistantResponse::text("remote"));
    let session = harness
        .open(Some(Arc::new(assistant)), identity("alice"))
        .await;

    let outcomes = session
        .upload(vec![PendingUpload::new("invoice.pdf", "ACME invoice for March")])
        .await
        .expect("upload");
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    assert!(!outcomes[0].persisted);

    let entries = harness.ledger.entries().await;
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].persisted);
    let payload = entries[0].payload.as_ref().expect("payload");
    assert_eq!(payload.record_type, "invoice");
    assert_eq!(payload.summary, "ACME invoice for March");

    let outcome = session
        .send("how many invoices do I have", &no_context())
        .await
        .expect("send");
    assert_eq!(outcome.source, AnswerSource::Local);
    assert_eq!(outcome.reply.records_total_count, Some(1));
    assert_eq!(outcome.reply.records_queried, None);
    assert!(requests.lock().is_empty());

    let messages = session.messages().await;
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            INTRO,
            "Added 1 record from invoice.pdf.",
            "how many invoices do I have",
            "You have 1 record matching \"invoices\".",
        ]
    );
}

/// Repeated assistant failures collapse into one counted error.
#[tokio::test]
async fn repeated_failures_coalesce_into_one_error() {
    let harness = Harness::new(Vec::new());
    let session = harness
        .open(
            Some(Arc::new(FailingAssistant::new("connection refused"))),
            identity("alice"),
        )
        .await;

    for _ in 0..3 {
        let outcome = session
            .send("summarize my spending for this year please", &no_context())
            .await
            .expect("send");
        assert_eq!(outcome.source, AnswerSource::Notice);
    }

    let messages = session.messages().await;
    let errors: Vec<&ChatMessage> = messages.iter().filter(|m| m.is_error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_count, Some(3));
    assert_eq!(messages.len(), 5);
}

/// Remote requests carry the transcript without the intro, the ledger, and
/// unsynced mentioned records; returned records land in the ledger.
#[tokio::test]
async fn remote_request_carries_context_and_registers_results() {
    let local = sample_record("rec-1", "workout", "leg day");
    let synced = sample_record("rec-2", "invoice", "ACME invoice").synced();
    let harness = Harness::new(vec![local.clone(), synced.clone()]);
    let returned = sample_record("rec-9", "invoice", "Globex invoice").synced();
    let response = AssistantResponse {
        records_queried: Some(vec![returned.clone()]),
        records_total_count: Some(4),
        ..AssistantResponse::text("Here is the comparison.")
    };
    let (assistant, requests) = RecordingAssistant::new(response);
    let session = harness
        .open(Some(Arc::new(assistant)), identity("alice"))
        .await;

    let outcome = session
        .send("compare rec-1 with rec-2 and summarize", &no_context())
        .await
        .expect("send");
    assert_eq!(outcome.source, AnswerSource::Remote);
    assert_eq!(outcome.reply.content, "Here is the comparison.");
    assert_eq!(outcome.reply.records_total_count, Some(4));
    assert_eq!(
        outcome.reply.records_queried,
        Some(vec![returned.snapshot()])
    );

    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    let request: &AssistantRequest = &requests[0];
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].content, "compare rec-1 with rec-2 and summarize");
    assert_eq!(request.local_records, Some(vec![local.clone()]));

    let mut projection = request.recent_records.clone();
    projection.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(projection.len(), 2);
    assert_eq!(projection[0].id, "rec-1");
    assert!(!projection[0].persisted);
    assert_eq!(projection[0].payload, Some(local.snapshot()));
    assert_eq!(projection[1].id, "rec-2");
    assert!(projection[1].persisted);
    assert_eq!(projection[1].payload, None);

    let ledger_ids: Vec<String> = harness
        .ledger
        .entries()
        .await
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    assert!(ledger_ids.contains(&"rec-9".to_string()));
}

/// Remote chat without a linked identity yields an instructive message.
#[tokio::test]
async fn missing_identity_gets_instructions() {
    let harness = Harness::new(vec![sample_record("rec-1", "invoice", "ACME")]);
    let (assistant, requests) = RecordingAssistant::new(AssistantResponse::text("remote"));
    let session = harness
        .open(Some(Arc::new(assistant)), IdentityState::Missing)
        .await;

    let outcome = session
        .send("what should I budget for next month overall", &no_context())
        .await
        .expect("send");
    assert_eq!(outcome.source, AnswerSource::Notice);
    assert_eq!(outcome.reply.content, IDENTITY_REQUIRED_MESSAGE);
    assert!(!outcome.reply.is_error);
    assert!(requests.lock().is_empty());

    let local = session
        .send("how many records", &no_context())
        .await
        .expect("send");
    assert_eq!(local.source, AnswerSource::Local);
    assert_eq!(local.reply.records_total_count, Some(1));
}

/// Local store failures fall through to the assistant silently.
#[tokio::test]
async fn local_failure_falls_through_to_assistant() {
    let harness = Harness::new(vec![sample_record("rec-1", "invoice", "ACME")]);
    harness.records.set_failing(true);
    let (assistant, requests) = RecordingAssistant::new(AssistantResponse::text("You have one."));
    let session = harness
        .open(Some(Arc::new(assistant)), identity("alice"))
        .await;

    let outcome = session
        .send("how many invoices do I have", &no_context())
        .await
        .expect("send");
    assert_eq!(outcome.source, AnswerSource::Remote);
    assert_eq!(requests.lock().len(), 1);
    assert!(session.messages().await.iter().all(|m| !m.is_error));
}

/// Failed transcript writes show up as a single counted error.
#[tokio::test]
async fn save_failures_surface_as_one_error() {
    let harness = Harness::new(Vec::new());
    let session = harness
        .open(Some(Arc::new(FixedAssistant::new("ok"))), identity("alice"))
        .await;
    harness.kv.set_fail_writes(true);

    let outcome = session
        .send("what should I budget for next month overall", &no_context())
        .await
        .expect("send");
    assert_eq!(outcome.source, AnswerSource::Remote);
    assert_eq!(harness.kv.write_count(), 2);

    let messages = session.messages().await;
    let errors: Vec<&ChatMessage> = messages.iter().filter(|m| m.is_error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_count, Some(2));
    assert!(errors[0].content.contains("quota exceeded"));
    assert_eq!(messages.len(), 4);
}

/// Unreadable storage defers the transcript but local answers still work.
#[tokio::test]
async fn unreadable_storage_defers_transcript() {
    let records = Arc::new(InMemoryRecordStore::with_records(vec![sample_record(
        "rec-1", "invoice", "ACME",
    )]));
    let ledger =
        Arc::new(RecordLedger::load(Arc::new(FailingKvStore), LedgerOptions::default()).await);
    assert!(ledger.is_empty().await);
    let transcript = TranscriptStore::new(
        Arc::new(FailingKvStore),
        Arc::new(KeyPairCipher),
        TranscriptOptions::with_intro(INTRO),
    );
    let session = ChatSession::builder(transcript, ledger, records)
        .open(identity("alice"))
        .await;
    assert!(session.is_awaiting_keys().await);

    let outcome = session
        .send("how many records", &no_context())
        .await
        .expect("send");
    assert_eq!(outcome.source, AnswerSource::Local);
    assert_eq!(outcome.reply.records_total_count, Some(1));
    assert_eq!(session.messages().await.len(), 2);
}

/// Switching identity loads that identity's own transcript.
#[tokio::test]
async fn identity_switch_isolates_transcripts() {
    let harness = Harness::new(vec![sample_record("rec-1", "invoice", "ACME")]);
    let session = harness.open(None, identity("alice")).await;
    session
        .send("how many records", &no_context())
        .await
        .expect("send");
    assert_eq!(session.messages().await.len(), 3);

    session.switch_identity(identity("bob")).await;
    let bob_view = session.messages().await;
    assert_eq!(bob_view.len(), 1);
    assert!(bob_view[0].is_intro);
    session.send("records", &no_context()).await.expect("send");

    session.switch_identity(identity("alice")).await;
    let alice_view = session.messages().await;
    assert_eq!(alice_view.len(), 3);
    assert_eq!(alice_view[1].content, "how many records");
    assert!(alice_view.iter().all(|m| m.content != "records"));

    let slots: Vec<String> = harness
        .kv
        .keys()
        .into_iter()
        .filter(|key| key.starts_with("chat_messages:"))
        .collect();
    assert_eq!(slots.len(), 2);
}

/// A transcript encrypted for an identity waits for its keys, then absorbs
/// messages sent in the meantime.
#[tokio::test]
async fn deferred_transcript_loads_once_keys_arrive() {
    let harness = Harness::new(vec![sample_record("rec-1", "invoice", "ACME")]);
    let alice = identity("alice");
    let stored = vec![
        ChatMessage::intro(INTRO),
        ChatMessage::user("earlier question"),
        ChatMessage::assistant("earlier answer"),
    ];
    harness
        .transcript()
        .save(&stored, &alice)
        .await
        .expect("seed");

    let (assistant, requests) = RecordingAssistant::new(AssistantResponse::text("remote"));
    let session = harness
        .open(Some(Arc::new(assistant)), IdentityState::Loading)
        .await;
    assert!(session.is_awaiting_keys().await);
    assert!(session.messages().await.is_empty());

    let notice = session
        .send("what should I budget for next month overall", &no_context())
        .await
        .expect("send");
    assert_eq!(notice.reply.content, IDENTITY_LOADING_MESSAGE);
    assert!(requests.lock().is_empty());

    assert!(session.reload_if_awaiting_keys(alice.clone()).await);
    assert!(!session.reload_if_awaiting_keys(alice.clone()).await);
    let contents: Vec<String> = session
        .messages()
        .await
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(
        contents,
        vec![
            INTRO.to_string(),
            "earlier question".to_string(),
            "earlier answer".to_string(),
            "what should I budget for next month overall".to_string(),
            IDENTITY_LOADING_MESSAGE.to_string(),
        ]
    );

    let reloaded = harness.transcript().load(&alice).await.into_messages();
    assert_eq!(reloaded.len(), 5);
}

/// Assistant that blocks until released, to interleave an identity switch.
struct GatedAssistant {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl AssistantClient for GatedAssistant {
    async fn send(&self, _request: &AssistantRequest) -> Result<AssistantResponse, AssistantError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(AssistantResponse::text("late answer"))
    }
}

/// Replies for a superseded identity are dropped.
#[tokio::test]
async fn reply_after_identity_switch_is_dropped() {
    let harness = Harness::new(Vec::new());
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let assistant = GatedAssistant {
        started: started.clone(),
        release: release.clone(),
    };
    let session = harness
        .open(Some(Arc::new(assistant)), identity("alice"))
        .await;

    let context = no_context();
    let (result, ()) = tokio::join!(
        session.send("what should I budget for next month overall", &context),
        async {
            started.notified().await;
            session.switch_identity(identity("bob")).await;
            release.notify_one();
        }
    );
    assert!(matches!(result, Err(RecollectCoreError::IdentityChanged)));

    let bob_view = session.messages().await;
    assert_eq!(bob_view.len(), 1);
    let alice_view = harness.transcript().load(&identity("alice")).await.into_messages();
    assert!(alice_view.iter().all(|m| m.content != "late answer"));
    assert_eq!(alice_view.len(), 2);
}
