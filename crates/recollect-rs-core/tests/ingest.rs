//! Upload ingestion integration tests.

use recollect_rs_core::{Ingestor, WriteQueue};
use recollect_rs_memory::{LedgerOptions, RecordLedger};
use recollect_rs_protocol::{PendingUpload, RecordStore};
use recollect_rs_test_utils::{
    InMemoryKvStore, InMemoryRecordStore, StubUploadProcessor, sample_record,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn ledger() -> Arc<RecordLedger> {
    Arc::new(RecordLedger::new(
        Arc::new(InMemoryKvStore::new()),
        LedgerOptions::default(),
    ))
}

/// Writes follow processing completion order, one at a time.
#[tokio::test]
async fn writes_follow_completion_order() {
    let processor = StubUploadProcessor::new()
        .with_batch(
            "workouts.csv",
            vec![
                sample_record("w-1", "workout", "leg day"),
                sample_record("w-2", "workout", "pull day"),
            ],
        )
        .with_delay("workouts.csv", Duration::from_millis(50))
        .with_batch("invoice.pdf", vec![sample_record("i-1", "invoice", "ACME")]);
    let store = Arc::new(InMemoryRecordStore::new());
    let ledger = ledger();
    let ingestor = Ingestor::new(
        Arc::new(processor),
        Arc::new(WriteQueue::new(store.clone())),
        ledger.clone(),
    );

    let outcomes = ingestor
        .ingest(vec![
            PendingUpload::new("workouts.csv", "date,exercise"),
            PendingUpload::new("invoice.pdf", "%PDF"),
        ])
        .await;

    assert_eq!(outcomes[0].name, "workouts.csv");
    assert_eq!(outcomes[0].stored.len(), 2);
    assert_eq!(outcomes[1].stored.len(), 1);
    assert_eq!(
        store.put_order(),
        vec!["i-1".to_string(), "w-1".to_string(), "w-2".to_string()]
    );
    assert_eq!(ledger.len().await, 3);
}

/// A failing upload does not stop the others.
#[tokio::test]
async fn failed_upload_is_isolated() {
    let processor = Arc::new(StubUploadProcessor::new().failing_on("broken.png"));
    let store = Arc::new(InMemoryRecordStore::new());
    let ledger = ledger();
    let ingestor = Ingestor::new(
        processor.clone(),
        Arc::new(WriteQueue::new(store.clone())),
        ledger.clone(),
    );

    let outcomes = ingestor
        .ingest(vec![
            PendingUpload::new("broken.png", vec![0u8, 1, 2]),
            PendingUpload::new("receipt.txt", "coffee"),
        ])
        .await;

    assert!(outcomes[0].error.is_some());
    assert!(!outcomes[0].is_success());
    assert!(outcomes[1].is_success());
    assert_eq!(store.records().len(), 1);
    assert_eq!(store.records()[0].record_type, "receipt");
    assert_eq!(ledger.len().await, 1);

    let mut seen = processor.seen();
    seen.sort();
    assert_eq!(seen, vec!["broken.png".to_string(), "receipt.txt".to_string()]);
}

/// Records already stored remotely are referenced by id only.
#[tokio::test]
async fn persisted_uploads_are_referenced_by_id() {
    let processor = StubUploadProcessor::new().persisted();
    let store = Arc::new(InMemoryRecordStore::new());
    let ledger = ledger();
    let ingestor = Ingestor::new(
        Arc::new(processor),
        Arc::new(WriteQueue::new(store.clone())),
        ledger.clone(),
    );

    let outcomes = ingestor
        .ingest(vec![PendingUpload::new("invoice.pdf", "ACME")])
        .await;
    let id = outcomes[0].stored[0].id.clone();

    let stored = store.get(&id).await.expect("get").expect("record");
    assert!(stored.synced);
    let projection = ledger.to_request_payload().await;
    assert_eq!(projection.len(), 1);
    assert!(projection[0].persisted);
    assert_eq!(projection[0].payload, None);
}

/// Local write failures are counted and leave the ledger untouched.
#[tokio::test]
async fn write_failures_are_reported() {
    let store = Arc::new(InMemoryRecordStore::new());
    store.set_failing(true);
    let ledger = ledger();
    let queue = Arc::new(WriteQueue::new(store.clone()));
    let ingestor = Ingestor::new(
        Arc::new(StubUploadProcessor::new()),
        queue.clone(),
        ledger.clone(),
    );

    let outcomes = ingestor
        .ingest(vec![
            PendingUpload::new("a.txt", "first"),
            PendingUpload::new("b.txt", "second"),
        ])
        .await;

    assert!(outcomes.iter().all(|outcome| outcome.failed_writes == 1));
    assert_eq!(queue.failure_count(), 2);
    assert_eq!(store.put_order().len(), 2);
    assert!(ledger.is_empty().await);
}
