//! Upload ingestion: parallel processing, ordered persistence, ledger updates.

use crate::write_queue::WriteQueue;
use futures_util::future::join_all;
use log::{info, warn};
use recollect_rs_memory::RecordLedger;
use recollect_rs_protocol::{PendingUpload, Record, UploadProcessor};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of ingesting one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// Upload file name.
    pub name: String,
    /// Records written to the on-device store.
    pub stored: Vec<Record>,
    /// Whether the records are stored remotely as well.
    pub persisted: bool,
    /// Records whose local write failed.
    pub failed_writes: usize,
    /// Processing error, if the upload produced nothing.
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.failed_writes == 0
    }
}

/// Drives uploads through a processor into the record store and ledger.
pub struct Ingestor {
    processor: Arc<dyn UploadProcessor>,
    queue: Arc<WriteQueue>,
    ledger: Arc<RecordLedger>,
}

impl Ingestor {
    pub fn new(
        processor: Arc<dyn UploadProcessor>,
        queue: Arc<WriteQueue>,
        ledger: Arc<RecordLedger>,
    ) -> Self {
        Self {
            processor,
            queue,
            ledger,
        }
    }

    /// Process uploads concurrently; outcomes follow input order.
    pub async fn ingest(&self, uploads: Vec<PendingUpload>) -> Vec<UploadOutcome> {
        let total = uploads.len();
        let outcomes = join_all(uploads.iter().map(|upload| self.ingest_one(upload))).await;
        let stored: usize = outcomes.iter().map(|outcome| outcome.stored.len()).sum();
        info!("ingested uploads (files={total}, records={stored})");
        outcomes
    }

    async fn ingest_one(&self, upload: &PendingUpload) -> UploadOutcome {
        let processed = match self.processor.process(upload).await {
            Ok(processed) => processed,
            Err(err) => {
                warn!("upload processing failed (name={}): {err}", upload.name);
                return UploadOutcome {
                    name: upload.name.clone(),
                    stored: Vec::new(),
                    persisted: false,
                    failed_writes: 0,
                    error: Some(err.to_string()),
                };
            }
        };

        let mut stored = Vec::with_capacity(processed.records.len());
        let mut failed_writes = 0;
        for mut record in processed.records {
            if !record.has_id() {
                record.id = Uuid::new_v4().to_string();
            }
            if processed.persisted {
                record.synced = true;
            }
            match self.queue.put(record.clone()).await {
                Ok(()) => stored.push(record),
                Err(_) => failed_writes += 1,
            }
        }

        self.ledger
            .register_batch(&stored, processed.persisted)
            .await;
        UploadOutcome {
            name: upload.name.clone(),
            stored,
            persisted: processed.persisted,
            failed_writes,
            error: None,
        }
    }
}
