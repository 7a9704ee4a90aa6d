use async_trait::async_trait;
use parking_lot::Mutex;
use recollect_rs_protocol::{
    PendingUpload, ProcessedUpload, Record, UploadError, UploadProcessor,
};
use std::collections::HashMap;
use std::time::Duration;

/// Processor that maps each file name to one record typed after its stem,
/// e.g. `invoice.pdf` becomes an `invoice` record.
#[derive(Default)]
pub struct StubUploadProcessor {
    persisted: bool,
    delays: HashMap<String, Duration>,
    failures: Vec<String>,
    batches: HashMap<String, Vec<Record>>,
    seen: Mutex<Vec<String>>,
}

impl StubUploadProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark produced records as already stored remotely.
    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }

    /// Delay processing of one file.
    pub fn with_delay(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(name.into(), delay);
        self
    }

    /// Fail processing of one file.
    pub fn failing_on(mut self, name: impl Into<String>) -> Self {
        self.failures.push(name.into());
        self
    }

    /// Produce a fixed set of records for one file.
    pub fn with_batch(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.batches.insert(name.into(), records);
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl UploadProcessor for StubUploadProcessor {
    async fn process(&self, upload: &PendingUpload) -> Result<ProcessedUpload, UploadError> {
        self.seen.lock().push(upload.name.clone());
        if let Some(delay) = self.delays.get(&upload.name) {
            tokio::time::sleep(*delay).await;
        }
        if self.failures.contains(&upload.name) {
            return Err(UploadError::Failed {
                name: upload.name.clone(),
                reason: "stub failure".to_string(),
            });
        }
        let records = match self.batches.get(&upload.name) {
            Some(records) => records.clone(),
            None => {
                let stem = upload
                    .name
                    .split('.')
                    .next()
                    .unwrap_or(upload.name.as_str())
                    .to_string();
                let summary = String::from_utf8_lossy(&upload.bytes).to_string();
                vec![
                    Record::new(uuid::Uuid::new_v4().to_string(), stem, summary)
                        .with_file_ref(upload.name.clone()),
                ]
            }
        };
        Ok(ProcessedUpload {
            records,
            persisted: self.persisted,
        })
    }
}
