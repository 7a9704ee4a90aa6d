use async_trait::async_trait;
use parking_lot::Mutex;
use recollect_rs_protocol::{Record, RecordFilter, RecordStore, RecordStoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory record store that ignores filters unless told otherwise,
/// so callers' own re-filtering is exercised.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<Record>>,
    honor_filters: bool,
    fail: AtomicBool,
    queries: AtomicUsize,
    puts: Mutex<Vec<String>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Apply query filters natively.
    pub fn honoring_filters(mut self) -> Self {
        self.honor_filters = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Ids in the order `put` was called.
    pub fn put_order(&self) -> Vec<String> {
        self.puts.lock().clone()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    fn check(&self) -> Result<(), RecordStoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &str) -> Result<Option<Record>, RecordStoreError> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn put(&self, record: Record) -> Result<(), RecordStoreError> {
        self.puts.lock().push(record.id.clone());
        self.check()?;
        let mut records = self.records.lock();
        match records.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn query(&self, filter: Option<&RecordFilter>) -> Result<Vec<Record>, RecordStoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let records = self.records.lock();
        Ok(records
            .iter()
            .filter(|record| match (self.honor_filters, filter) {
                (true, Some(filter)) => filter.matches(record),
                _ => true,
            })
            .cloned()
            .collect())
    }
}
