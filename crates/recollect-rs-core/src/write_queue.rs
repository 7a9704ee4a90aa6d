//! Ordered queue for record store writes.
//!
//! Writes are applied one at a time in submission order. A failed write is
//! logged and reported to its submitter only; later writes still run.

use log::{debug, warn};
use recollect_rs_protocol::{Record, RecordStore, RecordStoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

pub struct WriteQueue {
    store: Arc<dyn RecordStore>,
    /// Tokio mutexes wake waiters in FIFO order.
    turn: Mutex<()>,
    failures: AtomicUsize,
}

impl WriteQueue {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            turn: Mutex::new(()),
            failures: AtomicUsize::new(0),
        }
    }

    /// Underlying record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Wait for earlier writes to settle, then write the record.
    pub async fn put(&self, record: Record) -> Result<(), RecordStoreError> {
        let _turn = self.turn.lock().await;
        let id = record.id.clone();
        match self.store.put(record).await {
            Ok(()) => {
                debug!("queued write applied (id={id})");
                Ok(())
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                warn!("queued write failed (id={id}): {err}");
                Err(err)
            }
        }
    }

    /// Number of writes that failed since creation.
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use pretty_assertions::assert_eq;
    use recollect_rs_protocol::RecordFilter;
    use std::time::Duration;

    /// Store that takes longer for earlier ids, so unordered writes would interleave.
    #[derive(Default)]
    struct SlowStore {
        applied: SyncMutex<Vec<String>>,
        in_flight: AtomicUsize,
        overlap: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore for SlowStore {
        async fn get(&self, _id: &str) -> Result<Option<Record>, RecordStoreError> {
            Ok(None)
        }

        async fn put(&self, record: Record) -> Result<(), RecordStoreError> {
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlap.fetch_add(1, Ordering::SeqCst);
            }
            let delay = match record.id.as_str() {
                "a" => 30,
                "b" => 10,
                _ => 1,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if record.id == "b" {
                return Err(RecordStoreError::Storage("disk full".to_string()));
            }
            self.applied.lock().push(record.id);
            Ok(())
        }

        async fn query(
            &self,
            _filter: Option<&RecordFilter>,
        ) -> Result<Vec<Record>, RecordStoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn writes_run_in_order_and_failures_are_isolated() {
        let store = Arc::new(SlowStore::default());
        let queue = WriteQueue::new(store.clone());

        let results = futures_util::future::join_all(
            ["a", "b", "c"]
                .into_iter()
                .map(|id| queue.put(Record::new(id, "note", id))),
        )
        .await;

        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(*store.applied.lock(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(store.overlap.load(Ordering::SeqCst), 0);
        assert_eq!(queue.failure_count(), 1);
    }
}
