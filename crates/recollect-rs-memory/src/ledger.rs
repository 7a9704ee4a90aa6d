//! Bounded, deduplicated ledger of recently touched records.
//!
//! Entries reference persisted records by id and carry a full snapshot for
//! records that only exist on-device. Every merge re-sorts the whole ledger by
//! `created_at` (newest first) and truncates it to capacity, then rewrites the
//! backing slot. The ledger is a cache: persistence failures are logged and
//! never surfaced to callers.

use crate::error::MemoryError;
use crate::kv::KvStore;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use recollect_rs_protocol::{LedgerProjection, Record, RecordId, RecordSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of entries retained.
pub const DEFAULT_LEDGER_CAPACITY: usize = 200;
/// Default key of the ledger slot.
pub const DEFAULT_LEDGER_KEY: &str = "recent_records";

/// A single ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: RecordId,
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<RecordSnapshot>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build an entry; persisted entries never keep a payload.
    pub fn new(
        id: impl Into<RecordId>,
        persisted: bool,
        payload: Option<RecordSnapshot>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            persisted,
            payload: if persisted { None } else { payload },
            created_at,
        }
    }

    /// Build an entry from a record, or None when the record has no id.
    pub fn from_record(record: &Record, persisted: bool, created_at: DateTime<Utc>) -> Option<Self> {
        if !record.has_id() {
            return None;
        }
        Some(Self::new(
            record.id.clone(),
            persisted,
            Some(record.snapshot()),
            created_at,
        ))
    }

    /// Projection sent to the remote assistant.
    pub fn projection(&self) -> LedgerProjection {
        LedgerProjection {
            id: self.id.clone(),
            persisted: self.persisted,
            payload: if self.persisted {
                None
            } else {
                self.payload.clone()
            },
        }
    }
}

/// Ledger sizing and storage options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOptions {
    /// Maximum number of entries retained.
    pub capacity: usize,
    /// Identity-independent key of the ledger slot.
    pub storage_key: String,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LEDGER_CAPACITY,
            storage_key: DEFAULT_LEDGER_KEY.to_string(),
        }
    }
}

/// Merge incoming entries into existing ones, then sort and truncate.
///
/// On id collision the entry with the newer `created_at` wins and supplies
/// `persisted` and `payload`; equal timestamps favour the incoming entry.
pub fn merge_entries(
    existing: Vec<LedgerEntry>,
    incoming: Vec<LedgerEntry>,
    capacity: usize,
) -> Vec<LedgerEntry> {
    let mut by_id: HashMap<RecordId, LedgerEntry> = HashMap::with_capacity(existing.len());
    for entry in existing.into_iter().chain(incoming) {
        match by_id.entry(entry.id.clone()) {
            Entry::Occupied(mut slot) => {
                if entry.created_at >= slot.get().created_at {
                    slot.insert(LedgerEntry::new(
                        entry.id,
                        entry.persisted,
                        entry.payload,
                        entry.created_at,
                    ));
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(LedgerEntry::new(
                    entry.id,
                    entry.persisted,
                    entry.payload,
                    entry.created_at,
                ));
            }
        }
    }

    let mut merged: Vec<LedgerEntry> = by_id.into_values().collect();
    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(capacity);
    merged
}

/// Recent-record ledger backed by a durable key-value slot.
pub struct RecordLedger {
    store: Arc<dyn KvStore>,
    options: LedgerOptions,
    /// Guards the read-merge-write sequence, including the slot rewrite.
    entries: Mutex<Vec<LedgerEntry>>,
}

impl RecordLedger {
    /// Create an empty ledger without reading the slot.
    pub fn new(store: Arc<dyn KvStore>, options: LedgerOptions) -> Self {
        Self {
            store,
            options,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Create a ledger and restore its entries from the slot.
    ///
    /// Unreadable or malformed slots yield an empty ledger.
    pub async fn load(store: Arc<dyn KvStore>, options: LedgerOptions) -> Self {
        let entries = match store.get(&options.storage_key).await {
            Ok(Some(raw)) => parse_entries(&raw, options.capacity),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(
                    "failed to read ledger slot (key={}): {err}",
                    options.storage_key
                );
                Vec::new()
            }
        };
        debug!("ledger loaded (entries={})", entries.len());
        Self {
            store,
            options,
            entries: Mutex::new(entries),
        }
    }

    /// Register a single record stamped with the current time.
    ///
    /// Returns false when the record has no id.
    pub async fn register_record(&self, record: &Record, persisted: bool) -> bool {
        self.register_record_at(record, persisted, Utc::now()).await
    }

    /// Register a single record with an explicit timestamp.
    pub async fn register_record_at(
        &self,
        record: &Record,
        persisted: bool,
        created_at: DateTime<Utc>,
    ) -> bool {
        let Some(entry) = LedgerEntry::from_record(record, persisted, created_at) else {
            debug!("ignoring ledger registration without id");
            return false;
        };
        self.register_entries(vec![entry]).await > 0
    }

    /// Register a batch of records produced by one operation.
    ///
    /// Returns the number of records accepted.
    pub async fn register_batch(&self, records: &[Record], persisted: bool) -> usize {
        let now = Utc::now();
        let entries: Vec<LedgerEntry> = records
            .iter()
            .filter_map(|record| LedgerEntry::from_record(record, persisted, now))
            .collect();
        self.register_entries(entries).await
    }

    /// Merge prepared entries and persist the result.
    pub async fn register_entries(&self, incoming: Vec<LedgerEntry>) -> usize {
        if incoming.is_empty() {
            return 0;
        }
        let accepted = incoming.len();
        let mut entries = self.entries.lock().await;
        let existing = std::mem::take(&mut *entries);
        *entries = merge_entries(existing, incoming, self.options.capacity);
        if let Err(err) = self.persist(&entries).await {
            warn!(
                "failed to persist ledger (key={}, entries={}): {err}",
                self.options.storage_key,
                entries.len()
            );
        }
        accepted
    }

    /// Current entries, newest first.
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().await.clone()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the ledger holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Ledger projected for transmission to the assistant.
    pub async fn to_request_payload(&self) -> Vec<LedgerProjection> {
        self.entries
            .lock()
            .await
            .iter()
            .map(LedgerEntry::projection)
            .collect()
    }

    async fn persist(&self, entries: &[LedgerEntry]) -> Result<(), MemoryError> {
        let serialized = serde_json::to_string(entries)?;
        self.store.set(&self.options.storage_key, &serialized).await?;
        debug!(
            "ledger persisted (key={}, entries={})",
            self.options.storage_key,
            entries.len()
        );
        Ok(())
    }
}

/// Parse stored entries, dropping anything that does not match the schema.
fn parse_entries(raw: &str, capacity: usize) -> Vec<LedgerEntry> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(err) => {
            warn!("discarding malformed ledger slot: {err}");
            return Vec::new();
        }
    };
    let total = values.len();
    let parsed: Vec<LedgerEntry> = values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<LedgerEntry>(value).ok())
        .filter(|entry| !entry.id.trim().is_empty())
        .collect();
    if parsed.len() != total {
        debug!(
            "dropped invalid ledger entries (dropped={})",
            total - parsed.len()
        );
    }
    merge_entries(Vec::new(), parsed, capacity)
}
