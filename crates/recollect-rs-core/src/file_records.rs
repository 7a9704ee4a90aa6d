//! JSONL-backed on-device record store.

use async_trait::async_trait;
use log::{info, warn};
use recollect_rs_protocol::{Record, RecordFilter, RecordStore, RecordStoreError};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const RECORDS_FILENAME: &str = "records.jsonl";

/// Record store holding one JSON record per line, rewritten atomically on put.
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    records: Mutex<Vec<Record>>,
}

impl FileRecordStore {
    /// Open (or create) the store under a data directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, RecordStoreError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(storage_error)?;
        let path = root.join(RECORDS_FILENAME);
        let records = load_records(&path)?;
        info!(
            "initialized file record store (path={}, records={})",
            path.display(),
            records.len()
        );
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    fn write_records(&self, records: &[Record]) -> Result<(), RecordStoreError> {
        let temp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)
                .map_err(storage_error)?;
            for record in records {
                let line = serde_json::to_string(record)
                    .map_err(|err| RecordStoreError::InvalidRecord(err.to_string()))?;
                writeln!(file, "{line}").map_err(storage_error)?;
            }
        }
        std::fs::rename(&temp_path, &self.path).map_err(storage_error)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get(&self, id: &str) -> Result<Option<Record>, RecordStoreError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn put(&self, record: Record) -> Result<(), RecordStoreError> {
        if !record.has_id() {
            return Err(RecordStoreError::InvalidRecord(
                "record id must not be empty".to_string(),
            ));
        }
        let mut records = self.records.lock().await;
        let mut updated = records.clone();
        match updated.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => updated.push(record),
        }
        self.write_records(&updated)?;
        *records = updated;
        Ok(())
    }

    async fn query(&self, filter: Option<&RecordFilter>) -> Result<Vec<Record>, RecordStoreError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|record| filter.is_none_or(|filter| filter.matches(record)))
            .cloned()
            .collect())
    }
}

fn storage_error(err: std::io::Error) -> RecordStoreError {
    RecordStoreError::Storage(err.to_string())
}

fn load_records(path: &Path) -> Result<Vec<Record>, RecordStoreError> {
    let file = match OpenOptions::new().read(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(storage_error(err)),
    };
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(storage_error)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(trimmed) {
            Ok(record) => records.push(record),
            Err(err) => warn!("invalid record line ignored: {err}"),
        }
    }
    Ok(records)
}
