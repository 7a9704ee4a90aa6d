//! Config mapping and file-backed session assembly.

use crate::assistant_http::HttpAssistantClient;
use crate::error::RecollectCoreError;
use crate::file_records::FileRecordStore;
use crate::ingest::Ingestor;
use crate::query::QueryOptions;
use crate::session::ChatSession;
use crate::write_queue::WriteQueue;
use log::info;
use recollect_rs_config::RecollectConfig;
use recollect_rs_memory::{
    FileKvStore, IdentityState, KeyPairCipher, KvStore, LedgerOptions, RecordLedger,
    TranscriptOptions, TranscriptStore,
};
use recollect_rs_protocol::{RecordStore, UploadProcessor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Directory under the data root holding key-value slots.
const SLOTS_DIR: &str = "slots";

/// Translate ledger config into runtime options.
pub fn ledger_options_from_config(config: &recollect_rs_config::LedgerConfig) -> LedgerOptions {
    LedgerOptions {
        capacity: config.capacity,
        storage_key: config.storage_key.clone(),
    }
}

/// Translate transcript config into runtime options.
pub fn transcript_options_from_config(
    config: &recollect_rs_config::TranscriptConfig,
) -> TranscriptOptions {
    TranscriptOptions {
        base_key: config.base_key.clone(),
        intro_message: config.intro_message.clone(),
        encrypt: config.encrypt,
        base64_chunk_bytes: config.base64_chunk_bytes,
    }
}

/// Translate query config into runtime options.
pub fn query_options_from_config(config: &recollect_rs_config::QueryConfig) -> QueryOptions {
    QueryOptions {
        local_answering: config.local_answering,
        max_short_query_words: config.max_short_query_words,
    }
}

/// Resolve the data directory from config, falling back to the given default.
pub fn data_root(config: &RecollectConfig, fallback: impl AsRef<Path>) -> PathBuf {
    config
        .storage
        .path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| fallback.as_ref().to_path_buf())
}

/// File-backed collaborators under one data directory.
pub struct FileBackend {
    pub kv: Arc<dyn KvStore>,
    pub records: Arc<dyn RecordStore>,
    pub ledger: Arc<RecordLedger>,
}

impl FileBackend {
    /// Open the key-value slots, record store and ledger under `root`.
    pub async fn open(config: &RecollectConfig, root: &Path) -> Result<Self, RecollectCoreError> {
        let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::new(root.join(SLOTS_DIR))?);
        let records: Arc<dyn RecordStore> = Arc::new(FileRecordStore::open(root)?);
        let ledger = Arc::new(
            RecordLedger::load(kv.clone(), ledger_options_from_config(&config.ledger)).await,
        );
        info!("opened file backend (root={})", root.display());
        Ok(Self {
            kv,
            records,
            ledger,
        })
    }

    /// Transcript store over the backend's slots.
    pub fn transcript(&self, config: &RecollectConfig) -> TranscriptStore {
        TranscriptStore::new(
            self.kv.clone(),
            Arc::new(KeyPairCipher),
            transcript_options_from_config(&config.transcript),
        )
    }

    /// Upload ingestor writing through an ordered queue.
    pub fn ingestor(&self, processor: Arc<dyn UploadProcessor>) -> Ingestor {
        Ingestor::new(
            processor,
            Arc::new(WriteQueue::new(self.records.clone())),
            self.ledger.clone(),
        )
    }

    /// Open a chat session with the configured assistant endpoint, if any.
    pub async fn session(
        &self,
        config: &RecollectConfig,
        identity: IdentityState,
        processor: Option<Arc<dyn UploadProcessor>>,
    ) -> Result<ChatSession, RecollectCoreError> {
        let mut builder = ChatSession::builder(
            self.transcript(config),
            self.ledger.clone(),
            self.records.clone(),
        )
        .query_options(query_options_from_config(&config.query));
        if let Some(endpoint) = &config.assistant.endpoint {
            let client = HttpAssistantClient::new(
                endpoint.clone(),
                Duration::from_secs(config.assistant.timeout_secs),
            )?;
            builder = builder.assistant(Arc::new(client));
        }
        if let Some(processor) = processor {
            builder = builder.ingestor(self.ingestor(processor));
        }
        Ok(builder.open(identity).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_maps_onto_runtime_options() {
        let config = RecollectConfig::load_from_str(
            r#"{
                ledger: { capacity: 10, storage_key: "ledger" },
                transcript: { base_key: "chat", encrypt: false, base64_chunk_bytes: 300 },
                query: { local_answering: false, max_short_query_words: 3 },
            }"#,
        )
        .expect("config");
        assert_eq!(
            ledger_options_from_config(&config.ledger),
            LedgerOptions {
                capacity: 10,
                storage_key: "ledger".to_string()
            }
        );
        let transcript = transcript_options_from_config(&config.transcript);
        assert_eq!(transcript.base_key, "chat");
        assert!(!transcript.encrypt);
        assert_eq!(transcript.base64_chunk_bytes, 300);
        assert_eq!(
            query_options_from_config(&config.query),
            QueryOptions {
                local_answering: false,
                max_short_query_words: 3
            }
        );
    }

    #[test]
    fn data_root_prefers_configured_path() {
        let config = RecollectConfig::default();
        assert_eq!(data_root(&config, "/tmp/default"), PathBuf::from("/tmp/default"));
        let config = RecollectConfig::builder()
            .storage(recollect_rs_config::StorageConfig {
                path: Some("/data/recollect".to_string()),
            })
            .build();
        assert_eq!(data_root(&config, "/tmp/default"), PathBuf::from("/data/recollect"));
    }
}
