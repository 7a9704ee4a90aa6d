//! Configuration schema for Recollect.

use serde::{Deserialize, Serialize};

/// Canonical intro text shown at the head of every transcript.
pub const DEFAULT_INTRO_MESSAGE: &str = "Hi! I can answer questions about your records. \
Upload a file or ask something like \"how many invoices do I have?\"";

/// Root config for the Recollect SDK.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecollectConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl RecollectConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> RecollectConfigBuilder {
        RecollectConfigBuilder::new()
    }
}

/// Builder for assembling a `RecollectConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct RecollectConfigBuilder {
    config: RecollectConfig,
}

impl RecollectConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: RecollectConfig::default(),
        }
    }

    /// Replace the ledger configuration.
    pub fn ledger(mut self, ledger: LedgerConfig) -> Self {
        self.config.ledger = ledger;
        self
    }

    /// Replace the transcript configuration.
    pub fn transcript(mut self, transcript: TranscriptConfig) -> Self {
        self.config.transcript = transcript;
        self
    }

    /// Replace the local query configuration.
    pub fn query(mut self, query: QueryConfig) -> Self {
        self.config.query = query;
        self
    }

    /// Replace the assistant configuration.
    pub fn assistant(mut self, assistant: AssistantConfig) -> Self {
        self.config.assistant = assistant;
        self
    }

    /// Replace the storage configuration.
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    /// Finalize and return the built `RecollectConfig`.
    pub fn build(self) -> RecollectConfig {
        self.config
    }
}

/// Recent-record ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_capacity")]
    pub capacity: usize,
    #[serde(default = "default_ledger_key")]
    pub storage_key: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: default_ledger_capacity(),
            storage_key: default_ledger_key(),
        }
    }
}

fn default_ledger_capacity() -> usize {
    200
}

fn default_ledger_key() -> String {
    "recent_records".to_string()
}

/// Transcript persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptConfig {
    /// Base key; the identity hash is appended as `<base>:<hash>`.
    #[serde(default = "default_transcript_key")]
    pub base_key: String,
    #[serde(default = "default_intro_message")]
    pub intro_message: String,
    /// Encrypt transcripts when key material is available.
    #[serde(default = "default_true")]
    pub encrypt: bool,
    /// Bytes encoded per base64 chunk; must be a multiple of 3.
    #[serde(default = "default_base64_chunk_bytes")]
    pub base64_chunk_bytes: usize,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            base_key: default_transcript_key(),
            intro_message: default_intro_message(),
            encrypt: true,
            base64_chunk_bytes: default_base64_chunk_bytes(),
        }
    }
}

fn default_transcript_key() -> String {
    "chat_messages".to_string()
}

fn default_intro_message() -> String {
    DEFAULT_INTRO_MESSAGE.to_string()
}

fn default_base64_chunk_bytes() -> usize {
    3 * 8192
}

/// Local query answering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryConfig {
    #[serde(default = "default_true")]
    pub local_answering: bool,
    #[serde(default = "default_max_short_query_words")]
    pub max_short_query_words: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            local_answering: true,
            max_short_query_words: default_max_short_query_words(),
        }
    }
}

fn default_max_short_query_words() -> usize {
    5
}

/// Remote assistant endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// On-device storage location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<String>,
}

fn default_true() -> bool {
    true
}
