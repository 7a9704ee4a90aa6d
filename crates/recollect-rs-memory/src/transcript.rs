//! Per-identity transcript persistence with optional encryption.
//!
//! Slots are keyed `<base_key>:<namespace>`. Encrypted blobs carry the
//! `encrypted:` prefix followed by base64 ciphertext; anything without the
//! prefix is read as legacy plaintext JSON.

use crate::cipher::TranscriptCipher;
use crate::error::MemoryError;
use crate::identity::{IdentityState, KeyPair};
use crate::kv::KvStore;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info, warn};
use recollect_rs_protocol::{ChatMessage, ChatRole, RecordSnapshot, timestamp};
use serde_json::Value;
use std::sync::Arc;

/// Prefix marking an encrypted transcript blob.
pub const ENCRYPTED_PREFIX: &str = "encrypted:";
/// Default base key for transcript slots.
pub const DEFAULT_TRANSCRIPT_KEY: &str = "chat_messages";
/// Default number of bytes encoded per base64 chunk.
pub const DEFAULT_BASE64_CHUNK_BYTES: usize = 3 * 8192;

/// Transcript storage options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptOptions {
    /// Base key; the identity namespace is appended.
    pub base_key: String,
    /// Canonical intro text.
    pub intro_message: String,
    /// Encrypt when key material is available.
    pub encrypt: bool,
    /// Bytes per base64 chunk; a multiple of 3 keeps chunks concatenable.
    pub base64_chunk_bytes: usize,
}

impl TranscriptOptions {
    /// Options with the given intro text and default storage settings.
    pub fn with_intro(intro_message: impl Into<String>) -> Self {
        Self {
            base_key: DEFAULT_TRANSCRIPT_KEY.to_string(),
            intro_message: intro_message.into(),
            encrypt: true,
            base64_chunk_bytes: DEFAULT_BASE64_CHUNK_BYTES,
        }
    }
}

/// Outcome of reading a transcript slot.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptLoad {
    /// Validated messages with exactly one leading intro.
    Ready(Vec<ChatMessage>),
    /// The slot is encrypted and key material has not loaded yet; retry later.
    NotYetReadable,
}

impl TranscriptLoad {
    /// Messages when readable, otherwise an empty list.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            TranscriptLoad::Ready(messages) => messages,
            TranscriptLoad::NotYetReadable => Vec::new(),
        }
    }

    /// Whether the caller must retry once keys are available.
    pub fn is_pending(&self) -> bool {
        matches!(self, TranscriptLoad::NotYetReadable)
    }
}

/// Durable transcript store scoped by identity namespace.
pub struct TranscriptStore {
    kv: Arc<dyn KvStore>,
    cipher: Arc<dyn TranscriptCipher>,
    options: TranscriptOptions,
}

impl TranscriptStore {
    /// Create a transcript store over a key-value backend.
    pub fn new(
        kv: Arc<dyn KvStore>,
        cipher: Arc<dyn TranscriptCipher>,
        options: TranscriptOptions,
    ) -> Self {
        info!(
            "initialized transcript store (base_key={}, encrypt={})",
            options.base_key, options.encrypt
        );
        Self {
            kv,
            cipher,
            options,
        }
    }

    /// Store options.
    pub fn options(&self) -> &TranscriptOptions {
        &self.options
    }

    /// Slot key for an identity, or None while keys are loading.
    pub fn slot_key(&self, identity: &IdentityState) -> Option<String> {
        identity
            .namespace()
            .map(|namespace| format!("{}:{namespace}", self.options.base_key))
    }

    /// A transcript holding only the intro message.
    pub fn fresh(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::intro(self.options.intro_message.clone())]
    }

    /// Read the transcript for an identity.
    ///
    /// Storage read failures and loading identities report `NotYetReadable`;
    /// corrupt content degrades to a fresh transcript.
    pub async fn load(&self, identity: &IdentityState) -> TranscriptLoad {
        let Some(slot) = self.slot_key(identity) else {
            debug!("transcript load deferred until identity keys load");
            return TranscriptLoad::NotYetReadable;
        };
        let raw = match self.kv.get(&slot).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to read transcript slot (slot={slot}): {err}");
                return TranscriptLoad::NotYetReadable;
            }
        };
        self.decode(raw.as_deref(), identity.key_pair())
    }

    /// Decode a stored slot value.
    pub fn decode(&self, raw: Option<&str>, keys: Option<&KeyPair>) -> TranscriptLoad {
        let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
            return TranscriptLoad::Ready(self.fresh());
        };

        let Some(encoded) = raw.strip_prefix(ENCRYPTED_PREFIX) else {
            return TranscriptLoad::Ready(match serde_json::from_str::<Value>(raw) {
                Ok(value) => self.validate(value),
                Err(err) => {
                    warn!("discarding malformed plaintext transcript: {err}");
                    self.fresh()
                }
            });
        };

        let Some(keys) = keys else {
            debug!("encrypted transcript found without key material");
            return TranscriptLoad::NotYetReadable;
        };
        match self.open(encoded, keys) {
            Ok(value) => TranscriptLoad::Ready(self.validate(value)),
            Err(err) => {
                warn!("discarding unreadable encrypted transcript: {err}");
                TranscriptLoad::Ready(self.fresh())
            }
        }
    }

    /// Persist a transcript for an identity.
    pub async fn save(
        &self,
        messages: &[ChatMessage],
        identity: &IdentityState,
    ) -> Result<(), MemoryError> {
        let slot = self
            .slot_key(identity)
            .ok_or(MemoryError::IdentityLoading)?;
        let encoded = self.encode(messages, identity.key_pair())?;
        self.kv.set(&slot, &encoded).await?;
        debug!(
            "transcript saved (slot={slot}, messages={}, encrypted={})",
            messages.len(),
            encoded.starts_with(ENCRYPTED_PREFIX)
        );
        Ok(())
    }

    /// Encode a transcript into its stored form.
    ///
    /// Encryption failures fall back to plaintext so the transcript survives.
    pub fn encode(
        &self,
        messages: &[ChatMessage],
        keys: Option<&KeyPair>,
    ) -> Result<String, MemoryError> {
        let plaintext = serde_json::to_string(messages)?;
        let Some(keys) = keys.filter(|_| self.options.encrypt) else {
            return Ok(plaintext);
        };
        match self.cipher.encrypt(keys, plaintext.as_bytes()) {
            Ok(ciphertext) => Ok(format!(
                "{ENCRYPTED_PREFIX}{}",
                encode_chunked(&ciphertext, self.options.base64_chunk_bytes)
            )),
            Err(err) => {
                warn!("transcript encryption failed; storing plaintext: {err}");
                Ok(plaintext)
            }
        }
    }

    fn open(&self, encoded: &str, keys: &KeyPair) -> Result<Value, MemoryError> {
        let ciphertext = STANDARD.decode(encoded.trim())?;
        let plaintext = self.cipher.decrypt(keys, &ciphertext)?;
        let text = String::from_utf8(plaintext)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Keep well-formed messages and enforce a single leading intro.
    fn validate(&self, value: Value) -> Vec<ChatMessage> {
        let Value::Array(items) = value else {
            warn!("stored transcript is not a list; starting fresh");
            return self.fresh();
        };
        let total = items.len();
        let messages: Vec<ChatMessage> = items.iter().filter_map(parse_message).collect();
        if messages.len() != total {
            debug!(
                "dropped invalid transcript messages (dropped={})",
                total - messages.len()
            );
        }
        ensure_single_intro(messages, &self.options.intro_message)
    }
}

/// Parse one stored message, rejecting it when a required field is invalid.
fn parse_message(value: &Value) -> Option<ChatMessage> {
    let object = value.as_object()?;
    let role = ChatRole::parse(object.get("role")?.as_str()?)?;
    let content = object.get("content")?.as_str()?.to_string();
    let timestamp = timestamp::parse_loose(object.get("timestamp")?)?;

    let records_queried = object
        .get("recordsQueried")
        .and_then(|raw| serde_json::from_value::<Vec<RecordSnapshot>>(raw.clone()).ok());
    let records_total_count = object
        .get("recordsTotalCount")
        .and_then(Value::as_u64)
        .and_then(|count| usize::try_from(count).ok());
    let error_count = object
        .get("errorCount")
        .and_then(Value::as_u64)
        .and_then(|count| u32::try_from(count).ok());
    let flag = |key: &str| object.get(key).and_then(Value::as_bool).unwrap_or(false);

    Some(ChatMessage {
        role,
        content,
        timestamp: timestamp::truncate_to_millis(timestamp),
        records_queried,
        records_total_count,
        is_error: flag("isError"),
        error_count,
        is_intro: flag("isIntro"),
    })
}

/// Keep the first intro (by flag or exact text) at the front and drop the rest.
pub fn ensure_single_intro(messages: Vec<ChatMessage>, intro_text: &str) -> Vec<ChatMessage> {
    let mut intro: Option<ChatMessage> = None;
    let mut rest = Vec::with_capacity(messages.len());
    for message in messages {
        let is_intro = message.is_intro
            || (message.role == ChatRole::Assistant && message.content == intro_text);
        if !is_intro {
            rest.push(message);
        } else if intro.is_none() {
            intro = Some(ChatMessage {
                is_intro: true,
                ..message
            });
        }
    }
    let mut result = Vec::with_capacity(rest.len() + 1);
    result.push(intro.unwrap_or_else(|| ChatMessage::intro(intro_text)));
    result.extend(rest);
    result
}

/// Base64-encode in fixed-size chunks; chunk sizes that are multiples of 3
/// produce output identical to a single-pass encoding.
fn encode_chunked(bytes: &[u8], chunk_bytes: usize) -> String {
    let chunk_bytes = match chunk_bytes {
        0 => DEFAULT_BASE64_CHUNK_BYTES,
        n => n - n % 3,
    }
    .max(3);
    let mut encoded = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(chunk_bytes) {
        STANDARD.encode_string(chunk, &mut encoded);
    }
    encoded
}
