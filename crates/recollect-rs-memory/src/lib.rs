//! Record memory and encrypted transcript persistence for Recollect.

pub mod cipher;
pub mod coalesce;
pub mod error;
pub mod identity;
pub mod kv;
pub mod ledger;
pub mod namespace;
pub mod transcript;

/// Transcript encryption interface and default implementation.
pub use cipher::{KeyPairCipher, TranscriptCipher};
/// Error message coalescing helpers.
pub use coalesce::{append_message, is_error_content};
/// Memory error type.
pub use error::MemoryError;
/// Identity key material.
pub use identity::{IdentityState, KeyPair};
/// Durable key-value slot interface and file implementation.
pub use kv::{FileKvStore, KvStore};
/// Recent-record ledger.
pub use ledger::{LedgerEntry, LedgerOptions, RecordLedger, merge_entries};
/// Storage namespace derivation.
pub use namespace::{ANONYMOUS_NAMESPACE, derive_namespace};
/// Encrypted transcript store.
pub use transcript::{
    ENCRYPTED_PREFIX, TranscriptLoad, TranscriptOptions, TranscriptStore, ensure_single_intro,
};
