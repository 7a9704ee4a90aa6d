//! Test helpers shared across Recollect crates.

pub mod assistant;
pub mod fixtures;
pub mod kv;
pub mod records;
pub mod upload;

pub use assistant::{FailingAssistant, FixedAssistant, RecordingAssistant};
pub use fixtures::{identity, key_pair, sample_record};
pub use kv::{FailingKvStore, InMemoryKvStore};
pub use records::InMemoryRecordStore;
pub use upload::StubUploadProcessor;
