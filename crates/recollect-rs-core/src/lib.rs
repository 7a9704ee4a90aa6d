//! Core chat and record primitives for Recollect.
//!
//! This crate owns local query answering, upload ingestion, the ordered
//! record write queue, the HTTP assistant client and the chat session that
//! ties them to the ledger and transcript stores.

pub mod assistant_http;
pub mod error;
pub mod file_import;
pub mod file_records;
pub mod ingest;
pub mod mentions;
pub mod query;
pub mod session;
pub mod setup;
pub mod write_queue;

pub use assistant_http::HttpAssistantClient;
pub use error::RecollectCoreError;
pub use file_import::FileImportProcessor;
pub use file_records::FileRecordStore;
pub use ingest::{Ingestor, UploadOutcome};
/// Local query answering.
pub use query::{
    LocalCount, LocalQueryResolver, QueryContext, QueryIntent, QueryOptions,
    extract_keyword_query,
};
/// Chat session facade.
pub use session::{AnswerSource, ChatSession, ChatSessionBuilder, SendOutcome};
pub use setup::FileBackend;
pub use write_queue::WriteQueue;
