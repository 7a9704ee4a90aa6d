//! Local query answering: keyword extraction, intent classification and
//! record matching.

pub mod intent;
pub mod keywords;
pub mod matcher;
pub mod resolver;

pub use intent::{QueryIntent, classify};
pub use keywords::{STOP_WORDS, extract_keyword_query};
pub use matcher::{matches_query, searchable_text};
pub use resolver::{LocalCount, LocalQueryResolver, QueryContext, QueryOptions};
