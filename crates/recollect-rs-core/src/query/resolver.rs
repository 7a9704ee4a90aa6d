//! Local answering of count questions against the on-device record store.

use super::intent::{QueryIntent, classify};
use super::matcher::matches_query;
use crate::error::RecollectCoreError;
use log::{debug, info, warn};
use recollect_rs_protocol::{ChatMessage, Record, RecordFilter, RecordStore};
use std::sync::Arc;

/// Local answering settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Disable to always defer to the remote assistant.
    pub local_answering: bool,
    /// Word limit for short keyword queries.
    pub max_short_query_words: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            local_answering: true,
            max_short_query_words: 5,
        }
    }
}

/// Ambient UI state consulted when answering.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryContext<'a> {
    /// Active record type filter.
    pub type_filter: Option<&'a str>,
    /// Text in the record search box, used when the utterance has no keywords.
    pub search_box: Option<&'a str>,
}

/// Result of counting matching records.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalCount {
    pub count: usize,
    pub keywords: Option<String>,
    pub type_filter: Option<String>,
}

impl LocalCount {
    /// Natural-language answer for the count.
    pub fn sentence(&self) -> String {
        let noun = match (&self.type_filter, self.count) {
            (Some(kind), 1) => format!("{kind} record"),
            (Some(kind), _) => format!("{kind} records"),
            (None, 1) => "record".to_string(),
            (None, _) => "records".to_string(),
        };
        match &self.keywords {
            Some(keywords) => format!(
                "You have {} {noun} matching \"{keywords}\".",
                self.count
            ),
            None => format!("You have {} {noun}.", self.count),
        }
    }
}

/// Answers count and lookup questions without the remote assistant.
pub struct LocalQueryResolver {
    records: Arc<dyn RecordStore>,
    options: QueryOptions,
}

impl LocalQueryResolver {
    pub fn new(records: Arc<dyn RecordStore>, options: QueryOptions) -> Self {
        Self { records, options }
    }

    /// Classify an utterance.
    pub fn classify(&self, text: &str) -> Option<QueryIntent> {
        if !self.options.local_answering {
            return None;
        }
        classify(text, self.options.max_short_query_words)
    }

    /// Answer locally when possible.
    ///
    /// Returns None when the utterance is not locally answerable or when the
    /// record store fails; the caller then uses the remote assistant.
    pub async fn try_answer(&self, text: &str, context: &QueryContext<'_>) -> Option<ChatMessage> {
        let intent = self.classify(text)?;
        debug!("local query intent: {intent:?}");
        let keywords = Some(intent.keywords())
            .filter(|keywords| !keywords.is_empty())
            .or(context.search_box.map(str::trim))
            .filter(|keywords| !keywords.is_empty());
        match self.count(keywords, context.type_filter).await {
            Ok(result) => {
                info!(
                    "answered locally (count={}, keywords={:?}, type={:?})",
                    result.count, result.keywords, result.type_filter
                );
                Some(ChatMessage::assistant(result.sentence()).with_total_count(result.count))
            }
            Err(err) => {
                warn!("local answering failed; deferring to assistant: {err}");
                None
            }
        }
    }

    /// Count records matching an optional keyword query and type filter.
    pub async fn count(
        &self,
        keywords: Option<&str>,
        type_filter: Option<&str>,
    ) -> Result<LocalCount, RecollectCoreError> {
        let filter = type_filter.map(RecordFilter::by_type);
        let candidates = self.records.query(filter.as_ref()).await?;
        let count = candidates
            .iter()
            .filter(|record| filter.as_ref().is_none_or(|filter| filter.matches(record)))
            .filter(|record| keywords.is_none_or(|query| matches_query(record, query)))
            .count();
        Ok(LocalCount {
            count,
            keywords: keywords.map(str::to_string),
            type_filter: type_filter.map(str::to_string),
        })
    }

    /// Records matching a keyword query, used by callers that list results.
    pub async fn matching(
        &self,
        keywords: &str,
        type_filter: Option<&str>,
    ) -> Result<Vec<Record>, RecollectCoreError> {
        let filter = type_filter.map(RecordFilter::by_type);
        let candidates = self.records.query(filter.as_ref()).await?;
        Ok(candidates
            .into_iter()
            .filter(|record| filter.as_ref().is_none_or(|filter| filter.matches(record)))
            .filter(|record| matches_query(record, keywords))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sentence_mentions_type_and_keywords() {
        let count = LocalCount {
            count: 1,
            keywords: Some("acme".to_string()),
            type_filter: Some("invoice".to_string()),
        };
        assert_eq!(
            count.sentence(),
            "You have 1 invoice record matching \"acme\"."
        );
        let plain = LocalCount {
            count: 3,
            keywords: None,
            type_filter: None,
        };
        assert_eq!(plain.sentence(), "You have 3 records.");
    }
}
