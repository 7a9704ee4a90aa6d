//! Lookup of records referenced by id in user text.

use log::{debug, warn};
use recollect_rs_protocol::{Record, RecordStore};
use regex::Regex;
use std::collections::HashSet;

/// Upper bound on id lookups per message.
const MAX_MENTIONS: usize = 8;

/// Tokens that look like record ids: word characters joined by `-` or `_`,
/// containing at least one digit.
pub fn candidate_ids(text: &str) -> Vec<String> {
    let Ok(regex) = Regex::new(r"[A-Za-z0-9]+(?:[-_][A-Za-z0-9]+)+") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    regex
        .find_iter(text)
        .map(|found| found.as_str())
        .filter(|token| token.chars().any(|c| c.is_ascii_digit()))
        .filter(|token| seen.insert(token.to_string()))
        .take(MAX_MENTIONS)
        .map(str::to_string)
        .collect()
}

/// Fetch records mentioned in the text; lookup failures are logged and skipped.
pub async fn lookup_mentions(store: &dyn RecordStore, text: &str) -> Vec<Record> {
    let mut found = Vec::new();
    for id in candidate_ids(text) {
        match store.get(&id).await {
            Ok(Some(record)) => found.push(record),
            Ok(None) => {}
            Err(err) => warn!("record lookup failed (id={id}): {err}"),
        }
    }
    if !found.is_empty() {
        debug!("resolved mentioned records (count={})", found.len());
    }
    found
}
