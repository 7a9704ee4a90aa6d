//! Keyword matching over a record's searchable text.

use recollect_rs_protocol::Record;
use serde_json::Value;

/// Shortest token eligible for edit-distance matching.
const FUZZY_MIN_LEN: usize = 4;

/// Lowercased summary, property values and type, with punctuation collapsed.
pub fn searchable_text(record: &Record) -> String {
    let mut parts = vec![record.summary.clone()];
    for value in record.properties.values() {
        collect_values(value, &mut parts);
    }
    parts.push(record.record_type.clone());
    normalize(&parts.join(" "))
}

/// Whether a record matches a keyword query.
///
/// The whole query as a substring matches outright; otherwise every query
/// token must appear as a substring or lie within a small edit distance of a
/// word in the record.
pub fn matches_query(record: &Record, query: &str) -> bool {
    let query = normalize(query);
    if query.is_empty() {
        return true;
    }
    let text = searchable_text(record);
    if text.contains(&query) {
        return true;
    }
    let words: Vec<&str> = text.split(' ').collect();
    query
        .split(' ')
        .all(|token| text.contains(token) || words.iter().any(|word| fuzzy_eq(token, word)))
}

fn collect_values(value: &Value, parts: &mut Vec<String>) {
    match value {
        Value::String(text) => parts.push(text.clone()),
        Value::Number(number) => parts.push(number.to_string()),
        Value::Bool(flag) => parts.push(flag.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_values(item, parts)),
        Value::Object(map) => map.values().for_each(|item| collect_values(item, parts)),
        Value::Null => {}
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn fuzzy_eq(token: &str, word: &str) -> bool {
    let token_len = token.chars().count();
    if token_len < FUZZY_MIN_LEN || word.chars().count() < FUZZY_MIN_LEN {
        return false;
    }
    let budget = (token_len / 4).max(1);
    if token_len.abs_diff(word.chars().count()) > budget {
        return false;
    }
    levenshtein(token, word) <= budget
}

fn levenshtein(left: &str, right: &str) -> usize {
    let right: Vec<char> = right.chars().collect();
    let mut previous: Vec<usize> = (0..=right.len()).collect();
    let mut current = vec![0; right.len() + 1];
    for (i, lc) in left.chars().enumerate() {
        current[0] = i + 1;
        for (j, rc) in right.iter().enumerate() {
            let substitution = previous[j] + usize::from(lc != *rc);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[right.len()]
}
