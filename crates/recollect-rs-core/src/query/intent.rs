//! Classification of utterances that can be answered from local records.

use super::keywords::{extract_keyword_query, tokenize};

/// Phrases that turn a mention of records into an implicit count question.
const IMPLICIT_COUNT_PHRASES: &[&str] = &["how about", "what about", "show me"];
/// Words asking about a record's fields rather than a bulk count.
const DETAIL_WORDS: &[&str] = &[
    "properties",
    "details",
    "property",
    "info",
    "information",
    "show",
    "tell",
    "describe",
];

/// Locally answerable question kinds, in classification order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIntent {
    /// `how many ...` questions or the bare word `record(s)`.
    ExplicitCount { keywords: String },
    /// `what about ... records` style follow-ups.
    ImplicitCount { keywords: String },
    /// A few words naming what to look for.
    ShortKeyword { keywords: String },
}

impl QueryIntent {
    /// Keyword query carried by the intent; may be empty for explicit counts.
    pub fn keywords(&self) -> &str {
        match self {
            QueryIntent::ExplicitCount { keywords }
            | QueryIntent::ImplicitCount { keywords }
            | QueryIntent::ShortKeyword { keywords } => keywords,
        }
    }
}

/// Classify an utterance; the first matching rule wins.
pub fn classify(text: &str, max_short_query_words: usize) -> Option<QueryIntent> {
    let lowered = text.to_lowercase();
    let tokens = tokenize(&lowered);
    let keywords = extract_keyword_query(text);
    let mentions_records = tokens
        .iter()
        .any(|token| token == "record" || token == "records");

    if is_bare_record_word(&lowered) || asks_how_many(&tokens, mentions_records, &keywords) {
        return Some(QueryIntent::ExplicitCount { keywords });
    }

    if keywords.is_empty() {
        return None;
    }

    if mentions_records
        && IMPLICIT_COUNT_PHRASES
            .iter()
            .any(|phrase| contains_phrase(&tokens, phrase))
    {
        return Some(QueryIntent::ImplicitCount { keywords });
    }

    let word_count = lowered.split_whitespace().count();
    let asks_for_details = tokens
        .iter()
        .any(|token| DETAIL_WORDS.contains(&token.as_str()));
    if word_count <= max_short_query_words && !asks_for_details {
        return Some(QueryIntent::ShortKeyword { keywords });
    }
    None
}

fn is_bare_record_word(lowered: &str) -> bool {
    let trimmed = lowered.trim().trim_end_matches(['?', '.', '!']);
    trimmed == "record" || trimmed == "records"
}

/// `how many` followed later by `record(s)` or by the counted noun itself.
fn asks_how_many(tokens: &[String], mentions_records: bool, keywords: &str) -> bool {
    let Some(start) = tokens
        .windows(2)
        .position(|pair| pair[0] == "how" && pair[1] == "many")
    else {
        return false;
    };
    let rest = &tokens[start + 2..];
    let records_follow = mentions_records
        && rest
            .iter()
            .any(|token| token == "record" || token == "records");
    records_follow || !keywords.is_empty()
}

fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    tokens.windows(words.len()).any(|window| {
        window
            .iter()
            .zip(&words)
            .all(|(token, word)| token == word)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn explicit(keywords: &str) -> Option<QueryIntent> {
        Some(QueryIntent::ExplicitCount {
            keywords: keywords.to_string(),
        })
    }

    #[test]
    fn explicit_count_questions() {
        assert_eq!(classify("How many records do I have?", 5), explicit(""));
        assert_eq!(
            classify(r#"how many records with "leg day" in them"#, 5),
            explicit("leg day")
        );
        assert_eq!(classify("how many invoices do I have", 5), explicit("invoices"));
        assert_eq!(classify("Records", 5), explicit(""));
        assert_eq!(classify("records?", 5), explicit(""));
    }

    #[test]
    fn implicit_count_requires_records_and_keywords() {
        assert_eq!(
            classify("and what about the receipts records from march", 5),
            Some(QueryIntent::ImplicitCount {
                keywords: "receipts march".to_string()
            })
        );
        assert_eq!(classify("what about the records", 5), None);
    }

    #[test]
    fn short_keyword_queries() {
        assert_eq!(
            classify("pullups", 5),
            Some(QueryIntent::ShortKeyword {
                keywords: "pullups".to_string()
            })
        );
        assert_eq!(
            classify("show me pullups", 5),
            None,
            "detail words keep short questions remote"
        );
        assert_eq!(classify("describe the acme invoice", 5), None);
        assert_eq!(classify("acme invoices paid last week in cash", 5), None);
        assert_eq!(
            classify("acme invoices paid last week in cash", 7),
            Some(QueryIntent::ShortKeyword {
                keywords: "acme invoices paid last week cash".to_string()
            })
        );
    }

    #[test]
    fn chit_chat_goes_remote() {
        assert_eq!(classify("Can you summarize my spending trends this year?", 5), None);
        assert_eq!(classify("how are you", 5), None);
    }
}
