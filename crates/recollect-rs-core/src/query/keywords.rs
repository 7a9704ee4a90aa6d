//! Keyword query extraction from free-form questions.

/// Closed list of query and filler words dropped from keyword queries.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "be", "can", "count", "did", "do", "does",
    "find", "for", "from", "get", "give", "has", "have", "how", "i", "in", "is", "it", "list",
    "many", "me", "much", "my", "number", "of", "on", "or", "please", "record", "records",
    "show", "tell", "that", "the", "them", "there", "these", "this", "those", "to", "what",
    "which", "with", "you",
];

const QUOTE_CHARS: &[char] = &['"', '\u{201c}', '\u{201d}'];

/// Whether a lowercase token is a stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Derive the keyword query for an utterance.
///
/// Double-quoted phrases win outright and are joined with spaces. Otherwise
/// the text is tokenized, lowercased, reduced to letters, digits and hyphens,
/// and stripped of stop words. No stemming is applied.
pub fn extract_keyword_query(text: &str) -> String {
    let quoted = quoted_phrases(text);
    if !quoted.is_empty() {
        return quoted.join(" ");
    }
    tokenize(text)
        .into_iter()
        .filter(|token| !is_stop_word(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase tokens keeping only letters, digits and hyphens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || is_separator(c))
        .map(|raw| {
            raw.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .map(|token| token.trim_matches('-').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_separator(c: char) -> bool {
    matches!(
        c,
        ',' | '.' | ';' | ':' | '!' | '?' | '/' | '\\' | '(' | ')' | '[' | ']' | '{' | '}' | '|'
    ) || QUOTE_CHARS.contains(&c)
}

/// Contents of complete double-quoted spans, trimmed and non-empty.
fn quoted_phrases(text: &str) -> Vec<String> {
    let segments: Vec<&str> = text.split(QUOTE_CHARS).collect();
    // An unmatched trailing quote leaves the final segment unclosed.
    let closed = if segments.len() % 2 == 0 {
        segments.len() - 1
    } else {
        segments.len()
    };
    segments[..closed]
        .iter()
        .skip(1)
        .step_by(2)
        .map(|phrase| phrase.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quoted_phrase_wins() {
        assert_eq!(
            extract_keyword_query(r#"how many records with "leg day" in them"#),
            "leg day"
        );
        assert_eq!(
            extract_keyword_query(r#"find "acme" and "globex" invoices"#),
            "acme globex"
        );
    }

    #[test]
    fn stop_words_are_removed() {
        assert_eq!(extract_keyword_query("show me pullups"), "pullups");
        assert_eq!(extract_keyword_query("How many invoices do I have?"), "invoices");
        assert_eq!(extract_keyword_query("how many records"), "");
    }

    #[test]
    fn hyphens_survive_and_punctuation_is_stripped() {
        assert_eq!(
            extract_keyword_query("what about follow-up visits, 2024?"),
            "follow-up visits 2024"
        );
        assert_eq!(extract_keyword_query("doctor's notes"), "doctors notes");
    }

    #[test]
    fn unmatched_quote_falls_back_to_tokens() {
        assert_eq!(extract_keyword_query(r#"show "receipts"#), "receipts");
        assert_eq!(extract_keyword_query(r#""  ""#), "");
    }

    #[test]
    fn plurals_are_not_singularized() {
        assert_eq!(extract_keyword_query("glasses"), "glasses");
    }
}
