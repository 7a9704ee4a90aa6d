//! Coalescing of repeated assistant error messages.

use chrono::Utc;
use recollect_rs_protocol::{ChatMessage, ChatRole};

const ERROR_MARKERS: &[&str] = &["error:", "error ", "failed"];

/// Whether message content looks like an error report.
pub fn is_error_content(content: &str) -> bool {
    let lowered = content.to_lowercase();
    ERROR_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Normalized form used to compare error messages.
pub fn normalize_error_content(content: &str) -> String {
    content
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append a message, folding repeated assistant errors into the earlier entry.
///
/// Returns the index of the message that now represents `message`.
pub fn append_message(messages: &mut Vec<ChatMessage>, mut message: ChatMessage) -> usize {
    let is_error =
        message.role == ChatRole::Assistant && (message.is_error || is_error_content(&message.content));
    if !is_error {
        messages.push(message);
        return messages.len() - 1;
    }

    let normalized = normalize_error_content(&message.content);
    let existing = messages.iter().rposition(|prior| {
        prior.role == ChatRole::Assistant
            && (prior.is_error || prior.error_count.is_some())
            && normalize_error_content(&prior.content) == normalized
    });
    match existing {
        Some(index) => {
            let prior = &mut messages[index];
            prior.is_error = true;
            prior.error_count = Some(prior.error_count.unwrap_or(1).saturating_add(1));
            prior.timestamp = Utc::now();
            index
        }
        None => {
            message.is_error = true;
            message.error_count = Some(1);
            messages.push(message);
            messages.len() - 1
        }
    }
}
