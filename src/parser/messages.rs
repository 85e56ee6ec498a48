//! Message history → document
//!
//! Chat APIs return history newest-first. Config authors expect the channel
//! to read top to bottom, so messages are put back in oldest → newest order
//! before their bodies are joined and parsed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::document::ConfigDocument;
use super::ini;
use super::sanitize::sanitize;

/// One chat message as delivered by the platform client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Message body as typed, fences included
    pub body: String,
    /// Authored by an automated account (including this bot)
    pub author_is_bot: bool,
    /// Monotonic position in the channel (message snowflake); larger is newer
    pub sequence: u64,
}

impl RawMessage {
    pub fn new(sequence: u64, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            author_is_bot: false,
            sequence,
        }
    }

    /// Same message, flagged as bot-authored
    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }
}

/// Join the sanitized bodies of human-authored messages, oldest first.
///
/// Returns an empty string when nothing survives sanitization.
pub fn concatenate(messages: &[RawMessage]) -> String {
    concatenate_with(messages, true)
}

/// Like [`concatenate`]; with `fence_aware` off bodies are only trimmed.
pub fn concatenate_with(messages: &[RawMessage], fence_aware: bool) -> String {
    // Reverse first so a newest-first fetch is already in order; the stable
    // sort then only fixes genuinely out-of-order input.
    let mut ordered: Vec<&RawMessage> = messages
        .iter()
        .rev()
        .filter(|m| !m.author_is_bot)
        .collect();
    ordered.sort_by_key(|m| m.sequence);

    let mut text = String::new();
    for message in ordered {
        let cleaned = if fence_aware {
            sanitize(&message.body)
        } else {
            message.body.trim().to_string()
        };
        if cleaned.is_empty() {
            continue;
        }
        text.push_str(&cleaned);
        text.push('\n');
    }
    text
}

/// Build a [`ConfigDocument`] from a channel's message history.
pub fn build_document(messages: &[RawMessage]) -> ConfigDocument {
    build_document_with(messages, true)
}

/// Build a document, optionally leaving code fences in place.
pub fn build_document_with(messages: &[RawMessage], fence_aware: bool) -> ConfigDocument {
    let text = concatenate_with(messages, fence_aware);
    if text.trim().is_empty() {
        debug!(
            "No valid INI content found in {} message(s) after cleaning.",
            messages.len()
        );
        return ConfigDocument::new();
    }
    ini::parse(&text)
}
