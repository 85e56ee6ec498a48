//! Message body sanitization
//!
//! Strips presentational wrapping from a chat message before parsing:
//! fenced code blocks (optionally tagged `ini`), then surrounding whitespace,
//! then any leftover backticks at either end.

use std::sync::LazyLock;

use regex::Regex;

/// A well-formed ```` ``` ```` pair, optionally tagged `ini` (any case).
/// Non-greedy and dot-matches-newline so several fences in one message are
/// each unwrapped.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)```(?:ini\n)?(.*?)```").expect("fence pattern is valid"));

/// Remove code fences and surrounding whitespace/backticks from a message body.
///
/// Never fails. A body without fences comes back trimmed of whitespace and
/// then of backticks.
pub fn sanitize(raw: &str) -> String {
    let unwrapped = FENCE.replace_all(raw, "$1");
    unwrapped.trim().trim_matches('`').to_string()
}
