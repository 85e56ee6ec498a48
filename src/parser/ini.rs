//! INI-like line grammar
//!
//! ## Grammar (per trimmed line)
//!
//! - blank, or starting with `#` / `;` → ignored
//! - `[name]` → section header; `[]` drops back to "no section"
//! - `key`, `key = value`, `key: value` → entry in the current section;
//!   the first `=` or `:` after the first character separates key from value
//! - anything else (a line starting with `=`) → unparseable
//!
//! ## States
//!
//! The parser is a two-state machine: `NoSection` until a header is seen
//! (and again after `[]`), `InSection(name)` otherwise. Entries seen in
//! `NoSection` are orphans and are dropped.
//!
//! Re-declared sections merge into the existing one and keep their position;
//! re-declared keys overwrite in place.

use tracing::{debug, warn};

use super::document::ConfigDocument;

/// What happened to one non-blank input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// `#` or `;` comment
    Comment,
    /// First header for this name; section appended
    SectionOpened { name: String },
    /// Header for a name already present; keys merge into it
    SectionReopened { name: String },
    /// New key recorded
    KeyValue { section: String, key: String },
    /// Existing key's value replaced in place
    KeyOverwritten { section: String, key: String },
    /// `[]`; current section reset to none
    SkippedEmptyHeader,
    /// Key line with no active section
    SkippedOrphanKey { key: String },
    /// Line matched neither a header nor a key
    SkippedUnparseable,
}

impl LineOutcome {
    /// Whether the line was dropped
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::SkippedEmptyHeader | Self::SkippedOrphanKey { .. } | Self::SkippedUnparseable
        )
    }
}

/// Parsed document plus a per-line account of how it was built
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub document: ConfigDocument,
    /// `(line_number, outcome)` for every non-blank line, 1-based
    pub outcomes: Vec<(usize, LineOutcome)>,
}

impl ParseReport {
    /// Number of dropped lines
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_skipped()).count()
    }
}

/// Lexical class of a single trimmed line
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Comment,
    Header(&'a str),
    Entry { key: &'a str, value: Option<&'a str> },
    Unparseable,
}

fn classify(line: &str) -> Line<'_> {
    if line.is_empty() {
        return Line::Blank;
    }
    if line.starts_with('#') || line.starts_with(';') {
        return Line::Comment;
    }
    if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
        return Line::Header(line[1..line.len() - 1].trim());
    }

    let mut chars = line.char_indices();
    match chars.next() {
        Some((_, first)) if first == '=' || first.is_whitespace() => return Line::Unparseable,
        Some(_) => {}
        None => return Line::Blank,
    }

    // The first character belongs to the key even if it is ':'
    match chars.find(|&(_, c)| c == '=' || c == ':') {
        Some((sep, _)) => Line::Entry {
            key: line[..sep].trim(),
            value: Some(line[sep + 1..].trim()),
        },
        None => Line::Entry {
            key: line,
            value: None,
        },
    }
}

/// Parser state between lines
enum State {
    NoSection,
    InSection(String),
}

/// Parse concatenated, sanitized text into a [`ConfigDocument`].
pub fn parse(text: &str) -> ConfigDocument {
    parse_with_report(text).document
}

/// Parse and keep the per-line outcomes.
pub fn parse_with_report(text: &str) -> ParseReport {
    let mut report = ParseReport::default();

    if text.trim().is_empty() {
        debug!("No INI content to parse");
        return report;
    }

    let mut state = State::NoSection;

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;

        let outcome = match classify(raw_line.trim()) {
            Line::Blank => continue,
            Line::Comment => LineOutcome::Comment,
            Line::Header("") => {
                warn!("Skipping empty section header '[]' at line ~{}", line_number);
                state = State::NoSection;
                LineOutcome::SkippedEmptyHeader
            }
            Line::Header(name) => {
                let existed = report.document.open_section(name);
                state = State::InSection(name.to_string());
                if existed {
                    debug!(
                        "Duplicate section '[{}]' found at line ~{}. Merging keys.",
                        name, line_number
                    );
                    LineOutcome::SectionReopened {
                        name: name.to_string(),
                    }
                } else {
                    LineOutcome::SectionOpened {
                        name: name.to_string(),
                    }
                }
            }
            Line::Entry { key, value } => match &state {
                State::NoSection => {
                    warn!(
                        "Key '{}' found outside of any section at line ~{}. Skipping.",
                        key, line_number
                    );
                    LineOutcome::SkippedOrphanKey {
                        key: key.to_string(),
                    }
                }
                State::InSection(section) => {
                    let overwritten =
                        report
                            .document
                            .set(section, key, value.map(str::to_string));
                    if overwritten {
                        debug!(
                            "Duplicate key '{}' in section '[{}]' at line ~{}. Overwriting.",
                            key, section, line_number
                        );
                        LineOutcome::KeyOverwritten {
                            section: section.clone(),
                            key: key.to_string(),
                        }
                    } else {
                        LineOutcome::KeyValue {
                            section: section.clone(),
                            key: key.to_string(),
                        }
                    }
                }
            },
            Line::Unparseable => {
                warn!(
                    "Could not parse line ~{}: '{}'. Skipping.",
                    line_number,
                    raw_line.trim()
                );
                LineOutcome::SkippedUnparseable
            }
        };

        report.outcomes.push((line_number, outcome));
    }

    if report.document.is_empty() {
        debug!("Parsing completed, but no valid sections or keys were found.");
    }

    report
}
