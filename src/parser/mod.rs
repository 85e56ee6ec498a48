//! Chat-authored configuration parsing
//!
//! Clan admins write their configuration as plain chat messages, usually
//! wrapped in ```` ```ini ```` fences. This module turns a channel's message
//! history back into one ordered document:
//!
//! 1. [`sanitize`] strips fences and stray backticks from each message
//! 2. [`messages`] orders messages oldest → newest and concatenates them
//! 3. [`ini`] runs the line grammar and builds a [`ConfigDocument`]
//!
//! Everything here is pure and synchronous. Malformed input never fails,
//! it only yields fewer entries.

pub mod document;
pub mod ini;
pub mod messages;
pub mod sanitize;

pub use document::{ConfigDocument, Section};
pub use ini::{parse, parse_with_report, LineOutcome, ParseReport};
pub use messages::{build_document, build_document_with, RawMessage};
pub use sanitize::sanitize;
