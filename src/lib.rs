//! ClanTracker - clan configuration gateway
//!
//! Clan admins write their configuration as INI snippets in a chat channel.
//! ClanTracker turns that channel history back into a structured document
//! and serves it to clients that know the clan's identifier.
//!
//! ## Components
//!
//! - **Parser**: fence stripping, message ordering and the INI line grammar
//! - **Identifiers**: owner → identifier registry with durable JSON storage
//! - **History**: where channel messages come from
//! - **Server**: `GET /api/clan_info/{identifier}`, health and version

pub mod config;
pub mod history;
pub mod identifiers;
pub mod parser;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, TrackerError};
