//! Shared types for ClanTracker

pub mod error;

pub use error::{Result, TrackerError};
