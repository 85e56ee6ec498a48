//! Channel history port
//!
//! The parser needs an owner's channel history, newest first. Where it comes
//! from is a deployment detail: a live chat client, or the on-disk archive
//! in [`ArchiveHistory`].

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::parser::RawMessage;
use crate::types::TrackerError;

/// Channel history failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("Owner '{0}' not found")]
    OwnerNotFound(String),

    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("Missing permission to read channel '{0}'")]
    Forbidden(String),

    #[error("Upstream HTTP error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Other(String),
}

impl From<HistoryError> for TrackerError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::OwnerNotFound(owner_id) => {
                TrackerError::NotFound(format!("Server with ID {} not found.", owner_id))
            }
            HistoryError::ChannelNotFound(channel) => {
                TrackerError::NotFound(format!("Channel '#{}' not found on server.", channel))
            }
            HistoryError::Forbidden(channel) => TrackerError::Forbidden(format!(
                "Bot lacks permission to read channel '#{}'.",
                channel
            )),
            HistoryError::Upstream(message) => TrackerError::Upstream(format!(
                "Error fetching messages from chat platform: {}",
                message
            )),
            HistoryError::Other(message) => TrackerError::Internal(format!(
                "An unexpected error occurred while processing the channel: {}",
                message
            )),
        }
    }
}

/// Source of channel history
#[async_trait]
pub trait ChannelHistory: Send + Sync {
    /// All messages in `channel` of `owner_id`, newest first
    async fn fetch(&self, owner_id: &str, channel: &str) -> Result<Vec<RawMessage>, HistoryError>;
}

#[derive(Debug, Deserialize)]
struct ArchivedMessage {
    id: u64,
    content: String,
    #[serde(default)]
    author_is_bot: bool,
}

impl From<ArchivedMessage> for RawMessage {
    fn from(m: ArchivedMessage) -> Self {
        RawMessage {
            body: m.content,
            author_is_bot: m.author_is_bot,
            sequence: m.id,
        }
    }
}

/// History read from `<root>/<owner_id>/<channel>.json`
///
/// Each file holds a JSON array of `{"id", "content", "author_is_bot"}`
/// objects, newest first.
#[derive(Debug, Clone)]
pub struct ArchiveHistory {
    root: PathBuf,
}

impl ArchiveHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn channel_path(&self, owner_id: &str, channel: &str) -> PathBuf {
        self.root.join(owner_id).join(format!("{}.json", channel))
    }
}

/// Path segments come from the registry and configuration; refuse anything
/// that could step outside the archive root.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

#[async_trait]
impl ChannelHistory for ArchiveHistory {
    async fn fetch(&self, owner_id: &str, channel: &str) -> Result<Vec<RawMessage>, HistoryError> {
        if !is_safe_segment(owner_id) {
            return Err(HistoryError::OwnerNotFound(owner_id.to_string()));
        }
        if !is_safe_segment(channel) {
            return Err(HistoryError::ChannelNotFound(channel.to_string()));
        }

        match tokio::fs::metadata(self.root.join(owner_id)).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(HistoryError::OwnerNotFound(owner_id.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(HistoryError::OwnerNotFound(owner_id.to_string()))
            }
            Err(e) => return Err(HistoryError::Other(e.to_string())),
        }

        let path = self.channel_path(owner_id, channel);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(HistoryError::ChannelNotFound(channel.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(HistoryError::Forbidden(channel.to_string()))
            }
            Err(e) => return Err(HistoryError::Other(e.to_string())),
        };

        let archived: Vec<ArchivedMessage> = serde_json::from_str(&content)
            .map_err(|e| HistoryError::Other(format!("{}: {}", path.display(), e)))?;

        debug!(
            owner_id = %owner_id,
            channel = %channel,
            count = archived.len(),
            "Loaded channel archive"
        );

        Ok(archived.into_iter().map(RawMessage::from).collect())
    }
}
