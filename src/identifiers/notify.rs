//! Rename propagation
//!
//! After a successful rename the registry hands a [`RenameEvent`] to its
//! [`RenameNotifier`]. Propagation is best effort: failures are logged and
//! never undo the rename.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::parser::sanitize;

/// A committed identifier change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEvent {
    pub owner_id: String,
    pub owner_name: String,
    pub old_identifier: String,
    pub new_identifier: String,
}

/// Hook run after a rename has been persisted
#[async_trait]
pub trait RenameNotifier: Send + Sync {
    async fn identifier_renamed(&self, event: &RenameEvent);
}

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl RenameNotifier for LogNotifier {
    async fn identifier_renamed(&self, event: &RenameEvent) {
        info!(
            owner_id = %event.owner_id,
            old = %event.old_identifier,
            new = %event.new_identifier,
            "Identifier renamed"
        );
    }
}

/// Message as seen through the chat surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceMessage {
    pub id: u64,
    pub content: String,
    /// Authored by this bot (only those can be edited)
    pub authored_by_self: bool,
}

/// Chat surface failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("Missing permission: {0}")]
    Forbidden(String),

    #[error("Chat platform error: {0}")]
    Upstream(String),
}

/// The slice of the chat platform needed to rewrite bot messages
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Up to `limit` messages from `channel`, newest first
    async fn recent_messages(
        &self,
        owner_id: &str,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<SurfaceMessage>, SurfaceError>;

    /// Replace the content of one of this bot's messages
    async fn edit_message(
        &self,
        owner_id: &str,
        channel: &str,
        message_id: u64,
        content: &str,
    ) -> Result<(), SurfaceError>;
}

/// Bot messages scanned in the info channel
pub const INFO_SCAN_LIMIT: usize = 20;

/// Bot messages scanned in the config channel
pub const CONFIG_SCAN_LIMIT: usize = 5;

/// Line in the info channel that announces the identifier
pub fn info_line(identifier: &str) -> String {
    format!("### Your unique Clan Identifier: `{}`", identifier)
}

/// Config message the bot posts for a fresh owner
pub fn config_template(identifier: &str) -> String {
    format!(
        "```ini\n[discord]\nclan_identifier = {}\n```",
        identifier
    )
}

/// Rewrites the identifier in messages the bot previously posted
pub struct SurfaceRenameNotifier<S> {
    surface: S,
    info_channel: String,
    config_channel: String,
}

impl<S: ChatSurface> SurfaceRenameNotifier<S> {
    pub fn new(surface: S, info_channel: impl Into<String>, config_channel: impl Into<String>) -> Self {
        Self {
            surface,
            info_channel: info_channel.into(),
            config_channel: config_channel.into(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Rewrite the identifier announcement in the info channel.
    ///
    /// Returns the number of edited messages.
    pub async fn update_info_channel(&self, event: &RenameEvent) -> Result<usize, SurfaceError> {
        let messages = self
            .surface
            .recent_messages(&event.owner_id, &self.info_channel, INFO_SCAN_LIMIT)
            .await?;

        let old_line = info_line(&event.old_identifier);
        let new_line = info_line(&event.new_identifier);

        let mut edited = 0;
        for message in messages.iter().filter(|m| m.authored_by_self) {
            if !message.content.contains(&old_line) {
                continue;
            }
            let content = message.content.replace(&old_line, &new_line);
            self.surface
                .edit_message(&event.owner_id, &self.info_channel, message.id, &content)
                .await?;
            info!(
                "Updated identifier in #{} message {} for owner {}",
                self.info_channel, message.id, event.owner_id
            );
            edited += 1;
        }
        Ok(edited)
    }

    /// Replace the bot's config template carrying the old identifier.
    ///
    /// Returns the number of edited messages.
    pub async fn update_config_channel(&self, event: &RenameEvent) -> Result<usize, SurfaceError> {
        let messages = self
            .surface
            .recent_messages(&event.owner_id, &self.config_channel, CONFIG_SCAN_LIMIT)
            .await?;

        let marker = format!("clan_identifier = {}", event.old_identifier);
        let replacement = config_template(&event.new_identifier);

        let mut edited = 0;
        for message in messages.iter().filter(|m| m.authored_by_self) {
            if !sanitize(&message.content).contains(&marker) {
                continue;
            }
            self.surface
                .edit_message(&event.owner_id, &self.config_channel, message.id, &replacement)
                .await?;
            info!(
                "Updated identifier in #{} message {} for owner {}",
                self.config_channel, message.id, event.owner_id
            );
            edited += 1;
        }
        Ok(edited)
    }
}

#[async_trait]
impl<S: ChatSurface> RenameNotifier for SurfaceRenameNotifier<S> {
    async fn identifier_renamed(&self, event: &RenameEvent) {
        if let Err(e) = self.update_info_channel(event).await {
            warn!(
                "Could not update #{} for owner {}: {}",
                self.info_channel, event.owner_id, e
            );
        }
        if let Err(e) = self.update_config_channel(event).await {
            warn!(
                "Could not update #{} for owner {}: {}",
                self.config_channel, event.owner_id, e
            );
        }
    }
}
