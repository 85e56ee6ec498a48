//! Clan info endpoint
//!
//! `GET /api/clan_info/{identifier}` resolves the identifier to its owner,
//! reads the owner's config and manual-points channels, and returns both
//! parsed documents:
//!
//! ```json
//! { "config": { "section": { "key": "value" } }, "manual_points": {} }
//! ```
//!
//! The config channel is required and its failures become HTTP errors. The
//! manual-points channel is optional; any failure there yields an empty
//! document.

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{error_response, json_response};
use crate::identifiers::store::is_valid_owner_id;
use crate::parser::{build_document, ConfigDocument};
use crate::server::AppState;
use crate::types::TrackerError;

/// Route prefix; the identifier is the remaining path segment
pub const CLAN_INFO_PREFIX: &str = "/api/clan_info/";

/// Response body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClanInfo {
    pub config: ConfigDocument,
    pub manual_points: ConfigDocument,
}

/// Resolve `identifier` and parse its owner's channels.
pub async fn fetch_clan_info(state: &AppState, identifier: &str) -> Result<ClanInfo, TrackerError> {
    if identifier.is_empty() {
        warn!("[API] Request missing clan_identifier.");
        return Err(TrackerError::BadRequest(
            "Missing clan_identifier path parameter".to_string(),
        ));
    }

    info!("[API] Received request for clan identifier: {}", identifier);

    let owner = state.registry.find_owner(identifier).await.ok_or_else(|| {
        warn!("[API] Clan identifier not found: {}", identifier);
        TrackerError::NotFound(format!("Clan Identifier '{}' not found.", identifier))
    })?;

    if !is_valid_owner_id(&owner.owner_id) {
        error!(
            "[API] Invalid owner ID '{}' found for identifier '{}'.",
            owner.owner_id, identifier
        );
        return Err(TrackerError::Internal(
            "Internal Server Error: Invalid Guild ID associated.".to_string(),
        ));
    }

    let config_channel = &state.args.config_channel;
    let config_messages = state
        .history
        .fetch(&owner.owner_id, config_channel)
        .await
        .map_err(|e| {
            warn!(
                owner_id = %owner.owner_id,
                channel = %config_channel,
                "[API] Could not read config channel: {}", e
            );
            TrackerError::from(e)
        })?;
    let config = build_document(&config_messages);
    info!(
        "[API] Parsed {} sections from #{} for '{}'",
        config.len(),
        config_channel,
        owner.name
    );

    let manual_channel = &state.args.manual_points_channel;
    let manual_points = match state.history.fetch(&owner.owner_id, manual_channel).await {
        Ok(messages) => build_document(&messages),
        Err(e) => {
            warn!(
                owner_id = %owner.owner_id,
                channel = %manual_channel,
                "[API] Manual points unavailable, returning empty: {}", e
            );
            ConfigDocument::new()
        }
    };

    Ok(ClanInfo {
        config,
        manual_points,
    })
}

/// Handle `GET /api/clan_info/{identifier}`
pub async fn handle_clan_info(state: &AppState, identifier: &str) -> Response<Full<Bytes>> {
    match fetch_clan_info(state, identifier).await {
        Ok(info) => json_response(&info),
        Err(e) => error_response(&e),
    }
}
