//! Health and version endpoints
//!
//! - /health - liveness plus registry state
//! - /version - build information

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde::Serialize;

use super::json_response;
use crate::server::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// Number of registered clan identifiers
    pub identifiers: usize,
    /// True while the last registry save has not succeeded
    pub dirty: bool,
    /// Uptime in seconds
    pub uptime: u64,
}

/// Handle health check endpoint (/health)
pub async fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        identifiers: state.registry.len().await,
        dirty: state.registry.is_dirty(),
        uptime: state.started_at.elapsed().as_secs(),
    };
    json_response(&response)
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    json_response(&VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "clantracker",
    })
}
