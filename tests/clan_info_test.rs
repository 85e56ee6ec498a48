//! HTTP routing integration tests: registry + channel archive + handlers

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use http_body_util::BodyExt;
use hyper::{Method, Request, StatusCode};
use tempfile::TempDir;

use clantracker::config::Args;
use clantracker::history::ArchiveHistory;
use clantracker::identifiers::{IdentifierRegistry, JsonFileStore};
use clantracker::server::{handle_request, AppState};

fn write_channel(root: &Path, owner: &str, channel: &str, messages: serde_json::Value) {
    let dir = root.join(owner);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{}.json", channel)), messages.to_string()).unwrap();
}

async fn setup(dir: &TempDir) -> (AppState, String) {
    let args = Args::parse_from([
        "clantracker",
        "--data-dir",
        dir.path().join("data").to_str().unwrap(),
        "--archive-dir",
        dir.path().join("channels").to_str().unwrap(),
        "--config-channel",
        "ct-config",
        "--manual-points-channel",
        "ct-manual-points",
    ]);

    let registry = IdentifierRegistry::load(Arc::new(JsonFileStore::new(args.identifier_path())));
    let identifier = registry.ensure("123456789", "Iron Rats").await.unwrap();
    registry.ensure("987654321", "No Channels").await.unwrap();

    write_channel(
        &args.archive_dir,
        "123456789",
        "ct-config",
        serde_json::json!([
            {"id": 30, "content": "```ini\nrank = gm\n```", "author_is_bot": false},
            {"id": 20, "content": "Config saved!", "author_is_bot": true},
            {"id": 10, "content": "```ini\n[Burger73]\nrank = officer\n[Müller]\n```", "author_is_bot": false}
        ]),
    );
    // Owner directory exists but has no channel files
    std::fs::create_dir_all(args.archive_dir.join("987654321")).unwrap();

    let history = Arc::new(ArchiveHistory::new(&args.archive_dir));
    (AppState::new(args, Arc::new(registry), history), identifier)
}

async fn get(state: &AppState, path: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(())
        .unwrap();
    let response = handle_request(state, &req).await;
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_clan_info_success() {
    let dir = TempDir::new().unwrap();
    let (state, identifier) = setup(&dir).await;

    let (status, body) = get(&state, &format!("/api/clan_info/{}", identifier)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "config": {
                "Burger73": {"rank": "officer"},
                "Müller": {"rank": "gm"}
            },
            "manual_points": {}
        })
    );
    // Section order follows the channel, oldest first
    let sections: Vec<_> = body["config"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(sections, vec!["Burger73", "Müller"]);
}

#[tokio::test]
async fn test_clan_info_errors() {
    let dir = TempDir::new().unwrap();
    let (state, _) = setup(&dir).await;

    let (status, body) = get(&state, "/api/clan_info/NOPE1234").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Clan Identifier 'NOPE1234' not found.");

    let (status, _) = get(&state, "/api/clan_info/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let no_channels = state.registry.ensure("987654321", "No Channels").await.unwrap();
    let (status, body) = get(&state, &format!("/api/clan_info/{}", no_channels)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Channel '#ct-config' not found on server.");
}

#[tokio::test]
async fn test_health_version_and_fallbacks() {
    let dir = TempDir::new().unwrap();
    let (state, _) = setup(&dir).await;

    let (status, body) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["identifiers"], 2);
    assert_eq!(body["dirty"], false);

    let (status, body) = get(&state, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "clantracker");

    let (status, _) = get(&state, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/clan_info/X")
        .body(())
        .unwrap();
    let response = handle_request(&state, &req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
