//! Identifier registry integration tests against the JSON file store

use std::sync::Arc;

use clantracker::identifiers::{
    normalize_identifier_input, IdentifierRegistry, JsonFileStore, RenameError, RenameOutcome,
    IDENTIFIER_LENGTH,
};
use tempfile::TempDir;

fn open(dir: &TempDir) -> IdentifierRegistry {
    IdentifierRegistry::load(Arc::new(JsonFileStore::in_dir(
        dir.path().join("data"),
        "clan_identifiers.json",
    )))
}

#[tokio::test]
async fn test_registry_survives_restart() {
    let dir = TempDir::new().unwrap();

    let (first, second) = {
        let registry = open(&dir);
        assert!(registry.is_empty().await);
        let first = registry.ensure("111111111111111111", "Iron Rats").await.unwrap();
        let second = registry.ensure("222222222222222222", "Gold Guild").await.unwrap();
        assert_ne!(first, second);
        assert!(!registry.is_dirty());
        (first, second)
    };

    let reopened = open(&dir);
    assert_eq!(reopened.len().await, 2);
    assert_eq!(
        reopened.ensure("111111111111111111", "Iron Rats").await.unwrap(),
        first
    );
    let owner = reopened.find_owner(&second).await.unwrap();
    assert_eq!(owner.owner_id, "222222222222222222");
    assert_eq!(owner.name, "Gold Guild");
}

#[tokio::test]
async fn test_file_format() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir);
    let identifier = registry.ensure("42", "Answer").await.unwrap();
    assert_eq!(identifier.len(), IDENTIFIER_LENGTH);

    let text = std::fs::read_to_string(dir.path().join("data/clan_identifiers.json")).unwrap();
    let expected = format!(
        "{{\n    \"42\": {{\n        \"identifier\": \"{}\",\n        \"name\": \"Answer\"\n    }}\n}}",
        identifier
    );
    assert_eq!(text, expected);
}

#[tokio::test]
async fn test_malformed_entries_skipped_on_load() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(
        data.join("clan_identifiers.json"),
        r#"{
            "1": {"identifier": "AAAA1111", "name": "Good"},
            "abc": {"identifier": "BBBB2222", "name": "Bad key"},
            "2": {"identifier": "CCCC3333"}
        }"#,
    )
    .unwrap();

    let registry = open(&dir);
    assert_eq!(registry.len().await, 1);
    assert!(registry.find_owner("AAAA1111").await.is_some());
    assert!(registry.find_owner("BBBB2222").await.is_none());
}

#[tokio::test]
async fn test_corrupt_file_starts_empty_and_is_rewritten() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("clan_identifiers.json"), "not json at all").unwrap();

    let registry = open(&dir);
    assert!(registry.is_empty().await);
    registry.ensure("5", "Fresh").await.unwrap();

    let reopened = open(&dir);
    assert_eq!(reopened.len().await, 1);
}

#[tokio::test]
async fn test_rename_with_user_input() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir);
    let old = registry.ensure("1", "Iron Rats").await.unwrap();
    let taken = registry.ensure("2", "Gold Guild").await.unwrap();

    // Command layer normalizes before renaming
    let wanted = normalize_identifier_input("  rats ");
    match registry.rename(&old, &wanted).await.unwrap() {
        RenameOutcome::Renamed(event) => {
            assert_eq!(event.owner_id, "1");
            assert_eq!(event.new_identifier, "RATS");
        }
        RenameOutcome::Unchanged => panic!("expected a rename"),
    }

    assert!(matches!(
        registry.rename("RATS", &taken).await,
        Err(RenameError::Conflict { .. })
    ));
    assert!(matches!(
        registry.rename("RATS", "rats").await,
        Err(RenameError::InvalidFormat { .. })
    ));

    let reopened = open(&dir);
    assert_eq!(reopened.find_owner("RATS").await.unwrap().owner_id, "1");
    assert!(reopened.find_owner(&old).await.is_none());
}

#[tokio::test]
async fn test_concurrent_ensure_yields_one_identifier_per_owner() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(open(&dir));

    let mut handles = Vec::new();
    for i in 0..20 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let owner = (i % 5).to_string();
            registry.ensure(&owner, "clan").await.unwrap()
        }));
    }

    let mut seen = std::collections::HashSet::new();
    for handle in handles {
        seen.insert(handle.await.unwrap());
    }
    assert_eq!(seen.len(), 5);
    assert_eq!(registry.len().await, 5);
}
