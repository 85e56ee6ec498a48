//! Identifier registry: maps owners (guilds) to clan identifiers
//!
//! Every owner that has been seen holds exactly one identifier. The API
//! resolves identifier → owner to find which guild's channels to read.
//!
//! ## Consistency
//!
//! - identifiers are unique across records; owner ids are the map key
//! - every mutation is persisted before the call returns
//! - a failed persist is logged and leaves the in-memory change in place;
//!   the registry is marked dirty until a later save (or [`flush`]) succeeds
//!
//! ## Thread Safety
//!
//! The map sits behind a tokio `RwLock`. Lookups share the read lock;
//! check-then-write sequences (create, rename, remove) hold the write lock
//! across the uniqueness check, the mutation and the save, so two renames
//! can never claim the same identifier.
//!
//! [`flush`]: IdentifierRegistry::flush

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::generator::{self, GenerateError, IDENTIFIER_LENGTH};
use super::notify::{RenameEvent, RenameNotifier};
use super::store::{IdentifierRecord, Records, RegistryStore, StoreError};

/// Default number of autocomplete suggestions
pub const DEFAULT_SUGGESTION_LIMIT: usize = 25;

/// Maximum suggestion label length, in characters
pub const MAX_SUGGESTION_LABEL: usize = 100;

/// Registry operation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Identifier generation failed: {0}")]
    Generate(#[from] GenerateError),
}

/// Reason a rename was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("Clan identifier '{identifier}' was not found")]
    NotFound { identifier: String },

    #[error("Identifier '{identifier}' contains characters outside A-Z and 0-9")]
    InvalidFormat { identifier: String },

    #[error("Identifier must be between 1 and {max} characters long, got {length}")]
    LengthOutOfRange { length: usize, max: usize },

    #[error("Identifier '{identifier}' is already in use by '{owner_name}' ({owner_id})")]
    Conflict {
        identifier: String,
        owner_id: String,
        owner_name: String,
    },
}

/// Reason a removal was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoveError {
    #[error("No registry entry for '{0}'")]
    NotFound(String),
}

/// Successful rename result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// New identifier equals the old one; nothing changed
    Unchanged,
    /// Identifier replaced and persisted
    Renamed(RenameEvent),
}

/// Owner resolved from an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerInfo {
    pub owner_id: String,
    pub name: String,
}

/// One autocomplete entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSuggestion {
    pub identifier: String,
    /// `IDENTIFIER (Name)`, truncated to [`MAX_SUGGESTION_LABEL`] characters
    pub label: String,
}

/// Trim and upper-case identifier input typed by a user.
pub fn normalize_identifier_input(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Check a replacement identifier: 1..=8 characters of `A-Z0-9`.
pub fn validate_identifier(candidate: &str) -> Result<(), RenameError> {
    let length = candidate.chars().count();
    if length == 0 || length > IDENTIFIER_LENGTH {
        return Err(RenameError::LengthOutOfRange {
            length,
            max: IDENTIFIER_LENGTH,
        });
    }
    if !generator::is_valid_alphabet(candidate) {
        return Err(RenameError::InvalidFormat {
            identifier: candidate.to_string(),
        });
    }
    Ok(())
}

fn suggestion_label(identifier: &str, name: &str) -> String {
    let label = format!("{} ({})", identifier, name);
    if label.chars().count() <= MAX_SUGGESTION_LABEL {
        return label;
    }
    let mut truncated: String = label.chars().take(MAX_SUGGESTION_LABEL - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Registry of owner → identifier records
pub struct IdentifierRegistry {
    records: RwLock<Records>,
    store: Arc<dyn RegistryStore>,
    notifier: Option<Arc<dyn RenameNotifier>>,
    dirty: AtomicBool,
}

impl IdentifierRegistry {
    /// Load the registry from `store`.
    ///
    /// A missing, unreadable or corrupt store starts the registry empty; the
    /// first mutation then writes a fresh file.
    pub fn load(store: Arc<dyn RegistryStore>) -> Self {
        let records = match store.load() {
            Ok(records) => records,
            Err(StoreError::Missing(path)) => {
                warn!(
                    "{} not found. Starting with empty identifiers. Will be created if needed.",
                    path.display()
                );
                Records::new()
            }
            Err(e) => {
                error!(
                    "Error loading identifiers from {}: {}. Starting with empty identifiers.",
                    store.describe(),
                    e
                );
                Records::new()
            }
        };

        Self {
            records: RwLock::new(records),
            store,
            notifier: None,
            dirty: AtomicBool::new(false),
        }
    }

    /// Attach the hook that propagates renames to display surfaces
    pub fn with_notifier(mut self, notifier: Arc<dyn RenameNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Save `records`, recording the outcome in the dirty flag.
    fn persist(&self, records: &Records) -> bool {
        match self.store.save(records) {
            Ok(()) => {
                self.dirty.store(false, Ordering::SeqCst);
                true
            }
            Err(e) => {
                error!("Error saving identifiers to {}: {}", self.store.describe(), e);
                self.dirty.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    /// Return the owner's identifier, creating one on first contact.
    ///
    /// Refreshes the stored display name when `observed_name` differs.
    /// Persists only when something changed.
    pub async fn ensure(&self, owner_id: &str, observed_name: &str) -> Result<String, RegistryError> {
        // Fast path: known owner, same name
        {
            let records = self.records.read().await;
            if let Some(record) = records.get(owner_id) {
                if record.name == observed_name {
                    return Ok(record.identifier.clone());
                }
            }
        }

        let mut records = self.records.write().await;

        if let Some(record) = records.get_mut(owner_id) {
            let identifier = record.identifier.clone();
            if record.name != observed_name {
                info!(
                    "Server name changed for owner {}: '{}' -> '{}'. Updating record.",
                    owner_id, record.name, observed_name
                );
                record.name = observed_name.to_string();
                self.persist(&records);
            }
            return Ok(identifier);
        }

        let in_use: HashSet<String> = records.values().map(|r| r.identifier.clone()).collect();
        let identifier = generator::generate(&in_use, IDENTIFIER_LENGTH)?;

        records.insert(
            owner_id.to_string(),
            IdentifierRecord {
                identifier: identifier.clone(),
                name: observed_name.to_string(),
            },
        );
        info!(
            "Generated new identifier for '{}' (owner {}): {}",
            observed_name, owner_id, identifier
        );
        self.persist(&records);

        Ok(identifier)
    }

    /// Resolve an identifier to its owner.
    pub async fn find_owner(&self, identifier: &str) -> Option<OwnerInfo> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|(_, record)| record.identifier == identifier)
            .map(|(owner_id, record)| OwnerInfo {
                owner_id: owner_id.clone(),
                name: record.name.clone(),
            })
    }

    /// Record for an owner
    pub async fn get(&self, owner_id: &str) -> Option<IdentifierRecord> {
        self.records.read().await.get(owner_id).cloned()
    }

    /// Delete an owner's record.
    pub async fn remove(&self, owner_id: &str) -> Result<IdentifierRecord, RemoveError> {
        let mut records = self.records.write().await;

        let removed = records
            .shift_remove(owner_id)
            .ok_or_else(|| RemoveError::NotFound(owner_id.to_string()))?;

        info!(
            "Removed entry for owner '{}' (identifier '{}')",
            owner_id, removed.identifier
        );
        self.persist(&records);

        Ok(removed)
    }

    /// Delete the record holding `identifier`, returning its owner id.
    pub async fn remove_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<(String, IdentifierRecord), RemoveError> {
        let mut records = self.records.write().await;

        let owner_id = records
            .iter()
            .find(|(_, record)| record.identifier == identifier)
            .map(|(owner_id, _)| owner_id.clone())
            .ok_or_else(|| RemoveError::NotFound(identifier.to_string()))?;

        let removed = records
            .shift_remove(&owner_id)
            .ok_or_else(|| RemoveError::NotFound(identifier.to_string()))?;

        info!(
            "Removed entry for owner '{}' (identifier '{}')",
            owner_id, identifier
        );
        self.persist(&records);

        Ok((owner_id, removed))
    }

    /// Replace `old_identifier` with `new_identifier`.
    ///
    /// `new_identifier` is validated as given; callers taking user input run
    /// it through [`normalize_identifier_input`] first. On success the
    /// rename is persisted and then handed to the notifier, if any.
    pub async fn rename(
        &self,
        old_identifier: &str,
        new_identifier: &str,
    ) -> Result<RenameOutcome, RenameError> {
        let event = {
            let mut records = self.records.write().await;

            let owner_id = records
                .iter()
                .find(|(_, record)| record.identifier == old_identifier)
                .map(|(owner_id, _)| owner_id.clone())
                .ok_or_else(|| RenameError::NotFound {
                    identifier: old_identifier.to_string(),
                })?;

            validate_identifier(new_identifier)?;

            if old_identifier == new_identifier {
                info!(
                    "Replacing '{}' with itself. No changes needed.",
                    old_identifier
                );
                return Ok(RenameOutcome::Unchanged);
            }

            if let Some((holder, record)) = records
                .iter()
                .find(|(id, record)| **id != owner_id && record.identifier == new_identifier)
            {
                warn!(
                    "Identifier '{}' already in use by owner '{}' ('{}')",
                    new_identifier, holder, record.name
                );
                return Err(RenameError::Conflict {
                    identifier: new_identifier.to_string(),
                    owner_id: holder.clone(),
                    owner_name: record.name.clone(),
                });
            }

            let Some(record) = records.get_mut(&owner_id) else {
                return Err(RenameError::NotFound {
                    identifier: old_identifier.to_string(),
                });
            };
            record.identifier = new_identifier.to_string();
            let owner_name = record.name.clone();

            info!(
                "Updated identifier for owner '{}' from '{}' to '{}'",
                owner_id, old_identifier, new_identifier
            );
            self.persist(&records);

            RenameEvent {
                owner_id,
                owner_name,
                old_identifier: old_identifier.to_string(),
                new_identifier: new_identifier.to_string(),
            }
        };

        // Outside the lock: propagation talks to the chat platform
        if let Some(ref notifier) = self.notifier {
            notifier.identifier_renamed(&event).await;
        }

        Ok(RenameOutcome::Renamed(event))
    }

    /// Identifiers matching `query` for autocomplete.
    ///
    /// Case-insensitive substring match on identifier or name, ordered by
    /// identifier then name.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<IdentifierSuggestion> {
        let needle = query.to_lowercase();
        let records = self.records.read().await;

        let mut entries: Vec<(&str, &str)> = records
            .values()
            .filter(|r| !r.identifier.is_empty())
            .map(|r| (r.identifier.as_str(), r.name.as_str()))
            .collect();
        entries.sort_unstable();

        entries
            .into_iter()
            .filter(|(identifier, name)| {
                identifier.to_lowercase().contains(&needle) || name.to_lowercase().contains(&needle)
            })
            .take(limit)
            .map(|(identifier, name)| IdentifierSuggestion {
                identifier: identifier.to_string(),
                label: suggestion_label(identifier, name),
            })
            .collect()
    }

    /// Retry persisting the current state.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let records = self.records.read().await;
        self.store.save(&records)?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Whether the last save failed
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Identifiers currently in use
    pub async fn identifiers(&self) -> HashSet<String> {
        let records = self.records.read().await;
        records.values().map(|r| r.identifier.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn record(identifier: &str, name: &str) -> IdentifierRecord {
        IdentifierRecord {
            identifier: identifier.to_string(),
            name: name.to_string(),
        }
    }

    fn seeded(entries: &[(&str, &str, &str)]) -> (Arc<MemoryStore>, IdentifierRegistry) {
        let mut records = Records::new();
        for (owner, identifier, name) in entries {
            records.insert(owner.to_string(), record(identifier, name));
        }
        let store = Arc::new(MemoryStore::with_records(records));
        let registry = IdentifierRegistry::load(store.clone());
        (store, registry)
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<RenameEvent>>,
    }

    #[async_trait]
    impl RenameNotifier for RecordingNotifier {
        async fn identifier_renamed(&self, event: &RenameEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_then_reuses() {
        let store = Arc::new(MemoryStore::new());
        let registry = IdentifierRegistry::load(store.clone());

        let first = registry.ensure("100", "Iron Rats").await.unwrap();
        assert_eq!(first.len(), IDENTIFIER_LENGTH);
        assert_eq!(store.save_count(), 1);

        let second = registry.ensure("100", "Iron Rats").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.save_count(), 1, "unchanged name must not persist");
    }

    #[tokio::test]
    async fn test_ensure_updates_name() {
        let (store, registry) = seeded(&[("100", "AAAA1111", "Old Name")]);

        let identifier = registry.ensure("100", "New Name").await.unwrap();
        assert_eq!(identifier, "AAAA1111");
        assert_eq!(store.save_count(), 1);
        assert_eq!(registry.get("100").await.unwrap().name, "New Name");
        assert_eq!(store.snapshot().unwrap()["100"].name, "New Name");
    }

    #[tokio::test]
    async fn test_ensure_generates_unique_identifiers() {
        let registry = IdentifierRegistry::load(Arc::new(MemoryStore::new()));
        for i in 0..50 {
            registry.ensure(&i.to_string(), "clan").await.unwrap();
        }
        assert_eq!(registry.identifiers().await.len(), 50);
    }

    #[tokio::test]
    async fn test_find_owner_and_remove() {
        let (store, registry) = seeded(&[("100", "AAAA1111", "Alpha"), ("200", "BBBB2222", "Beta")]);

        assert_eq!(
            registry.find_owner("BBBB2222").await,
            Some(OwnerInfo {
                owner_id: "200".into(),
                name: "Beta".into()
            })
        );
        assert_eq!(registry.find_owner("ZZZZ9999").await, None);

        let removed = registry.remove("200").await.unwrap();
        assert_eq!(removed.identifier, "BBBB2222");
        assert_eq!(registry.find_owner("BBBB2222").await, None);
        assert_eq!(store.save_count(), 1);

        assert_eq!(
            registry.remove("200").await,
            Err(RemoveError::NotFound("200".into()))
        );
    }

    #[tokio::test]
    async fn test_remove_by_identifier() {
        let (_, registry) = seeded(&[("100", "AAAA1111", "Alpha")]);

        let (owner_id, record) = registry.remove_by_identifier("AAAA1111").await.unwrap();
        assert_eq!(owner_id, "100");
        assert_eq!(record.name, "Alpha");
        assert!(registry.is_empty().await);
        assert!(registry.remove_by_identifier("AAAA1111").await.is_err());
    }

    #[tokio::test]
    async fn test_rename_validation() {
        let (store, registry) = seeded(&[("100", "AAAA1111", "Alpha"), ("200", "BBBB2222", "Beta")]);

        assert_eq!(
            registry.rename("AAAA1111", "ABCDEFGHI").await,
            Err(RenameError::LengthOutOfRange { length: 9, max: 8 })
        );
        assert_eq!(
            registry.rename("AAAA1111", "").await,
            Err(RenameError::LengthOutOfRange { length: 0, max: 8 })
        );
        assert!(matches!(
            registry.rename("AAAA1111", "abc").await,
            Err(RenameError::InvalidFormat { .. })
        ));
        assert!(matches!(
            registry.rename("AAAA1111", "AB-C").await,
            Err(RenameError::InvalidFormat { .. })
        ));
        assert_eq!(
            registry.rename("AAAA1111", "BBBB2222").await,
            Err(RenameError::Conflict {
                identifier: "BBBB2222".into(),
                owner_id: "200".into(),
                owner_name: "Beta".into(),
            })
        );
        assert_eq!(
            registry.rename("NOPE", "CCCC").await,
            Err(RenameError::NotFound {
                identifier: "NOPE".into()
            })
        );
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_rename_same_identifier_is_noop() {
        let (store, registry) = seeded(&[("100", "AAAA1111", "Alpha")]);
        assert_eq!(
            registry.rename("AAAA1111", "AAAA1111").await,
            Ok(RenameOutcome::Unchanged)
        );
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_rename_applies_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (store, registry) = seeded(&[("100", "AAAA1111", "Alpha")]);
        let registry = registry.with_notifier(notifier.clone());

        let outcome = registry.rename("AAAA1111", "RATS").await.unwrap();
        let expected = RenameEvent {
            owner_id: "100".into(),
            owner_name: "Alpha".into(),
            old_identifier: "AAAA1111".into(),
            new_identifier: "RATS".into(),
        };
        assert_eq!(outcome, RenameOutcome::Renamed(expected.clone()));
        assert_eq!(registry.find_owner("RATS").await.unwrap().owner_id, "100");
        assert!(registry.find_owner("AAAA1111").await.is_none());
        assert_eq!(store.snapshot().unwrap()["100"].identifier, "RATS");
        assert_eq!(*notifier.events.lock().unwrap(), vec![expected]);
    }

    #[tokio::test]
    async fn test_failed_persist_marks_dirty_then_flush() {
        let (store, registry) = seeded(&[("100", "AAAA1111", "Alpha")]);
        store.set_fail_saves(true);

        registry.rename("AAAA1111", "NEW1").await.unwrap();
        assert!(registry.is_dirty());
        // In-memory change is kept
        assert!(registry.find_owner("NEW1").await.is_some());
        assert_eq!(store.snapshot().unwrap()["100"].identifier, "AAAA1111");

        assert!(registry.flush().await.is_err());
        store.set_fail_saves(false);
        registry.flush().await.unwrap();
        assert!(!registry.is_dirty());
        assert_eq!(store.snapshot().unwrap()["100"].identifier, "NEW1");
    }

    #[tokio::test]
    async fn test_search() {
        let (_, registry) = seeded(&[
            ("1", "ZED00001", "Iron Rats"),
            ("2", "ABC00002", "Gold Guild"),
            ("3", "RAT00003", "Burgers"),
        ]);

        let hits = registry.search("rat", DEFAULT_SUGGESTION_LIMIT).await;
        let ids: Vec<_> = hits.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(ids, vec!["RAT00003", "ZED00001"]);
        assert_eq!(hits[1].label, "ZED00001 (Iron Rats)");

        assert_eq!(registry.search("", 2).await.len(), 2);
        assert!(registry.search("nothing", 25).await.is_empty());
    }

    #[test]
    fn test_suggestion_label_truncated() {
        let name = "x".repeat(150);
        let label = suggestion_label("AAAA1111", &name);
        assert_eq!(label.chars().count(), MAX_SUGGESTION_LABEL);
        assert!(label.ends_with("..."));
    }

    #[test]
    fn test_normalize_input() {
        assert_eq!(normalize_identifier_input("  rats1 "), "RATS1");
        assert!(validate_identifier(&normalize_identifier_input(" ab12 ")).is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_store_starts_empty() {
        struct Broken;
        impl RegistryStore for Broken {
            fn load(&self) -> Result<Records, StoreError> {
                Err(StoreError::Corrupt("bad".into()))
            }
            fn save(&self, _: &Records) -> Result<(), StoreError> {
                Ok(())
            }
            fn describe(&self) -> String {
                "broken".into()
            }
        }

        let registry = IdentifierRegistry::load(Arc::new(Broken));
        assert!(registry.is_empty().await);
        assert!(registry.ensure("1", "clan").await.is_ok());
    }
}
