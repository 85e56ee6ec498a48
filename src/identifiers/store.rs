//! Durable storage for the identifier registry
//!
//! The on-disk format is a flat JSON object keyed by owner id:
//!
//! ```json
//! {
//!     "123456789012345678": {
//!         "identifier": "AB12CD34",
//!         "name": "Iron Rats"
//!     }
//! }
//! ```
//!
//! Entries that do not have this shape are skipped on load with a warning.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One owner's identifier and last observed display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    pub identifier: String,
    pub name: String,
}

/// Owner id → record, in file order
pub type Records = IndexMap<String, IdentifierRecord>;

/// Registry storage failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Registry file not found: {0}")]
    Missing(PathBuf),

    #[error("Registry file is corrupt: {0}")]
    Corrupt(String),

    #[error("Registry I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Registry serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Load/save port for the registry mapping
///
/// Implementations rewrite the whole mapping on every save.
pub trait RegistryStore: Send + Sync {
    /// Read all records. A missing backing file is `StoreError::Missing`.
    fn load(&self) -> Result<Records, StoreError>;

    /// Replace the stored mapping with `records`.
    fn save(&self, records: &Records) -> Result<(), StoreError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Owner ids are decimal snowflakes
pub fn is_valid_owner_id(owner_id: &str) -> bool {
    !owner_id.is_empty() && owner_id.bytes().all(|b| b.is_ascii_digit())
}

/// Validate a decoded JSON document into records, skipping malformed entries.
pub fn records_from_json(value: serde_json::Value, source: &str) -> Result<Records, StoreError> {
    let serde_json::Value::Object(entries) = value else {
        return Err(StoreError::Corrupt(format!(
            "{} does not contain a JSON object",
            source
        )));
    };

    let mut records = Records::with_capacity(entries.len());
    for (owner_id, entry) in entries {
        let identifier = entry.get("identifier").and_then(|v| v.as_str());
        let name = entry.get("name").and_then(|v| v.as_str());

        match (identifier, name) {
            (Some(identifier), Some(name)) if is_valid_owner_id(&owner_id) => {
                records.insert(
                    owner_id,
                    IdentifierRecord {
                        identifier: identifier.to_string(),
                        name: name.to_string(),
                    },
                );
            }
            _ => {
                warn!(
                    "Invalid format for owner ID '{}' in {}. Skipping.",
                    owner_id, source
                );
            }
        }
    }

    Ok(records)
}

/// Serialize records with four-space indentation.
pub fn records_to_json(records: &Records) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    Ok(buf)
}

/// JSON file on local disk
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/<file_name>`
    pub fn in_dir(data_dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self::new(data_dir.as_ref().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Records, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;

        let records = records_from_json(value, &self.describe())?;
        info!(
            "Loaded {} valid identifiers from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    fn save(&self, records: &Records) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write beside the target and rename over it so a crash mid-write
        // never leaves a truncated registry behind.
        let bytes = records_to_json(records)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &self.path)?;

        info!(
            "Saved {} identifiers to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Option<Records>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    /// Empty store with no saved state (loads as `Missing`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that loads `records`
    pub fn with_records(records: Records) -> Self {
        Self {
            records: Mutex::new(Some(records)),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail with an I/O error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last successfully saved mapping
    pub fn snapshot(&self) -> Option<Records> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<Records, StoreError> {
        self.snapshot()
            .ok_or_else(|| StoreError::Missing(PathBuf::from("<memory>")))
    }

    fn save(&self, records: &Records) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::other("simulated save failure")));
        }
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = Some(records.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}
