//! Clan identifiers
//!
//! Each owner (guild) gets a short public code. The code is what API clients
//! present; the owner id stays private.

pub mod generator;
pub mod notify;
pub mod registry;
pub mod store;

pub use generator::{generate, GenerateError, IDENTIFIER_LENGTH};
pub use notify::{
    ChatSurface, LogNotifier, RenameEvent, RenameNotifier, SurfaceError, SurfaceMessage,
    SurfaceRenameNotifier,
};
pub use registry::{
    normalize_identifier_input, IdentifierRegistry, IdentifierSuggestion, OwnerInfo,
    RegistryError, RemoveError, RenameError, RenameOutcome, DEFAULT_SUGGESTION_LIMIT,
};
pub use store::{IdentifierRecord, JsonFileStore, MemoryStore, Records, RegistryStore, StoreError};
