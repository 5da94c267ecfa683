//! Durable key/value storage contract and implementations.
//!
//! # Responsibility
//! - Define the `save/load/remove` contract the stores persist through.
//! - Keep SQLite details behind the persistence boundary.
//!
//! # Invariants
//! - Each `save` replaces the whole value for its key atomically.
//! - Capacity failures surface as `StorageError::QuotaExceeded`, never as a
//!   generic backend error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory_store;
pub mod sqlite_store;

/// Fixed storage keys.
pub mod keys {
    /// Serialized catalog (`Vec<ClothingItem>` in insertion order).
    pub const CATALOG: &str = "clothing_items";
    /// Serialized manual bubble positions keyed by item id.
    pub const LAYOUT: &str = "bubble_positions";
    /// Last base avatar handed to a session.
    pub const BASE_AVATAR: &str = "base_avatar";
    /// Last successful composite ("current look").
    pub const CURRENT_LOOK: &str = "current_look";
    /// Onboarding flags (first successful composite).
    pub const ONBOARDING: &str = "onboarding_state";
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable storage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store refused the write for lack of capacity.
    QuotaExceeded { key: String },
    /// Transport/backend failure unrelated to capacity.
    Backend(String),
    /// Value could not be encoded or decoded.
    Serialization { key: String, details: String },
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Stable machine-readable code for logs and host envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuotaExceeded { .. } => "storage_quota_exceeded",
            Self::Backend(_) => "storage_backend_failed",
            Self::Serialization { .. } => "storage_serialization_failed",
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { key } => write!(f, "storage quota exceeded while saving `{key}`"),
            Self::Backend(details) => write!(f, "storage backend failure: {details}"),
            Self::Serialization { key, details } => {
                write!(f, "failed to encode/decode `{key}`: {details}")
            }
        }
    }
}

impl Error for StorageError {}

/// Durable storage contract consumed by the catalog, layout and session.
pub trait DurableStore: Send + Sync {
    fn save(&self, key: &str, value: &str) -> StorageResult<()>;
    fn load(&self, key: &str) -> StorageResult<Option<String>>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Serializes `value` as JSON and saves it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn DurableStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let encoded = serde_json::to_string(value).map_err(|err| StorageError::Serialization {
        key: key.to_string(),
        details: err.to_string(),
    })?;
    store.save(key, &encoded)
}

/// Loads and decodes the JSON value under `key`.
///
/// Returns `Ok(None)` when the key is absent and `Serialization` when the
/// stored text is malformed.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn DurableStore,
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(raw) = store.load(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|err| StorageError::Serialization {
            key: key.to_string(),
            details: err.to_string(),
        })
}
