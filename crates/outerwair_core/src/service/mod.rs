//! Core use-case services.
//!
//! # Responsibility
//! - Own the in-memory state of the catalog, layout, composition and upload
//!   flows, and persist it through the durable store contract.
//! - Keep host/UI layers decoupled from storage details.
//!
//! # Invariants
//! - In-memory state is authoritative for the session; a failed durable
//!   write is reported, never rolled back.

use crate::repo::StorageError;

pub mod catalog_store;
pub mod composition_engine;
pub mod layout_store;
pub mod session;
pub mod upload_flow;

/// Result of a store operation whose durable write may have failed.
///
/// `value` always reflects the in-memory outcome; `storage_warning` is set
/// when the change may not survive a reload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOutcome<T> {
    pub value: T,
    pub storage_warning: Option<StorageError>,
}

impl<T> StoreOutcome<T> {
    pub fn durable(value: T) -> Self {
        Self {
            value,
            storage_warning: None,
        }
    }

    pub fn with_warning(value: T, warning: Option<StorageError>) -> Self {
        Self {
            value,
            storage_warning: warning,
        }
    }

    /// Whether the durable write (if any) succeeded.
    pub fn is_durable(&self) -> bool {
        self.storage_warning.is_none()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StoreOutcome<U> {
        StoreOutcome {
            value: f(self.value),
            storage_warning: self.storage_warning,
        }
    }
}
