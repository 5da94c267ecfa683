//! Catalog Store: the user's clothing catalog.
//!
//! # Responsibility
//! - Own clothing record lifetime (create, delete, clear).
//! - Persist the whole catalog atomically under one storage key.
//!
//! # Invariants
//! - `list` preserves insertion order.
//! - Ids are unique within the catalog.
//! - A failed durable write keeps the in-memory change and reports a warning.
//! - `clear_all` is reachable only with a confirmation issued for the
//!   current catalog revision.

use crate::model::image::ImageData;
use crate::model::item::{Category, CategoryFilter, ClothingItem, ItemId, ValidationError};
use crate::repo::{keys, load_json, save_json, DurableStore, StorageError};
use crate::service::StoreOutcome;
use log::{info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Catalog operation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Validation(ValidationError),
    /// Clear requested on an empty catalog.
    Empty,
    /// Confirmation was issued before a later catalog change.
    StaleConfirmation,
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Empty => write!(f, "no items to clear"),
            Self::StaleConfirmation => {
                write!(f, "catalog changed since clear was confirmed; confirm again")
            }
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Empty | Self::StaleConfirmation => None,
        }
    }
}

impl From<ValidationError> for CatalogError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Proof that the user confirmed clearing the catalog.
///
/// Only `CatalogStore::request_clear` can create one, and it is bound to the
/// catalog revision it was issued for.
#[derive(Debug, PartialEq, Eq)]
pub struct ClearConfirmation {
    revision: u64,
    item_count: usize,
}

impl ClearConfirmation {
    /// Number of items the user is about to delete.
    pub fn item_count(&self) -> usize {
        self.item_count
    }
}

/// In-memory catalog backed by a durable store.
pub struct CatalogStore {
    store: Arc<dyn DurableStore>,
    items: Vec<ClothingItem>,
    revision: u64,
}

impl CatalogStore {
    /// Creates an empty catalog without reading storage.
    pub fn empty(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            items: Vec::new(),
            revision: 0,
        }
    }

    /// Restores the catalog from durable storage.
    ///
    /// Missing or malformed data yields an empty catalog plus a warning.
    /// Each record is decoded on its own: undecodable records, records
    /// failing validation and duplicate ids are dropped, the rest are kept.
    pub fn load(store: Arc<dyn DurableStore>) -> StoreOutcome<Self> {
        let (items, warning) = match load_json::<Vec<Value>>(store.as_ref(), keys::CATALOG) {
            Ok(Some(records)) => (sanitize_loaded(records), None),
            Ok(None) => (Vec::new(), None),
            Err(err) => {
                warn!(
                    "event=catalog_load module=catalog status=error error_code={} error={err}",
                    err.code()
                );
                (Vec::new(), Some(err))
            }
        };
        info!(
            "event=catalog_load module=catalog status=ok item_count={}",
            items.len()
        );
        StoreOutcome::with_warning(
            Self {
                store,
                items,
                revision: 0,
            },
            warning,
        )
    }

    /// Adds one item built from the pending upload.
    ///
    /// # Errors
    /// - `Validation` when the name is blank or the image is missing; nothing
    ///   is added in that case.
    ///
    /// A failed durable write keeps the item and sets `storage_warning`.
    pub fn add(
        &mut self,
        pending_image: Option<ImageData>,
        name: &str,
        category: Category,
    ) -> Result<StoreOutcome<ClothingItem>, CatalogError> {
        let item = ClothingItem::create(pending_image, name, category)?;
        self.items.push(item.clone());
        self.revision += 1;

        let warning = self.persist();
        info!(
            "event=catalog_add module=catalog status=ok item_id={} category={} durable={}",
            item.id(),
            item.category(),
            warning.is_none()
        );
        Ok(StoreOutcome::with_warning(item, warning))
    }

    /// Removes one item. Absent ids are a no-op without a storage write.
    pub fn remove(&mut self, id: ItemId) -> StoreOutcome<Option<ClothingItem>> {
        let Some(index) = self.items.iter().position(|item| item.id() == id) else {
            return StoreOutcome::durable(None);
        };
        let removed = self.items.remove(index);
        self.revision += 1;

        let warning = self.persist();
        info!(
            "event=catalog_remove module=catalog status=ok item_id={id} durable={}",
            warning.is_none()
        );
        StoreOutcome::with_warning(Some(removed), warning)
    }

    /// Issues a clear confirmation for the current catalog contents.
    pub fn request_clear(&self) -> Result<ClearConfirmation, CatalogError> {
        if self.items.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(ClearConfirmation {
            revision: self.revision,
            item_count: self.items.len(),
        })
    }

    /// Deletes every item and the durable catalog key.
    ///
    /// Returns the removed items in insertion order.
    pub fn clear_all(
        &mut self,
        confirmation: ClearConfirmation,
    ) -> Result<StoreOutcome<Vec<ClothingItem>>, CatalogError> {
        if confirmation.revision != self.revision || confirmation.item_count != self.items.len() {
            return Err(CatalogError::StaleConfirmation);
        }
        let removed = std::mem::take(&mut self.items);
        self.revision += 1;

        let warning = self.store.remove(keys::CATALOG).err();
        if let Some(err) = &warning {
            warn!(
                "event=catalog_clear module=catalog status=error error_code={} error={err}",
                err.code()
            );
        }
        info!(
            "event=catalog_clear module=catalog status=ok removed_count={}",
            removed.len()
        );
        Ok(StoreOutcome::with_warning(removed, warning))
    }

    /// Lists items in insertion order, filtered by category.
    pub fn list(&self, filter: CategoryFilter) -> Vec<&ClothingItem> {
        self.items
            .iter()
            .filter(|item| filter.matches(item.category()))
            .collect()
    }

    pub fn get(&self, id: ItemId) -> Option<&ClothingItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count_in(&self, category: Category) -> usize {
        self.items
            .iter()
            .filter(|item| item.category() == category)
            .count()
    }

    /// Monotonic change counter, bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn persist(&self) -> Option<StorageError> {
        match save_json(self.store.as_ref(), keys::CATALOG, &self.items) {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    "event=catalog_save module=catalog status=error error_code={} item_count={} error={err}",
                    err.code(),
                    self.items.len()
                );
                Some(err)
            }
        }
    }
}

fn sanitize_loaded(records: Vec<Value>) -> Vec<ClothingItem> {
    let mut seen = HashSet::new();
    let loaded_count = records.len();
    let kept: Vec<ClothingItem> = records
        .into_iter()
        .filter_map(|record| serde_json::from_value::<ClothingItem>(record).ok())
        .filter(|item| item.validate().is_ok() && seen.insert(item.id()))
        .collect();
    if kept.len() != loaded_count {
        warn!(
            "event=catalog_load module=catalog status=degraded dropped_count={}",
            loaded_count - kept.len()
        );
    }
    kept
}
