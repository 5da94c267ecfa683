//! Styler session: bootstrap plus coordinated user actions.
//!
//! # Responsibility
//! - Establish the base avatar (handoff, then durable fallback).
//! - Restore catalog and layout state without failing on bad data.
//! - Drive the composition engine against the compositor contract and
//!   persist successful composites.
//! - Cascade catalog deletes into layout and equipped state.
//!
//! # Invariants
//! - Storage failures are returned as warnings; in-memory state stays
//!   authoritative for the session.
//! - The persisted base avatar is never overwritten by a composite.

use crate::contract::analyzer::Analyzer;
use crate::contract::compositor::{CompositingError, Compositor};
use crate::model::image::ImageData;
use crate::model::item::{ClothingItem, ItemId};
use crate::repo::{keys, load_json, save_json, DurableStore, StorageError};
use crate::service::catalog_store::{CatalogError, CatalogStore, ClearConfirmation};
use crate::service::composition_engine::{
    CompletionOutcome, ComposeRequest, CompositionEngine, EngineError, EngineStatus,
};
use crate::service::layout_store::LayoutStore;
use crate::service::upload_flow::{UploadDraft, UploadError, UploadFlow, UploadTicket};
use crate::service::StoreOutcome;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Where the session's base avatar came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarSource {
    /// Passed in by the previous screen.
    Handoff,
    /// Restored from a previous session.
    Restored,
    /// Neither was available; the engine is in the no-avatar state.
    Missing,
}

/// Persisted onboarding flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingState {
    pub first_composite_done: bool,
}

/// Session-level action failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Engine(EngineError),
    UnknownItem(ItemId),
    Catalog(CatalogError),
    Upload(UploadError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::UnknownItem(id) => write!(f, "clothing item not found: {id}"),
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Upload(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Catalog(err) => Some(err),
            Self::Upload(err) => Some(err),
            Self::UnknownItem(_) => None,
        }
    }
}

impl From<EngineError> for SessionError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<CatalogError> for SessionError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<UploadError> for SessionError {
    fn from(value: UploadError) -> Self {
        Self::Upload(value)
    }
}

/// Result of a user action on the outfit, as the host should render it.
#[derive(Debug, Clone, PartialEq)]
pub struct LookUpdate {
    pub status: EngineStatus,
    /// Image to display; `None` only without a base avatar.
    pub displayed: Option<ImageData>,
    /// Set when the compositor failed; the previous image stays displayed.
    pub compositing_error: Option<CompositingError>,
    /// True exactly once, on the first successful composite.
    pub first_composite: bool,
    pub storage_warnings: Vec<StorageError>,
}

/// Bootstrap result: the session plus what happened while restoring it.
pub struct SessionBootstrap {
    pub session: Session,
    pub avatar_source: AvatarSource,
    pub storage_warnings: Vec<StorageError>,
}

/// One styler session.
pub struct Session {
    store: Arc<dyn DurableStore>,
    catalog: CatalogStore,
    layout: LayoutStore,
    engine: CompositionEngine,
    uploads: UploadFlow,
    compositor: Arc<dyn Compositor>,
    analyzer: Arc<dyn Analyzer>,
}

impl Session {
    /// Starts a session.
    ///
    /// `handoff` takes precedence over the stored base avatar and is
    /// persisted for later sessions.
    pub fn bootstrap(
        store: Arc<dyn DurableStore>,
        handoff: Option<ImageData>,
        compositor: Arc<dyn Compositor>,
        analyzer: Arc<dyn Analyzer>,
    ) -> SessionBootstrap {
        let started_at = Instant::now();
        let mut warnings = Vec::new();

        let catalog = CatalogStore::load(Arc::clone(&store));
        warnings.extend(catalog.storage_warning);
        let layout = LayoutStore::load(Arc::clone(&store));
        warnings.extend(layout.storage_warning);

        let (base, avatar_source) = match handoff.filter(|image| !image.is_empty()) {
            Some(image) => {
                if let Err(err) = save_json(store.as_ref(), keys::BASE_AVATAR, &image) {
                    warn!(
                        "event=avatar_persist module=session status=error error_code={} error={err}",
                        err.code()
                    );
                    warnings.push(err);
                }
                (Some(image), AvatarSource::Handoff)
            }
            None => match load_base_avatar(store.as_ref()) {
                Ok(Some(image)) if !image.is_empty() => (Some(image), AvatarSource::Restored),
                Ok(_) => (None, AvatarSource::Missing),
                Err(err) => {
                    warn!(
                        "event=avatar_restore module=session status=error error_code={} error={err}",
                        err.code()
                    );
                    warnings.push(err);
                    (None, AvatarSource::Missing)
                }
            },
        };

        let onboarding = match load_json::<OnboardingState>(store.as_ref(), keys::ONBOARDING) {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                warnings.push(err);
                OnboardingState::default()
            }
        };

        let engine = CompositionEngine::new(base)
            .with_has_composited(onboarding.first_composite_done);

        info!(
            "event=session_bootstrap module=session status=ok avatar_source={avatar_source:?} item_count={} override_count={} warning_count={} duration_ms={}",
            catalog.value.len(),
            layout.value.override_count(),
            warnings.len(),
            started_at.elapsed().as_millis()
        );

        SessionBootstrap {
            session: Self {
                store,
                catalog: catalog.value,
                layout: layout.value,
                engine,
                uploads: UploadFlow::new(),
                compositor,
                analyzer,
            },
            avatar_source,
            storage_warnings: warnings,
        }
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn layout(&self) -> &LayoutStore {
        &self.layout
    }

    /// Layout is not part of the engine's guarded state; hosts drive drags
    /// directly on it.
    pub fn layout_mut(&mut self) -> &mut LayoutStore {
        &mut self.layout
    }

    pub fn engine(&self) -> &CompositionEngine {
        &self.engine
    }

    pub fn uploads(&self) -> &UploadFlow {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut UploadFlow {
        &mut self.uploads
    }

    /// Current look without running any transition.
    pub fn look(&self) -> LookUpdate {
        self.snapshot(None, false, Vec::new())
    }

    /// Equips a catalog item and composites the new outfit.
    pub fn equip_item(&mut self, item_id: ItemId) -> Result<LookUpdate, SessionError> {
        let item = self
            .catalog
            .get(item_id)
            .ok_or(SessionError::UnknownItem(item_id))?;
        let request = self.engine.equip(item)?;
        Ok(self.drive(Some(request), Vec::new()))
    }

    /// Unequips the entry at `index` of the equipped sequence.
    pub fn unequip(&mut self, index: usize) -> Result<LookUpdate, SessionError> {
        let request = self.engine.unequip(index)?;
        Ok(self.drive(request, Vec::new()))
    }

    /// Retries the last failed composite.
    pub fn retry(&mut self) -> Result<LookUpdate, SessionError> {
        let request = self.engine.retry()?;
        Ok(self.drive(request, Vec::new()))
    }

    /// Deletes a catalog item and cascades into layout and outfit.
    pub fn delete_item(&mut self, item_id: ItemId) -> LookUpdate {
        let mut warnings = Vec::new();
        let removed = self.catalog.remove(item_id);
        warnings.extend(removed.storage_warning);
        warnings.extend(self.layout.forget(item_id).storage_warning);
        let request = self.engine.remove_item(item_id);
        self.drive(request, warnings)
    }

    /// Issues the confirmation token the host must show before clearing.
    pub fn request_clear(&self) -> Result<ClearConfirmation, SessionError> {
        Ok(self.catalog.request_clear()?)
    }

    /// Clears the whole catalog, all bubble overrides and affected outfit entries.
    pub fn clear_catalog(
        &mut self,
        confirmation: ClearConfirmation,
    ) -> Result<LookUpdate, SessionError> {
        let cleared = self.catalog.clear_all(confirmation)?;
        let mut warnings: Vec<StorageError> = cleared.storage_warning.into_iter().collect();
        warnings.extend(self.layout.clear().storage_warning);
        let removed_ids: Vec<ItemId> = cleared.value.iter().map(ClothingItem::id).collect();
        let request = self.engine.remove_items(&removed_ids);
        Ok(self.drive(request, warnings))
    }

    /// Replaces the base avatar, resetting the outfit.
    ///
    /// An empty image is rejected before anything is written.
    pub fn change_avatar(&mut self, base: ImageData) -> Result<LookUpdate, SessionError> {
        self.engine.change_avatar(base.clone())?;
        let mut warnings = Vec::new();
        if let Err(err) = save_json(self.store.as_ref(), keys::BASE_AVATAR, &base) {
            warnings.push(err);
        }
        if let Err(err) = self.store.remove(keys::CURRENT_LOOK) {
            warnings.push(err);
        }
        Ok(self.snapshot(None, false, warnings))
    }

    /// Starts a new pending upload.
    pub fn begin_upload(&mut self, image: ImageData) -> UploadTicket {
        self.uploads.begin(image)
    }

    /// Runs the analyzer for the current draft and applies its suggestion.
    pub fn analyze_upload(&mut self) -> Result<&UploadDraft, SessionError> {
        let draft = self.uploads.draft().ok_or(UploadError::NoPendingUpload)?;
        let ticket = draft.ticket();
        let result = self.analyzer.analyze(draft.image());
        Ok(self.uploads.apply_analysis(ticket, result)?)
    }

    /// Saves the current draft into the catalog.
    pub fn save_upload(&mut self) -> Result<StoreOutcome<ClothingItem>, SessionError> {
        Ok(self.uploads.save(&mut self.catalog)?)
    }

    pub fn cancel_upload(&mut self) -> Option<UploadDraft> {
        self.uploads.cancel()
    }

    /// Runs compositor requests until the engine settles.
    fn drive(
        &mut self,
        mut request: Option<ComposeRequest>,
        mut warnings: Vec<StorageError>,
    ) -> LookUpdate {
        let mut compositing_error = None;
        let mut first_composite = false;

        while let Some(current) = request.take() {
            let started_at = Instant::now();
            let result = self.compositor.compose(&current.base, &current.garments);
            info!(
                "event=compositor_call module=session status={} garment_count={} duration_ms={}",
                if result.is_ok() { "ok" } else { "error" },
                current.garments.len(),
                started_at.elapsed().as_millis()
            );

            match self.engine.complete(current.ticket, result) {
                CompletionOutcome::Applied {
                    composite,
                    first_composite: first,
                } => {
                    warnings.extend(self.persist_look(&composite, first));
                    first_composite |= first;
                }
                CompletionOutcome::Failed { error } => compositing_error = Some(error),
                CompletionOutcome::Recompose(next) => request = Some(next),
                CompletionOutcome::Reverted | CompletionOutcome::Stale => {}
            }
        }

        // An empty outfit shows the base avatar; no composite is current.
        if self.engine.equipped().is_empty() && self.engine.base_avatar().is_some() {
            warnings.extend(self.forget_look());
        }

        self.snapshot(compositing_error, first_composite, warnings)
    }

    fn persist_look(&self, composite: &ImageData, first: bool) -> Vec<StorageError> {
        let mut warnings = Vec::new();
        if let Err(err) = save_json(self.store.as_ref(), keys::CURRENT_LOOK, composite) {
            warn!(
                "event=look_persist module=session status=error error_code={} error={err}",
                err.code()
            );
            warnings.push(err);
        }
        if first {
            let state = OnboardingState {
                first_composite_done: true,
            };
            if let Err(err) = save_json(self.store.as_ref(), keys::ONBOARDING, &state) {
                warnings.push(err);
            }
        }
        warnings
    }

    fn forget_look(&self) -> Option<StorageError> {
        self.store.remove(keys::CURRENT_LOOK).err()
    }

    fn snapshot(
        &self,
        compositing_error: Option<CompositingError>,
        first_composite: bool,
        storage_warnings: Vec<StorageError>,
    ) -> LookUpdate {
        LookUpdate {
            status: self.engine.status(),
            displayed: self.engine.displayed().cloned(),
            compositing_error,
            first_composite,
            storage_warnings,
        }
    }
}

/// Reads the persisted base avatar, if any.
pub fn load_base_avatar(store: &dyn DurableStore) -> Result<Option<ImageData>, StorageError> {
    load_json(store, keys::BASE_AVATAR)
}

/// Reads the last persisted composite, if any.
pub fn load_current_look(store: &dyn DurableStore) -> Result<Option<ImageData>, StorageError> {
    load_json(store, keys::CURRENT_LOOK)
}
