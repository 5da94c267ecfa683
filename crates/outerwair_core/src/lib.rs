//! Core logic for the Outerwair virtual styler.
//!
//! This crate owns the outfit composition state machine, the clothing
//! catalog, bubble layout and session bootstrap. Pixel compositing and
//! clothing analysis are delegated to external services through the
//! `contract` traits.

pub mod config;
pub mod contract;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::StylerConfig;
pub use contract::analyzer::{parse_analysis_reply, AnalysisError, Analyzer, ItemAnalysis};
pub use contract::compositor::{CompositingError, Compositor};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::image::{ImageData, ImageDataError};
pub use model::item::{Category, CategoryFilter, ClothingItem, ItemId, ValidationError};
pub use model::layout::{DisplayRect, LayoutPosition, PointerPosition};
pub use repo::memory_store::MemoryStore;
pub use repo::sqlite_store::SqliteStore;
pub use repo::{DurableStore, StorageError, StorageResult};
pub use service::catalog_store::{CatalogError, CatalogStore, ClearConfirmation};
pub use service::composition_engine::{
    CompletionOutcome, ComposeRequest, ComposeTicket, CompositionEngine, CompositionState,
    EngineError, EngineStatus, EquippedEntry,
};
pub use service::layout_store::{default_position, LayoutError, LayoutStore};
pub use service::session::{AvatarSource, LookUpdate, Session, SessionBootstrap, SessionError};
pub use service::upload_flow::{AnalysisStatus, UploadDraft, UploadError, UploadFlow, UploadTicket};
pub use service::StoreOutcome;

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
