//! Upload flow: one pending clothing upload awaiting name and category.
//!
//! # Responsibility
//! - Hold the draft between capture and catalog save.
//! - Apply asynchronous analysis suggestions only to the draft they were
//!   requested for.
//!
//! # Invariants
//! - At most one draft exists; `begin` supersedes the previous one.
//! - Analysis never overwrites a field the user already edited.
//! - A failed analysis leaves a blank name and the default category.

use crate::contract::analyzer::{AnalysisError, ItemAnalysis};
use crate::model::image::ImageData;
use crate::model::item::{Category, ClothingItem};
use crate::service::catalog_store::{CatalogError, CatalogStore};
use crate::service::StoreOutcome;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identifies one draft; results tagged with an older ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadTicket(u64);

/// Analysis progress for the current draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    Pending,
    Applied,
    Failed(AnalysisError),
}

/// Pending upload as edited in the "add item" dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDraft {
    ticket: UploadTicket,
    image: ImageData,
    name: String,
    category: Category,
    name_edited: bool,
    category_edited: bool,
    analysis: AnalysisStatus,
}

impl UploadDraft {
    pub fn ticket(&self) -> UploadTicket {
        self.ticket
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn analysis(&self) -> &AnalysisStatus {
        &self.analysis
    }

    /// Whether the save action should be enabled.
    pub fn can_save(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    NoPendingUpload,
    /// Ticket does not name the current draft (cancelled or superseded).
    StaleTicket,
    Catalog(CatalogError),
}

impl Display for UploadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPendingUpload => write!(f, "no pending upload"),
            Self::StaleTicket => write!(f, "upload was cancelled or replaced"),
            Self::Catalog(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Catalog(err) => Some(err),
            Self::NoPendingUpload | Self::StaleTicket => None,
        }
    }
}

impl From<CatalogError> for UploadError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

/// Single-draft upload state.
#[derive(Debug, Default)]
pub struct UploadFlow {
    draft: Option<UploadDraft>,
    next_ticket: u64,
}

impl UploadFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a draft for `image`, replacing any existing draft.
    pub fn begin(&mut self, image: ImageData) -> UploadTicket {
        self.next_ticket += 1;
        let ticket = UploadTicket(self.next_ticket);
        if self.draft.is_some() {
            debug!("event=upload_begin module=upload status=superseded");
        }
        self.draft = Some(UploadDraft {
            ticket,
            image,
            name: String::new(),
            category: Category::default(),
            name_edited: false,
            category_edited: false,
            analysis: AnalysisStatus::Pending,
        });
        ticket
    }

    pub fn draft(&self) -> Option<&UploadDraft> {
        self.draft.as_ref()
    }

    pub fn current_ticket(&self) -> Option<UploadTicket> {
        self.draft.as_ref().map(UploadDraft::ticket)
    }

    /// Applies an analysis result if `ticket` still names the current draft.
    pub fn apply_analysis(
        &mut self,
        ticket: UploadTicket,
        result: Result<ItemAnalysis, AnalysisError>,
    ) -> Result<&UploadDraft, UploadError> {
        let draft = self
            .draft
            .as_mut()
            .filter(|draft| draft.ticket == ticket)
            .ok_or(UploadError::StaleTicket)?;

        match result {
            Ok(analysis) => {
                if !draft.name_edited {
                    draft.name = analysis.title;
                }
                if !draft.category_edited {
                    draft.category = analysis.category;
                }
                draft.analysis = AnalysisStatus::Applied;
                info!(
                    "event=upload_analysis module=upload status=ok category={}",
                    draft.category
                );
            }
            Err(err) => {
                let fallback = ItemAnalysis::fallback();
                if !draft.name_edited {
                    draft.name = fallback.title;
                }
                if !draft.category_edited {
                    draft.category = fallback.category;
                }
                warn!("event=upload_analysis module=upload status=error error={err}");
                draft.analysis = AnalysisStatus::Failed(err);
            }
        }
        Ok(draft)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), UploadError> {
        let draft = self.draft.as_mut().ok_or(UploadError::NoPendingUpload)?;
        draft.name = name.into();
        draft.name_edited = true;
        Ok(())
    }

    pub fn set_category(&mut self, category: Category) -> Result<(), UploadError> {
        let draft = self.draft.as_mut().ok_or(UploadError::NoPendingUpload)?;
        draft.category = category;
        draft.category_edited = true;
        Ok(())
    }

    /// Discards the draft; late analysis results for it become stale.
    pub fn cancel(&mut self) -> Option<UploadDraft> {
        self.draft.take()
    }

    /// Saves the draft into `catalog`.
    ///
    /// The draft is cleared once the item exists in memory, even when the
    /// durable write failed. It is kept on validation errors.
    pub fn save(
        &mut self,
        catalog: &mut CatalogStore,
    ) -> Result<StoreOutcome<ClothingItem>, UploadError> {
        let draft = self.draft.as_ref().ok_or(UploadError::NoPendingUpload)?;
        let outcome = catalog.add(Some(draft.image.clone()), &draft.name, draft.category)?;
        self.draft = None;
        Ok(outcome)
    }
}
