//! Composition Engine: the outfit state machine over one base avatar.
//!
//! # Responsibility
//! - Track the ordered equipped sequence on top of a fixed base avatar.
//! - Decide when the external compositor must be called, and with what.
//! - Apply compositor results only when they still match engine state.
//!
//! # Invariants
//! - Every compositor request is built from the original base avatar and the
//!   full equipped sequence, never from a previous composite.
//! - An empty equipped sequence always displays the base avatar, without a
//!   compositor call.
//! - At most one compositor request is outstanding; `equip`, `unequip` and
//!   `retry` are rejected with `EngineError::Busy` while one is.
//! - The displayed image always comes from the most recently completed
//!   request whose input still matches the equipped sequence.
//!
//! # Protocol
//! Transitions that need compositing return a `ComposeRequest`. The host
//! runs the external call and hands the result back through `complete` with
//! the request's ticket. Stale tickets are ignored.

use crate::contract::compositor::CompositingError;
use crate::model::image::ImageData;
use crate::model::item::{ClothingItem, ItemId};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One equipped item with the image snapshot sent to the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquippedEntry {
    item_id: ItemId,
    order: u64,
    image: ImageData,
}

impl EquippedEntry {
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Insertion order within the session; strictly increasing.
    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }
}

/// Identifies one compositor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComposeTicket(u64);

impl ComposeTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Inputs for one external compositing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub ticket: ComposeTicket,
    pub base: ImageData,
    /// Garment images in equip order.
    pub garments: Vec<ImageData>,
    /// Item ids matching `garments`, for diagnostics.
    pub items: Vec<ItemId>,
}

/// Composite lifecycle for an avatar session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositionState {
    Idle {
        composite: ImageData,
    },
    Composing {
        previous: ImageData,
        pending: Vec<ItemId>,
    },
    Failed {
        previous: ImageData,
        error: CompositingError,
    },
}

impl CompositionState {
    /// Image to show while in this state.
    pub fn displayed(&self) -> &ImageData {
        match self {
            Self::Idle { composite } => composite,
            Self::Composing { previous, .. } | Self::Failed { previous, .. } => previous,
        }
    }
}

/// Coarse engine status for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// No base avatar; every transition fails with `EngineError::NoAvatar`.
    NoAvatar,
    Idle,
    Composing,
    Failed,
}

/// Rejected transitions. The engine state is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NoAvatar,
    /// A base avatar without image bytes was supplied.
    EmptyAvatar,
    /// A compositor request is outstanding.
    Busy,
    IndexOutOfRange { index: usize, len: usize },
    /// `retry` called while nothing has failed.
    NothingToRetry,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAvatar => write!(f, "no base avatar is set"),
            Self::EmptyAvatar => write!(f, "base avatar image is empty"),
            Self::Busy => write!(f, "a composite is already being generated"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "equipped index {index} out of range (len {len})")
            }
            Self::NothingToRetry => write!(f, "no failed composite to retry"),
        }
    }
}

impl Error for EngineError {}

/// What `complete` did with a compositor result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// New composite is displayed.
    Applied {
        composite: ImageData,
        /// First successful composite ever for this engine.
        first_composite: bool,
    },
    /// The call failed; the previous image stays displayed.
    Failed { error: CompositingError },
    /// The sequence changed while the call was in flight; the result was
    /// dropped and this follow-up request must be run.
    Recompose(ComposeRequest),
    /// The sequence emptied while the call was in flight; the base avatar is
    /// displayed again.
    Reverted,
    /// Result belongs to a request the engine no longer tracks.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowUp {
    Apply,
    /// Equipped sequence changed mid-flight.
    Recompose,
    /// Base avatar changed mid-flight.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    ticket: ComposeTicket,
    follow_up: FollowUp,
}

#[derive(Debug, Clone)]
struct AvatarSession {
    base: ImageData,
    equipped: Vec<EquippedEntry>,
    state: CompositionState,
}

/// Session-scoped outfit state machine.
#[derive(Debug, Clone)]
pub struct CompositionEngine {
    avatar: Option<AvatarSession>,
    in_flight: Option<InFlight>,
    next_generation: u64,
    next_order: u64,
    has_composited: bool,
}

impl Default for CompositionEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CompositionEngine {
    /// Creates an engine over `base`, or in the no-avatar state for `None`
    /// or an empty image.
    pub fn new(base: Option<ImageData>) -> Self {
        Self {
            avatar: base
                .filter(|image| !image.is_empty())
                .map(AvatarSession::fresh),
            in_flight: None,
            next_generation: 1,
            next_order: 0,
            has_composited: false,
        }
    }

    /// Restores the onboarding flag from a previous session.
    pub fn with_has_composited(mut self, has_composited: bool) -> Self {
        self.has_composited = has_composited;
        self
    }

    pub fn status(&self) -> EngineStatus {
        match self.avatar.as_ref().map(|avatar| &avatar.state) {
            None => EngineStatus::NoAvatar,
            Some(CompositionState::Idle { .. }) => EngineStatus::Idle,
            Some(CompositionState::Composing { .. }) => EngineStatus::Composing,
            Some(CompositionState::Failed { .. }) => EngineStatus::Failed,
        }
    }

    pub fn state(&self) -> Option<&CompositionState> {
        self.avatar.as_ref().map(|avatar| &avatar.state)
    }

    pub fn base_avatar(&self) -> Option<&ImageData> {
        self.avatar.as_ref().map(|avatar| &avatar.base)
    }

    /// Image to display now; `None` only without a base avatar.
    pub fn displayed(&self) -> Option<&ImageData> {
        self.state().map(CompositionState::displayed)
    }

    pub fn equipped(&self) -> &[EquippedEntry] {
        self.avatar
            .as_ref()
            .map_or(&[], |avatar| avatar.equipped.as_slice())
    }

    pub fn equipped_ids(&self) -> Vec<ItemId> {
        self.equipped().iter().map(EquippedEntry::item_id).collect()
    }

    /// Whether a compositor request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether any composite has ever succeeded (onboarding hints).
    pub fn has_composited(&self) -> bool {
        self.has_composited
    }

    /// Appends `item` to the equipped sequence and requests a composite.
    ///
    /// Duplicates, including several items of one category, are kept.
    pub fn equip(&mut self, item: &ClothingItem) -> Result<ComposeRequest, EngineError> {
        self.ensure_ready()?;
        let order = self.next_order;
        let avatar = self.avatar_mut()?;
        avatar.equipped.push(EquippedEntry {
            item_id: item.id(),
            order,
            image: item.image().clone(),
        });
        self.next_order += 1;
        info!(
            "event=outfit_equip module=engine status=ok item_id={} equipped_count={}",
            item.id(),
            self.equipped().len()
        );
        self.begin_compose()
    }

    /// Removes the entry at `index`.
    ///
    /// Returns `None` when the sequence became empty: the base avatar is
    /// displayed directly and no compositor call is needed.
    pub fn unequip(&mut self, index: usize) -> Result<Option<ComposeRequest>, EngineError> {
        self.ensure_ready()?;
        let avatar = self.avatar_mut()?;
        let len = avatar.equipped.len();
        if index >= len {
            return Err(EngineError::IndexOutOfRange { index, len });
        }
        let removed = avatar.equipped.remove(index);
        info!(
            "event=outfit_unequip module=engine status=ok item_id={} equipped_count={}",
            removed.item_id,
            len - 1
        );
        self.recompose_or_revert()
    }

    /// Re-issues the request for the current sequence after a failure.
    pub fn retry(&mut self) -> Result<Option<ComposeRequest>, EngineError> {
        self.ensure_ready()?;
        if !matches!(self.state(), Some(CompositionState::Failed { .. })) {
            return Err(EngineError::NothingToRetry);
        }
        info!("event=outfit_retry module=engine status=start");
        self.recompose_or_revert()
    }

    /// Removes every equipped entry of deleted catalog items.
    ///
    /// While a request is in flight the removal is recorded and its result
    /// is replaced by a follow-up request on completion.
    pub fn remove_items(&mut self, item_ids: &[ItemId]) -> Option<ComposeRequest> {
        let avatar = self.avatar.as_mut()?;
        let before = avatar.equipped.len();
        avatar
            .equipped
            .retain(|entry| !item_ids.contains(&entry.item_id));
        let removed = before - avatar.equipped.len();
        if removed == 0 {
            return None;
        }
        info!(
            "event=outfit_cascade_remove module=engine status=ok removed_count={removed} equipped_count={}",
            avatar.equipped.len()
        );

        if let Some(in_flight) = self.in_flight.as_mut() {
            if in_flight.follow_up == FollowUp::Apply {
                in_flight.follow_up = FollowUp::Recompose;
            }
            return None;
        }
        // Not busy here, so this cannot fail.
        self.recompose_or_revert().ok().flatten()
    }

    /// Convenience for a single deleted item.
    pub fn remove_item(&mut self, item_id: ItemId) -> Option<ComposeRequest> {
        self.remove_items(&[item_id])
    }

    /// Replaces the base avatar and resets the outfit.
    ///
    /// An outstanding request stays outstanding (and blocks new ones) but
    /// its result will be discarded. An empty image is rejected and leaves
    /// the engine unchanged.
    pub fn change_avatar(&mut self, base: ImageData) -> Result<(), EngineError> {
        if base.is_empty() {
            return Err(EngineError::EmptyAvatar);
        }
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.follow_up = FollowUp::Discard;
        }
        self.avatar = Some(AvatarSession::fresh(base));
        info!("event=avatar_change module=engine status=ok");
        Ok(())
    }

    /// Applies the result of the request identified by `ticket`.
    pub fn complete(
        &mut self,
        ticket: ComposeTicket,
        result: Result<ImageData, CompositingError>,
    ) -> CompletionOutcome {
        let Some(in_flight) = self.in_flight.filter(|in_flight| in_flight.ticket == ticket) else {
            debug!(
                "event=outfit_complete module=engine status=stale generation={}",
                ticket.generation()
            );
            return CompletionOutcome::Stale;
        };
        self.in_flight = None;

        match in_flight.follow_up {
            FollowUp::Discard => {
                debug!(
                    "event=outfit_complete module=engine status=discarded generation={}",
                    ticket.generation()
                );
                CompletionOutcome::Stale
            }
            FollowUp::Recompose => match self.recompose_or_revert() {
                Ok(Some(request)) => CompletionOutcome::Recompose(request),
                _ => CompletionOutcome::Reverted,
            },
            FollowUp::Apply => self.apply_result(ticket, result),
        }
    }

    fn apply_result(
        &mut self,
        ticket: ComposeTicket,
        result: Result<ImageData, CompositingError>,
    ) -> CompletionOutcome {
        let Some(avatar) = self.avatar.as_mut() else {
            return CompletionOutcome::Stale;
        };
        let previous = avatar.state.displayed().clone();
        match result {
            Ok(composite) => {
                avatar.state = CompositionState::Idle {
                    composite: composite.clone(),
                };
                let first_composite = !self.has_composited;
                self.has_composited = true;
                info!(
                    "event=outfit_complete module=engine status=ok generation={} first_composite={first_composite}",
                    ticket.generation()
                );
                CompletionOutcome::Applied {
                    composite,
                    first_composite,
                }
            }
            Err(error) => {
                warn!(
                    "event=outfit_complete module=engine status=error generation={} error_code={} error={error}",
                    ticket.generation(),
                    error.code()
                );
                avatar.state = CompositionState::Failed {
                    previous,
                    error: error.clone(),
                };
                CompletionOutcome::Failed { error }
            }
        }
    }

    fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.avatar.is_none() {
            return Err(EngineError::NoAvatar);
        }
        if self.in_flight.is_some() {
            return Err(EngineError::Busy);
        }
        Ok(())
    }

    fn avatar_mut(&mut self) -> Result<&mut AvatarSession, EngineError> {
        self.avatar.as_mut().ok_or(EngineError::NoAvatar)
    }

    /// Requests a composite for the current sequence, or shows the base
    /// avatar when the sequence is empty.
    fn recompose_or_revert(&mut self) -> Result<Option<ComposeRequest>, EngineError> {
        let avatar = self.avatar_mut()?;
        if avatar.equipped.is_empty() {
            avatar.state = CompositionState::Idle {
                composite: avatar.base.clone(),
            };
            debug!("event=outfit_revert module=engine status=ok");
            return Ok(None);
        }
        self.begin_compose().map(Some)
    }

    fn begin_compose(&mut self) -> Result<ComposeRequest, EngineError> {
        let ticket = ComposeTicket(self.next_generation);
        let avatar = self.avatar.as_mut().ok_or(EngineError::NoAvatar)?;
        let request = ComposeRequest {
            ticket,
            base: avatar.base.clone(),
            garments: avatar
                .equipped
                .iter()
                .map(|entry| entry.image.clone())
                .collect(),
            items: avatar.equipped.iter().map(|entry| entry.item_id).collect(),
        };
        avatar.state = CompositionState::Composing {
            previous: avatar.state.displayed().clone(),
            pending: request.items.clone(),
        };
        self.next_generation += 1;
        self.in_flight = Some(InFlight {
            ticket,
            follow_up: FollowUp::Apply,
        });
        debug!(
            "event=outfit_compose module=engine status=start generation={} garment_count={}",
            ticket.generation(),
            request.garments.len()
        );
        Ok(request)
    }
}

impl AvatarSession {
    fn fresh(base: ImageData) -> Self {
        Self {
            state: CompositionState::Idle {
                composite: base.clone(),
            },
            base,
            equipped: Vec::new(),
        }
    }
}
