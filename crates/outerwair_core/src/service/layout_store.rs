//! Layout Store: on-screen placement of catalog bubbles around the avatar.
//!
//! # Responsibility
//! - Compute deterministic default positions per category.
//! - Hold manual overrides and persist them on drag release.
//! - Run the single-marker drag protocol.
//!
//! # Invariants
//! - Default positions of one category are centered on its anchor.
//! - At most one marker is mid-drag; intermediate moves never write storage.
//! - Manual and dragged positions are clamped to `[0, 100]`.

use crate::model::item::{Category, ClothingItem, ItemId};
use crate::model::layout::{DisplayRect, LayoutPosition, PointerPosition, MAX_PERCENT};
use crate::repo::{keys, load_json, save_json, DurableStore, StorageError};
use crate::service::StoreOutcome;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Fixed anchor plus per-item step for one category's bubble group.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CategoryAnchor {
    left: f64,
    top: f64,
    step_left: f64,
    step_top: f64,
}

const ITEM_SPREAD: f64 = 12.0;
/// Minimum distance between a default position and the display edge.
const EDGE_MARGIN: f64 = 4.0;

fn anchor_for(category: Category) -> CategoryAnchor {
    match category {
        // Above center, spread sideways.
        Category::Tops => CategoryAnchor {
            left: 50.0,
            top: 15.0,
            step_left: ITEM_SPREAD,
            step_top: 0.0,
        },
        // Right of center, stacked vertically.
        Category::Outerwear => CategoryAnchor {
            left: 82.0,
            top: 40.0,
            step_left: 0.0,
            step_top: ITEM_SPREAD,
        },
        // Left of center, stacked vertically.
        Category::Accessories => CategoryAnchor {
            left: 18.0,
            top: 40.0,
            step_left: 0.0,
            step_top: ITEM_SPREAD,
        },
        Category::Bottoms => CategoryAnchor {
            left: 50.0,
            top: 70.0,
            step_left: ITEM_SPREAD,
            step_top: 0.0,
        },
        // Lower right.
        Category::Shoes => CategoryAnchor {
            left: 72.0,
            top: 88.0,
            step_left: ITEM_SPREAD,
            step_top: 0.0,
        },
    }
}

/// Anchor point of a category's bubble group.
pub fn category_anchor(category: Category) -> LayoutPosition {
    let anchor = anchor_for(category);
    LayoutPosition::new(anchor.left, anchor.top)
}

/// Deterministic default position of the `index`-th item of a category with
/// `count` items.
///
/// Items are spaced by a fixed step and centered so the group centroid sits
/// on the category anchor. Groups too wide for the display area are
/// compressed so every position stays inside the edge margin. An `index`
/// beyond `count` widens the group.
pub fn default_position(category: Category, index: usize, count: usize) -> LayoutPosition {
    let anchor = anchor_for(category);
    let count = count.max(index.saturating_add(1));
    let offset = index as f64 - (count - 1) as f64 / 2.0;
    LayoutPosition::new(
        anchor.left + offset * fitted_step(anchor.left, anchor.step_left, count),
        anchor.top + offset * fitted_step(anchor.top, anchor.step_top, count),
    )
}

/// Largest step not above `step` that keeps `count` items centered on
/// `center` within `[EDGE_MARGIN, MAX_PERCENT - EDGE_MARGIN]`.
fn fitted_step(center: f64, step: f64, count: usize) -> f64 {
    if step == 0.0 || count < 2 {
        return step;
    }
    let half_span = (center - EDGE_MARGIN)
        .min(MAX_PERCENT - EDGE_MARGIN - center)
        .max(0.0);
    step.min(2.0 * half_span / (count - 1) as f64)
}

/// Drag protocol failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Another marker is already being dragged.
    DragInProgress(ItemId),
    NoActiveDrag,
    /// Display rect has zero width or height.
    ZeroAreaDisplay,
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DragInProgress(id) => write!(f, "marker {id} is already being dragged"),
            Self::NoActiveDrag => write!(f, "no marker is being dragged"),
            Self::ZeroAreaDisplay => write!(f, "avatar display area has no size"),
        }
    }
}

impl Error for LayoutError {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragState {
    item_id: ItemId,
    /// Pointer position minus marker position at pointer-down, in percent.
    grab_offset: LayoutPosition,
    start: LayoutPosition,
    current: LayoutPosition,
}

/// Manual bubble placements plus the live drag state.
pub struct LayoutStore {
    store: Arc<dyn DurableStore>,
    overrides: BTreeMap<ItemId, LayoutPosition>,
    drag: Option<DragState>,
}

impl LayoutStore {
    pub fn empty(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            overrides: BTreeMap::new(),
            drag: None,
        }
    }

    /// Restores manual overrides; malformed data yields no overrides.
    ///
    /// Entries are decoded one by one; an entry with a bad id or position is
    /// dropped without losing the others.
    pub fn load(store: Arc<dyn DurableStore>) -> StoreOutcome<Self> {
        let (overrides, warning) =
            match load_json::<BTreeMap<String, Value>>(store.as_ref(), keys::LAYOUT) {
                Ok(Some(entries)) => (sanitize_loaded(entries), None),
                Ok(None) => (BTreeMap::new(), None),
                Err(err) => {
                    warn!(
                        "event=layout_load module=layout status=error error_code={} error={err}",
                        err.code()
                    );
                    (BTreeMap::new(), Some(err))
                }
            };
        info!(
            "event=layout_load module=layout status=ok override_count={}",
            overrides.len()
        );
        StoreOutcome::with_warning(
            Self {
                store,
                overrides,
                drag: None,
            },
            warning,
        )
    }

    /// Position to render for one item.
    ///
    /// Precedence: live drag position, manual override, category default.
    pub fn position_for(
        &self,
        item_id: ItemId,
        category: Category,
        index_within_category: usize,
        count_in_category: usize,
    ) -> LayoutPosition {
        if let Some(drag) = self.drag.filter(|drag| drag.item_id == item_id) {
            return drag.current;
        }
        self.overrides
            .get(&item_id)
            .copied()
            .unwrap_or_else(|| default_position(category, index_within_category, count_in_category))
    }

    /// Positions for an ordered item list, deriving per-category index/count.
    pub fn layout_for<'a>(
        &self,
        items: impl IntoIterator<Item = &'a ClothingItem>,
    ) -> Vec<(ItemId, LayoutPosition)> {
        let items: Vec<&ClothingItem> = items.into_iter().collect();
        let mut totals: HashMap<Category, usize> = HashMap::new();
        for item in &items {
            *totals.entry(item.category()).or_default() += 1;
        }

        let mut seen: HashMap<Category, usize> = HashMap::new();
        items
            .into_iter()
            .map(|item| {
                let index = seen.entry(item.category()).or_default();
                let position = self.position_for(
                    item.id(),
                    item.category(),
                    *index,
                    totals.get(&item.category()).copied().unwrap_or(1),
                );
                *index += 1;
                (item.id(), position)
            })
            .collect()
    }

    /// Manual override for one item, if any.
    pub fn manual_position(&self, item_id: ItemId) -> Option<LayoutPosition> {
        self.overrides.get(&item_id).copied()
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Stores a manual override and persists all overrides immediately.
    pub fn set_position(
        &mut self,
        item_id: ItemId,
        position: LayoutPosition,
    ) -> StoreOutcome<LayoutPosition> {
        let position = position.clamped();
        self.overrides.insert(item_id, position);
        let warning = self.persist();
        debug!(
            "event=layout_set module=layout status=ok item_id={item_id} durable={}",
            warning.is_none()
        );
        StoreOutcome::with_warning(position, warning)
    }

    /// Drops the override of a deleted item.
    pub fn forget(&mut self, item_id: ItemId) -> StoreOutcome<bool> {
        if self.drag.is_some_and(|drag| drag.item_id == item_id) {
            self.drag = None;
        }
        if self.overrides.remove(&item_id).is_none() {
            return StoreOutcome::durable(false);
        }
        let warning = self.persist();
        StoreOutcome::with_warning(true, warning)
    }

    /// Drops every override and any live drag.
    pub fn clear(&mut self) -> StoreOutcome<usize> {
        self.drag = None;
        let removed = self.overrides.len();
        self.overrides.clear();
        let warning = self.store.remove(keys::LAYOUT).err();
        if let Some(err) = &warning {
            warn!(
                "event=layout_clear module=layout status=error error_code={} error={err}",
                err.code()
            );
        }
        StoreOutcome::with_warning(removed, warning)
    }

    /// Item currently being dragged.
    pub fn active_drag(&self) -> Option<ItemId> {
        self.drag.map(|drag| drag.item_id)
    }

    /// Starts dragging `item_id`, currently rendered at `displayed`.
    ///
    /// The offset between pointer and marker is kept for the whole drag so
    /// the marker does not jump under the pointer.
    pub fn begin_drag(
        &mut self,
        item_id: ItemId,
        displayed: LayoutPosition,
        pointer: PointerPosition,
        rect: DisplayRect,
    ) -> Result<(), LayoutError> {
        if let Some(drag) = self.drag {
            return Err(LayoutError::DragInProgress(drag.item_id));
        }
        let pointer = rect.to_percent(pointer).ok_or(LayoutError::ZeroAreaDisplay)?;
        let displayed = displayed.clamped();
        self.drag = Some(DragState {
            item_id,
            grab_offset: LayoutPosition::new(
                pointer.left - displayed.left,
                pointer.top - displayed.top,
            ),
            start: displayed,
            current: displayed,
        });
        debug!("event=layout_drag module=layout status=start item_id={item_id}");
        Ok(())
    }

    /// Moves the dragged marker; updates memory only.
    pub fn drag_to(
        &mut self,
        pointer: PointerPosition,
        rect: DisplayRect,
    ) -> Result<LayoutPosition, LayoutError> {
        let drag = self.drag.as_mut().ok_or(LayoutError::NoActiveDrag)?;
        let pointer = rect.to_percent(pointer).ok_or(LayoutError::ZeroAreaDisplay)?;
        drag.current = LayoutPosition::new(
            pointer.left - drag.grab_offset.left,
            pointer.top - drag.grab_offset.top,
        )
        .clamped();
        Ok(drag.current)
    }

    /// Ends the drag and commits the final position to durable storage.
    ///
    /// A drag that never moved the marker is committed without a write.
    pub fn end_drag(&mut self) -> Result<StoreOutcome<(ItemId, LayoutPosition)>, LayoutError> {
        let drag = self.drag.take().ok_or(LayoutError::NoActiveDrag)?;
        if drag.current == drag.start {
            debug!(
                "event=layout_drag module=layout status=noop item_id={}",
                drag.item_id
            );
            return Ok(StoreOutcome::durable((drag.item_id, drag.current)));
        }
        let outcome = self.set_position(drag.item_id, drag.current);
        info!(
            "event=layout_drag module=layout status=ok item_id={} durable={}",
            drag.item_id,
            outcome.is_durable()
        );
        Ok(outcome.map(|position| (drag.item_id, position)))
    }

    /// Abandons the drag, restoring the pre-drag position. Nothing is written.
    pub fn cancel_drag(&mut self) -> Option<ItemId> {
        self.drag.take().map(|drag| drag.item_id)
    }

    fn persist(&self) -> Option<StorageError> {
        match save_json(self.store.as_ref(), keys::LAYOUT, &self.overrides) {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    "event=layout_save module=layout status=error error_code={} override_count={} error={err}",
                    err.code(),
                    self.overrides.len()
                );
                Some(err)
            }
        }
    }
}

fn sanitize_loaded(entries: BTreeMap<String, Value>) -> BTreeMap<ItemId, LayoutPosition> {
    let loaded_count = entries.len();
    let kept: BTreeMap<ItemId, LayoutPosition> = entries
        .into_iter()
        .filter_map(|(id, position)| {
            let id = id.parse::<ItemId>().ok()?;
            let position = serde_json::from_value::<LayoutPosition>(position).ok()?;
            Some((id, position.clamped()))
        })
        .collect();
    if kept.len() != loaded_count {
        warn!(
            "event=layout_load module=layout status=degraded dropped_count={}",
            loaded_count - kept.len()
        );
    }
    kept
}
