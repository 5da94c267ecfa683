//! Bubble placement geometry.
//!
//! # Invariants
//! - Positions are percentages of the avatar display area, clamped to `[0, 100]`
//!   when they come from user input.

use serde::{Deserialize, Serialize};

pub const MIN_PERCENT: f64 = 0.0;
pub const MAX_PERCENT: f64 = 100.0;

/// Placement of one bubble, in percent of the avatar display area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPosition {
    pub left: f64,
    pub top: f64,
}

impl LayoutPosition {
    pub const fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }

    /// Returns a copy with both coordinates clamped to `[0, 100]`.
    ///
    /// Non-finite coordinates collapse to `0`.
    pub fn clamped(self) -> Self {
        Self {
            left: clamp_percent(self.left),
            top: clamp_percent(self.top),
        }
    }
}

/// Absolute pointer coordinates reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box of the avatar display area, in the pointer's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn has_area(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Converts an absolute pointer into clamped percentage coordinates.
    ///
    /// Returns `None` for zero-area rects.
    pub fn to_percent(&self, pointer: PointerPosition) -> Option<LayoutPosition> {
        if !self.has_area() {
            return None;
        }
        let left = (pointer.x - self.left) / self.width * MAX_PERCENT;
        let top = (pointer.y - self.top) / self.height * MAX_PERCENT;
        Some(LayoutPosition::new(left, top).clamped())
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_PERCENT, MAX_PERCENT)
    } else {
        MIN_PERCENT
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayRect, LayoutPosition, PointerPosition};

    #[test]
    fn pointer_maps_to_percent_of_display_rect() {
        let rect = DisplayRect::new(100.0, 50.0, 200.0, 400.0);
        let position = rect
            .to_percent(PointerPosition::new(150.0, 150.0))
            .expect("rect has area");
        assert_eq!(position, LayoutPosition::new(25.0, 25.0));
    }

    #[test]
    fn pointer_outside_rect_is_clamped() {
        let rect = DisplayRect::new(0.0, 0.0, 100.0, 100.0);
        let position = rect
            .to_percent(PointerPosition::new(-20.0, 180.0))
            .expect("rect has area");
        assert_eq!(position, LayoutPosition::new(0.0, 100.0));
    }

    #[test]
    fn zero_area_rect_has_no_mapping() {
        let rect = DisplayRect::new(0.0, 0.0, 0.0, 100.0);
        assert!(rect.to_percent(PointerPosition::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn clamped_collapses_non_finite_values() {
        let position = LayoutPosition::new(f64::NAN, 140.0).clamped();
        assert_eq!(position, LayoutPosition::new(0.0, 100.0));
    }
}
