//! Domain model for the wardrobe catalog, image payloads and bubble layout.
//!
//! # Responsibility
//! - Define canonical data structures shared by stores, engine and session.
//! - Keep clothing records fixed-shape with a closed category set.
//!
//! # Invariants
//! - Every catalog record is identified by a stable, time-ordered `ItemId`.
//! - Image payloads are opaque; no pixel data is inspected in core.

pub mod image;
pub mod item;
pub mod layout;
