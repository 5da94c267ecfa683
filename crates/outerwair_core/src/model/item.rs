//! Clothing catalog record model.
//!
//! # Responsibility
//! - Define the fixed-shape clothing record owned by the Catalog Store.
//! - Restrict categories to a closed enumeration.
//!
//! # Invariants
//! - `id` is time-ordered and never reused for another item.
//! - `name` is trimmed and non-empty; `image` is non-empty.
//! - Records are immutable after creation.

use crate::model::image::ImageData;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of one catalog item.
///
/// Backed by a UUIDv7, so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Allocates a fresh time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Closed set of wardrobe categories.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    /// Default for new uploads and analysis fallbacks.
    #[default]
    Tops,
    Bottoms,
    Outerwear,
    Shoes,
    Accessories,
}

impl Category {
    /// All categories in wardrobe display order.
    pub const ALL: [Category; 5] = [
        Category::Tops,
        Category::Bottoms,
        Category::Outerwear,
        Category::Shoes,
        Category::Accessories,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Tops => "Tops",
            Self::Bottoms => "Bottoms",
            Self::Outerwear => "Outerwear",
            Self::Shoes => "Shoes",
            Self::Accessories => "Accessories",
        }
    }

    /// Case-insensitive label lookup.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(normalized))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownCategory(s.trim().to_string()))
    }
}

/// Wardrobe list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == category,
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(value: Category) -> Self {
        Self::Only(value)
    }
}

/// Catalog input validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    MissingImage,
    UnknownCategory(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "item name must not be empty"),
            Self::MissingImage => write!(f, "item image is missing"),
            Self::UnknownCategory(value) => write!(f, "unknown clothing category: `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Canonical clothing catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClothingItem {
    id: ItemId,
    name: String,
    category: Category,
    image: ImageData,
}

impl ClothingItem {
    /// Creates a validated record with a fresh id.
    ///
    /// # Errors
    /// - `MissingImage` when `image` is absent or has no bytes.
    /// - `EmptyName` when `name` is blank after trimming.
    pub fn create(
        image: Option<ImageData>,
        name: &str,
        category: Category,
    ) -> Result<Self, ValidationError> {
        Self::with_id(ItemId::generate(), image, name, category)
    }

    /// Creates a validated record with a caller-provided id.
    pub fn with_id(
        id: ItemId,
        image: Option<ImageData>,
        name: &str,
        category: Category,
    ) -> Result<Self, ValidationError> {
        let image = image
            .filter(|image| !image.is_empty())
            .ok_or(ValidationError::MissingImage)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self {
            id,
            name: name.to_string(),
            category,
            image,
        })
    }

    /// Re-checks invariants on records read back from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image.is_empty() {
            return Err(ValidationError::MissingImage);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }
}
