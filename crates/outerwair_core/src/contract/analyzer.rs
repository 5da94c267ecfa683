//! Clothing analysis service contract.
//!
//! # Responsibility
//! - Define the title/category suggestion contract for new uploads.
//! - Parse the service's JSON reply leniently: code fences, surrounding
//!   prose and missing fields are tolerated.
//!
//! # Invariants
//! - A parsed reply always yields a non-empty title and a known category.

use crate::model::image::ImageData;
use crate::model::item::Category;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Title used when the service omits one.
pub const FALLBACK_TITLE: &str = "Clothing Item";

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*").expect("valid code fence regex"));
static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid json object regex"));

/// External analysis failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    Network(String),
    Service(String),
    MalformedResponse(String),
}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(details) => write!(f, "analysis service unreachable: {details}"),
            Self::Service(details) => write!(f, "analysis service error: {details}"),
            Self::MalformedResponse(details) => {
                write!(f, "analysis service reply is malformed: {details}")
            }
        }
    }
}

impl Error for AnalysisError {}

/// Suggested metadata for an uploaded clothing image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAnalysis {
    pub title: String,
    pub category: Category,
}

impl ItemAnalysis {
    /// Blank title plus default category, used when analysis fails.
    pub fn fallback() -> Self {
        Self {
            title: String::new(),
            category: Category::default(),
        }
    }
}

/// Suggests a title and category for one clothing image.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, image: &ImageData) -> Result<ItemAnalysis, AnalysisError>;
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    title: Option<String>,
    category: Option<String>,
}

/// Parses a `{"title": ..., "category": ...}` reply from the analysis model.
///
/// Markdown code fences and prose around the object are ignored. A missing
/// or blank title becomes `"Clothing Item"`; a missing or unknown category
/// becomes the default category.
pub fn parse_analysis_reply(text: &str) -> Result<ItemAnalysis, AnalysisError> {
    let unfenced = CODE_FENCE_RE.replace_all(text, "");
    let object = JSON_OBJECT_RE
        .find(unfenced.as_ref())
        .map(|found| found.as_str())
        .ok_or_else(|| AnalysisError::MalformedResponse("no JSON object in reply".to_string()))?;

    let raw: RawAnalysis = serde_json::from_str(object)
        .map_err(|err| AnalysisError::MalformedResponse(err.to_string()))?;

    let title = raw
        .title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());
    let category = raw
        .category
        .as_deref()
        .and_then(Category::parse)
        .unwrap_or_default();

    Ok(ItemAnalysis { title, category })
}
