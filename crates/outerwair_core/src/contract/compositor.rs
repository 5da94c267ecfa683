//! Compositing service contract.

use crate::model::image::ImageData;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// External compositing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositingError {
    /// Transport-level failure reaching the service.
    Network(String),
    /// Service answered without an image part.
    NoImageInResponse,
    /// Service reported an error.
    Service { code: String, message: String },
}

impl CompositingError {
    pub fn code(&self) -> &str {
        match self {
            Self::Network(_) => "compositing_network",
            Self::NoImageInResponse => "compositing_no_image",
            Self::Service { code, .. } => code.as_str(),
        }
    }
}

impl Display for CompositingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(details) => write!(f, "compositing service unreachable: {details}"),
            Self::NoImageInResponse => write!(f, "compositing service returned no image"),
            Self::Service { code, message } => {
                write!(f, "compositing service error `{code}`: {message}")
            }
        }
    }
}

impl Error for CompositingError {}

/// Renders the person in `base` wearing every garment, in order.
///
/// Implementations must treat `base` as the unmodified avatar; core never
/// passes a previous composite here.
pub trait Compositor: Send + Sync {
    fn compose(
        &self,
        base: &ImageData,
        garments: &[ImageData],
    ) -> Result<ImageData, CompositingError>;
}
