//! Opaque image payloads.
//!
//! # Responsibility
//! - Carry image bytes plus MIME type between capture, storage and the
//!   compositing service.
//! - Convert between data URLs, raw base64 and bytes.
//!
//! # Invariants
//! - A decoded payload always has a non-empty MIME type.
//! - JSON form is always a `data:<mime>;base64,<payload>` URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// MIME type assumed when a payload does not declare one.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Errors raised while decoding image payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDataError {
    /// Input does not start with `data:` or lacks the payload separator.
    NotADataUrl,
    /// Data URL is not base64-encoded.
    NotBase64Encoded,
    /// Payload text is not valid base64.
    InvalidBase64(String),
}

impl Display for ImageDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotADataUrl => write!(f, "image payload is not a data URL"),
            Self::NotBase64Encoded => write!(f, "image data URL must be base64-encoded"),
            Self::InvalidBase64(details) => write!(f, "invalid base64 image payload: {details}"),
        }
    }
}

impl Error for ImageDataError {}

/// In-memory image payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageData {
    mime_type: String,
    bytes: Vec<u8>,
}

impl ImageData {
    /// Wraps raw bytes with an explicit MIME type.
    ///
    /// Blank MIME types fall back to `image/png`.
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let mime_type = mime_type.into();
        let mime_type = if mime_type.trim().is_empty() {
            DEFAULT_IMAGE_MIME.to_string()
        } else {
            mime_type.trim().to_string()
        };
        Self {
            mime_type,
            bytes: bytes.into(),
        }
    }

    /// Wraps PNG bytes.
    pub fn png(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(DEFAULT_IMAGE_MIME, bytes)
    }

    /// Decodes a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(value: &str) -> Result<Self, ImageDataError> {
        let rest = value
            .trim()
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or(ImageDataError::NotADataUrl)?;
        let (meta, payload) = rest.split_once(',').ok_or(ImageDataError::NotADataUrl)?;
        let mime_type = meta
            .strip_suffix(BASE64_MARKER)
            .ok_or(ImageDataError::NotBase64Encoded)?;
        Self::from_base64(mime_type, payload)
    }

    /// Decodes a bare base64 payload, as exchanged with the compositing service.
    pub fn from_base64(mime_type: &str, payload: &str) -> Result<Self, ImageDataError> {
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|err| ImageDataError::InvalidBase64(err.to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encodes the payload as bare base64 (no data URL prefix).
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Encodes the payload as a data URL suitable for display or persistence.
    pub fn to_data_url(&self) -> String {
        format!(
            "{DATA_URL_PREFIX}{}{BASE64_MARKER},{}",
            self.mime_type,
            self.to_base64()
        )
    }
}

// Payloads can be megabytes; keep debug output to metadata.
impl Debug for ImageData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl TryFrom<String> for ImageData {
    type Error = ImageDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(&value)
    }
}

impl From<ImageData> for String {
    fn from(value: ImageData) -> Self {
        value.to_data_url()
    }
}
