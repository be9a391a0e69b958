//! Error types for format conversion.

use thiserror::Error;

use crate::mask::MaskError;
use crate::model::ModelError;

/// Errors that can occur while locating, parsing or converting source documents.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// No source document matches the request
    #[error("No source documents found in '{root}'{}", .dataset.as_ref().map(|d| format!(" for dataset '{d}'")).unwrap_or_default())]
    SourceNotFound {
        /// Export root that was searched
        root: String,
        /// Dataset that was requested, if any
        dataset: Option<String>,
    },

    /// Format name is not registered
    #[error("Unsupported format '{name}' (available: {})", .available.join(", "))]
    UnsupportedFormat {
        /// The requested format name
        name: String,
        /// Registered format ids
        available: Vec<&'static str>,
    },

    /// Caller supplied an illegal logical path
    #[error("Invalid path '{path}': {reason}")]
    Path {
        /// The offending path
        path: String,
        /// Why it is not allowed
        reason: String,
    },

    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML deserialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Image header or payload error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Mask payload could not be decoded
    #[error("Mask error: {0}")]
    Mask(#[from] MaskError),

    /// Canonical instance could not be built
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },
}

impl ConvertError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a source not found error.
    pub fn source_not_found(root: impl Into<String>, dataset: Option<&str>) -> Self {
        Self::SourceNotFound {
            root: root.into(),
            dataset: dataset.map(str::to_string),
        }
    }

    /// Create a path error.
    pub fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error aborts a whole conversion rather than one document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConvertError::SourceNotFound { .. }
                | ConvertError::UnsupportedFormat { .. }
                | ConvertError::Path { .. }
        )
    }
}
