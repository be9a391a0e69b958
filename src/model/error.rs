//! Error types for the canonical model.

use thiserror::Error;

use crate::model::MediaType;

/// Errors raised while constructing canonical instances.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Instance type is not a variant of the media type
    #[error(
        "Unknown instance type '{discriminant}' for {media_type} media (expected one of: {})",
        .valid.join(", ")
    )]
    UnknownDiscriminant {
        /// The type name that was requested
        discriminant: String,
        /// Media type the instance was built for
        media_type: MediaType,
        /// Type names the media type accepts
        valid: Vec<&'static str>,
    },

    /// Coordinates do not fit the instance type
    #[error("Geometry mismatch for '{discriminant}': {message}")]
    GeometryMismatch {
        /// The instance type
        discriminant: String,
        /// Description of the mismatch
        message: String,
    },
}

impl ModelError {
    /// Create an unknown discriminant error listing the valid set.
    pub fn unknown_discriminant(discriminant: impl Into<String>, media_type: MediaType) -> Self {
        Self::UnknownDiscriminant {
            discriminant: discriminant.into(),
            media_type,
            valid: media_type.discriminants().to_vec(),
        }
    }

    /// Create a geometry mismatch error.
    pub fn geometry_mismatch(discriminant: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GeometryMismatch {
            discriminant: discriminant.into(),
            message: message.into(),
        }
    }
}

/// A media type string that names none of the supported project types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown media type '{0}' (expected vector, pixel, video or document)")]
pub struct UnknownMediaType(pub String);
