//! Per-item annotation documents.

use serde::{Deserialize, Serialize};

use crate::model::instance::{DocumentInstance, PixelInstance, VectorInstance, VideoInstance};
use crate::model::media::MediaType;

/// Statuses an item can be in.
pub const ITEM_STATUSES: &[&str] = &[
    "NotStarted",
    "InProgress",
    "QualityCheck",
    "Returned",
    "Completed",
    "Skipped",
];

/// Annotation progress of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    NotStarted,
    InProgress,
    QualityCheck,
    Returned,
    Completed,
    Skipped,
}

/// Metadata of an image item (vector and pixel projects).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Item name, usually the image file name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ImageMetadata {
    /// Create metadata for a named image.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the image dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Metadata of a video item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Duration in microseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Metadata of a text document item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextMetadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One message in a comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A comment thread pinned to an item, optionally at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    #[serde(default)]
    pub resolved: bool,

    pub correspondence: Vec<CommentEntry>,
}

/// The canonical annotation document of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "M: Deserialize<'de>, I: Deserialize<'de>"))]
pub struct AnnotationDocument<M, I> {
    pub metadata: M,

    #[serde(default)]
    pub instances: Vec<I>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

impl<M, I> AnnotationDocument<M, I> {
    /// Create a document with no instances.
    pub fn new(metadata: M) -> Self {
        Self {
            metadata,
            instances: Vec::new(),
            tags: Vec::new(),
            comments: Vec::new(),
        }
    }
}

/// Document of a vector image.
pub type VectorDocument = AnnotationDocument<ImageMetadata, VectorInstance>;

/// Document of a pixel image.
pub type PixelDocument = AnnotationDocument<ImageMetadata, PixelInstance>;

/// Document of a video.
pub type VideoDocument = AnnotationDocument<VideoMetadata, VideoInstance>;

/// Document of a text item.
pub type TextDocument = AnnotationDocument<TextMetadata, DocumentInstance>;

/// A typed document of any media type, as produced by the validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedDocument {
    Vector(VectorDocument),
    Pixel(PixelDocument),
    Video(VideoDocument),
    Document(TextDocument),
}

impl NormalizedDocument {
    /// Deserialize a JSON value as the document type of `media_type`.
    pub fn from_value(
        value: serde_json::Value,
        media_type: MediaType,
    ) -> Result<Self, serde_json::Error> {
        Ok(match media_type {
            MediaType::Vector => NormalizedDocument::Vector(serde_json::from_value(value)?),
            MediaType::Pixel => NormalizedDocument::Pixel(serde_json::from_value(value)?),
            MediaType::Video => NormalizedDocument::Video(serde_json::from_value(value)?),
            MediaType::Document => NormalizedDocument::Document(serde_json::from_value(value)?),
        })
    }

    /// The media type of this document.
    pub fn media_type(&self) -> MediaType {
        match self {
            NormalizedDocument::Vector(_) => MediaType::Vector,
            NormalizedDocument::Pixel(_) => MediaType::Pixel,
            NormalizedDocument::Video(_) => MediaType::Video,
            NormalizedDocument::Document(_) => MediaType::Document,
        }
    }

    /// Number of instances in the document.
    pub fn instance_count(&self) -> usize {
        match self {
            NormalizedDocument::Vector(d) => d.instances.len(),
            NormalizedDocument::Pixel(d) => d.instances.len(),
            NormalizedDocument::Video(d) => d.instances.len(),
            NormalizedDocument::Document(d) => d.instances.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_names_match_serialization() {
        for name in ITEM_STATUSES {
            let status: ItemStatus = serde_json::from_value(json!(name)).unwrap();
            assert_eq!(serde_json::to_value(status).unwrap(), json!(name));
        }
    }

    #[test]
    fn test_empty_optional_sections_are_omitted() {
        let doc = VectorDocument::new(ImageMetadata::new("a.jpg").with_dimensions(4, 3));
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({"metadata": {"name": "a.jpg", "width": 4, "height": 3}, "instances": []})
        );
    }

    #[test]
    fn test_from_value_fills_defaults() {
        let doc = NormalizedDocument::from_value(
            json!({"metadata": {"name": "doc.txt"}}),
            MediaType::Document,
        )
        .unwrap();
        assert_eq!(doc.media_type(), MediaType::Document);
        assert_eq!(doc.instance_count(), 0);
    }

    #[test]
    fn test_documents_parse_without_instances() {
        let vector: VectorDocument = serde_json::from_str(r#"{"metadata": {"name": "a.jpg"}}"#).unwrap();
        assert!(vector.instances.is_empty());

        let pixel: PixelDocument = serde_json::from_str(r#"{"metadata": {"name": "a.png"}}"#).unwrap();
        assert!(pixel.instances.is_empty());

        let video: VideoDocument = serde_json::from_str(r#"{"metadata": {"name": "v.mp4"}}"#).unwrap();
        assert!(video.instances.is_empty());
    }
}
