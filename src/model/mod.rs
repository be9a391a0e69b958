//! Canonical annotation model.
//!
//! All source formats converge to these types: classes with their attribute
//! taxonomy, one instance sum type per media type, and per-item documents.

mod class;
mod document;
mod error;
mod instance;
mod media;

pub use class::{AnnotationClass, Attribute, AttributeGroup, Selection};
pub use document::{
    AnnotationDocument, Comment, CommentEntry, ITEM_STATUSES, ImageMetadata, ItemStatus,
    NormalizedDocument, PixelDocument, TextDocument, TextMetadata, VectorDocument, VideoDocument,
    VideoMetadata,
};
pub use error::{ModelError, UnknownMediaType};
pub use instance::{
    BboxPoints, BboxState, CuboidPoints, DocumentInstance, EntityKind, EventState, Instance,
    InstanceAttribute, PixelInstance, PixelPart, RbboxPoints, TemplateConnection, TemplatePoint,
    Timestamp, VectorGeometry, VectorInstance, Vertex, VideoInstance, VideoTrack,
};
pub use media::{DOCUMENT_DISCRIMINANTS, MediaType, VECTOR_DISCRIMINANTS, VIDEO_DISCRIMINANTS};
