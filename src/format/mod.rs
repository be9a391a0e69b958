//! Format strategies for third-party annotation exports.
//!
//! Each supported export format is a [`FormatStrategy`]: it locates the
//! source documents of an export, decodes them into raw records, and turns
//! the records into canonical documents while a shared
//! [`ClassCatalog`](crate::taxonomy::ClassCatalog) collects the classes and
//! attribute groups it discovers.
//!
//! ## Supported Formats
//!
//! - **voc**: Pascal VOC XML, one file per image
//! - **vgg**: VGG Image Annotator project JSON
//! - **dataloop**: DataLoop per-item JSON, including binary masks
//! - **vott**: VoTT project or per-asset JSON
//! - **googlecloud**: GoogleCloud AutoML CSV with normalized boxes
//! - **labelbox**: Labelbox JSON export
//! - **supervisely**: Supervisely project folders, including bitmaps
//! - **yolo**: YOLO TXT detections and segmentations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use annorm::format::{FormatRegistry, ParseOptions};
//!
//! let registry = FormatRegistry::new();
//! let voc = registry.resolve("voc")?;
//! let handles = voc.locate_source_documents(&source, None)?;
//! let batch = voc.parse_records(&source, &handles[0], &ParseOptions::default())?;
//! ```

mod error;
pub mod formats;
mod registry;
mod traits;

pub use error::ConvertError;
pub use registry::FormatRegistry;
pub use traits::{
    CanonicalOutputs, ConversionTask, FormatStrategy, ItemInfo, ParseOptions, RawGeometry,
    RawInstanceRecord, RecordBatch, SkippedRecord, locate_by_extension,
};
