//! Trait definitions for format strategies and the records they produce.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::error::ConvertError;
use crate::geometry::{self, BoxCoords};
use crate::model::{ImageMetadata, VectorDocument, VectorGeometry, VectorInstance};
use crate::source::{DocumentHandle, DocumentSource};
use crate::taxonomy::ClassCatalog;

/// A converter for one third-party export format.
///
/// Strategies are stateless apart from fixed settings. A conversion locates
/// the source documents, parses each into a [`RecordBatch`], and turns the
/// batches into canonical documents while filling a shared [`ClassCatalog`].
pub trait FormatStrategy: Send + Sync {
    /// Unique identifier used to select the format (e.g., "voc", "vgg").
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// Extensions of the source documents this format reads.
    fn extensions(&self) -> &[&'static str];

    /// Resolve the documents to convert.
    ///
    /// With a dataset name only the matching document is returned; otherwise
    /// every matching document under the export root.
    fn locate_source_documents(
        &self,
        source: &dyn DocumentSource,
        dataset: Option<&str>,
    ) -> Result<Vec<DocumentHandle>, ConvertError> {
        locate_by_extension(source, self.extensions(), dataset, |_| true)
    }

    /// Decode one source document into raw records.
    fn parse_records(
        &self,
        source: &dyn DocumentSource,
        handle: &DocumentHandle,
        options: &ParseOptions,
    ) -> Result<RecordBatch, ConvertError>;

    /// Turn raw records into canonical per-item documents.
    ///
    /// Classes are created or reused by name and attribute groups are
    /// discovered from each record. Records whose geometry does not fit the
    /// task or the canonical model are skipped with a reason.
    fn build_canonical_outputs(
        &self,
        batch: RecordBatch,
        catalog: &mut ClassCatalog,
        options: &ParseOptions,
    ) -> CanonicalOutputs {
        let mut outputs = CanonicalOutputs::default();
        for item in batch.items {
            outputs.ensure_item(item);
        }
        outputs.skipped.extend(batch.skipped);

        for record in batch.records {
            outputs.ensure_item(ItemInfo::named(&record.item));

            if record.class_name.trim().is_empty() {
                outputs.skip(&record.item, "record has no class name");
                continue;
            }

            let geometry = match options.task.apply(record.geometry) {
                Ok(geometry) => geometry,
                Err(reason) => {
                    outputs.skip(&record.item, reason);
                    continue;
                }
            };
            let (discriminant, coords) = geometry.into_parts();
            let geometry = match VectorGeometry::from_coords(discriminant, &coords) {
                Ok(geometry) => geometry,
                Err(e) => {
                    outputs.skip(&record.item, e.to_string());
                    continue;
                }
            };

            let class_id = catalog.ensure_class(&record.class_name, record.class_color.as_deref());
            let attributes = catalog.observe(&record.class_name, &record.attributes);
            let mut instance = VectorInstance::new(geometry)
                .with_class(class_id, record.class_name.as_str())
                .with_attributes(attributes);
            instance.probability = record.probability;

            outputs.push_instance(&record.item, instance);
        }
        outputs
    }
}

/// Locate documents by extension, optionally restricted to one named document.
///
/// A dataset name matches a document whose file name or stem equals it.
pub fn locate_by_extension<F>(
    source: &dyn DocumentSource,
    extensions: &[&str],
    dataset: Option<&str>,
    filter: F,
) -> Result<Vec<DocumentHandle>, ConvertError>
where
    F: Fn(&DocumentHandle) -> bool,
{
    let handles: Vec<DocumentHandle> = source
        .list()?
        .into_iter()
        .filter(|h| h.has_extension(extensions) && filter(h))
        .filter(|h| dataset.is_none_or(|name| h.file_name() == name || h.stem() == name))
        .collect();

    if handles.is_empty() {
        return Err(ConvertError::source_not_found(source.describe(), dataset));
    }
    Ok(handles)
}

/// What the converted annotations are meant for.
///
/// The task decides which geometries are kept and how they are adapted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionTask {
    /// Keep every geometry.
    #[default]
    VectorAnnotation,
    /// Boxes only; polygons and polylines become their bounding box.
    ObjectDetection,
    /// Polygons only; boxes become four-vertex polygons.
    InstanceSegmentation,
    /// Points only.
    KeypointDetection,
}

impl ConversionTask {
    /// Snake-case name of the task.
    pub fn name(&self) -> &'static str {
        match self {
            ConversionTask::VectorAnnotation => "vector_annotation",
            ConversionTask::ObjectDetection => "object_detection",
            ConversionTask::InstanceSegmentation => "instance_segmentation",
            ConversionTask::KeypointDetection => "keypoint_detection",
        }
    }

    /// Adapt a geometry to the task, or explain why it does not apply.
    pub fn apply(&self, geometry: RawGeometry) -> Result<RawGeometry, String> {
        let kind = geometry.kind();
        match (self, geometry) {
            (ConversionTask::VectorAnnotation, g) => Ok(g),
            (ConversionTask::ObjectDetection, g @ RawGeometry::Bbox(_)) => Ok(g),
            (
                ConversionTask::ObjectDetection,
                RawGeometry::Polygon(points) | RawGeometry::Polyline(points),
            ) => geometry::bounding_box(&points)
                .map(RawGeometry::Bbox)
                .ok_or_else(|| format!("{} without points", kind)),
            (ConversionTask::InstanceSegmentation, g @ RawGeometry::Polygon(_)) => Ok(g),
            (ConversionTask::InstanceSegmentation, RawGeometry::Bbox(b)) => {
                Ok(RawGeometry::Polygon(geometry::bbox_to_polygon(b)))
            }
            (ConversionTask::KeypointDetection, g @ RawGeometry::Point { .. }) => Ok(g),
            (task, _) => Err(format!("{} is not applicable to {}", kind, task.name())),
        }
    }
}

impl fmt::Display for ConversionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConversionTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "vector_annotation" => Ok(ConversionTask::VectorAnnotation),
            "object_detection" => Ok(ConversionTask::ObjectDetection),
            "instance_segmentation" => Ok(ConversionTask::InstanceSegmentation),
            "keypoint_detection" => Ok(ConversionTask::KeypointDetection),
            other => Err(format!("unknown task '{}'", other)),
        }
    }
}

/// Settings passed to every strategy call of one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Target task.
    pub task: ConversionTask,

    /// Same-class boxes on one item overlapping at least this much are duplicates.
    pub duplicate_iou: Option<f64>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            task: ConversionTask::default(),
            duplicate_iou: Some(0.95),
        }
    }
}

/// Geometry as read from a source record, before canonical validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    Point { x: f64, y: f64 },
    Polyline(Vec<f64>),
    Polygon(Vec<f64>),
    /// `(xmin, ymin, xmax, ymax)`, already normalized.
    Bbox(BoxCoords),
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        angle: f64,
    },
    Tag,
    /// Any other canonical vector type given as flat coordinates.
    Coordinates {
        discriminant: &'static str,
        coords: Vec<f64>,
    },
}

impl RawGeometry {
    /// Box from two corners in any order.
    pub fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        RawGeometry::Bbox(geometry::normalize_bbox(x1, y1, x2, y2))
    }

    /// Canonical type name this geometry maps to.
    pub fn kind(&self) -> &'static str {
        match self {
            RawGeometry::Point { .. } => "point",
            RawGeometry::Polyline(_) => "polyline",
            RawGeometry::Polygon(_) => "polygon",
            RawGeometry::Bbox(_) => "bbox",
            RawGeometry::Ellipse { .. } => "ellipse",
            RawGeometry::Tag => "tag",
            RawGeometry::Coordinates { discriminant, .. } => *discriminant,
        }
    }

    /// Split into a canonical type name and flat coordinates.
    pub fn into_parts(self) -> (&'static str, Vec<f64>) {
        let kind = self.kind();
        let coords = match self {
            RawGeometry::Point { x, y } => vec![x, y],
            RawGeometry::Polyline(points) | RawGeometry::Polygon(points) => points,
            RawGeometry::Bbox(b) => b.to_vec(),
            RawGeometry::Ellipse {
                cx,
                cy,
                rx,
                ry,
                angle,
            } => vec![cx, cy, rx, ry, angle],
            RawGeometry::Tag => Vec::new(),
            RawGeometry::Coordinates { coords, .. } => coords,
        };
        (kind, coords)
    }
}

/// An item (image) named by a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    pub name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ItemInfo {
    /// Item without known dimensions.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: None,
            height: None,
        }
    }

    /// Item with dimensions; zero dimensions count as unknown.
    pub fn with_dimensions(name: impl Into<String>, width: u32, height: u32) -> Self {
        let known = width > 0 && height > 0;
        Self {
            name: name.into(),
            width: known.then_some(width),
            height: known.then_some(height),
        }
    }

    fn metadata(&self) -> ImageMetadata {
        let mut metadata = ImageMetadata::new(self.name.as_str());
        metadata.width = self.width;
        metadata.height = self.height;
        metadata
    }
}

/// One source annotation, decoded but not yet canonical.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstanceRecord {
    /// Name of the item the record belongs to.
    pub item: String,

    /// Class name as written in the source.
    pub class_name: String,

    /// Explicit class color, if the source carries one.
    pub class_color: Option<String>,

    pub geometry: RawGeometry,

    /// Attribute group candidates, `(group name, value)`.
    pub attributes: Vec<(String, Value)>,

    /// Confidence, for prediction exports.
    pub probability: Option<f64>,
}

impl RawInstanceRecord {
    /// Create a record without attributes.
    pub fn new(item: impl Into<String>, class_name: impl Into<String>, geometry: RawGeometry) -> Self {
        Self {
            item: item.into(),
            class_name: class_name.into(),
            class_color: None,
            geometry,
            attributes: Vec::new(),
            probability: None,
        }
    }

    /// Set an explicit class color.
    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.class_color = color;
        self
    }

    /// Set the attribute candidates.
    pub fn with_attributes(mut self, attributes: Vec<(String, Value)>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A record or document left out of the conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Item the record belonged to, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,

    /// Why it was skipped.
    pub reason: String,
}

impl SkippedRecord {
    /// Create a skip entry.
    pub fn new(item: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            item: item.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// Everything decoded from one source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    /// Items named by the document, including those without annotations.
    pub items: Vec<ItemInfo>,
    pub records: Vec<RawInstanceRecord>,
    pub skipped: Vec<SkippedRecord>,
}

impl RecordBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item, keeping the first known dimensions for a repeated name.
    pub fn add_item(&mut self, item: ItemInfo) {
        match self.items.iter_mut().find(|i| i.name == item.name) {
            Some(existing) => {
                existing.width = existing.width.or(item.width);
                existing.height = existing.height.or(item.height);
            }
            None => self.items.push(item),
        }
    }

    /// Add a record.
    pub fn push(&mut self, record: RawInstanceRecord) {
        self.records.push(record);
    }

    /// Skip a record of `item`, logging the reason.
    pub fn skip(&mut self, item: Option<&str>, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Skipping record of {}: {}", item.unwrap_or("<unknown item>"), reason);
        self.skipped.push(SkippedRecord::new(item, reason));
    }
}

/// Canonical documents built from one or more batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalOutputs {
    /// Documents keyed by item name, in order of first appearance.
    pub documents: IndexMap<String, VectorDocument>,
    pub skipped: Vec<SkippedRecord>,
}

impl CanonicalOutputs {
    /// Ensure a document exists for the item, filling unknown dimensions.
    pub fn ensure_item(&mut self, item: ItemInfo) -> &mut VectorDocument {
        let doc = self
            .documents
            .entry(item.name.clone())
            .or_insert_with(|| VectorDocument::new(item.metadata()));
        doc.metadata.width = doc.metadata.width.or(item.width);
        doc.metadata.height = doc.metadata.height.or(item.height);
        doc
    }

    /// Append an instance to an item's document.
    pub fn push_instance(&mut self, item: &str, instance: VectorInstance) {
        self.ensure_item(ItemInfo::named(item)).instances.push(instance);
    }

    /// Skip a record, logging the reason.
    pub fn skip(&mut self, item: &str, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Skipping record of {}: {}", item, reason);
        self.skipped.push(SkippedRecord::new(Some(item), reason));
    }

    /// Fold another set of outputs into this one; instances of a repeated item are appended.
    pub fn extend(&mut self, other: CanonicalOutputs) {
        for (name, doc) in other.documents {
            let target = self.ensure_item(ItemInfo {
                name,
                width: doc.metadata.width,
                height: doc.metadata.height,
            });
            target.instances.extend(doc.instances);
        }
        self.skipped.extend(other.skipped);
    }

    /// Total number of instances.
    pub fn instance_count(&self) -> usize {
        self.documents.values().map(|d| d.instances.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_utils::Palette;
    use crate::source::MemorySource;
    use serde_json::json;

    struct NullFormat;

    impl FormatStrategy for NullFormat {
        fn id(&self) -> &'static str {
            "null"
        }

        fn display_name(&self) -> &'static str {
            "Null"
        }

        fn extensions(&self) -> &[&'static str] {
            &["txt"]
        }

        fn parse_records(
            &self,
            _source: &dyn DocumentSource,
            _handle: &DocumentHandle,
            _options: &ParseOptions,
        ) -> Result<RecordBatch, ConvertError> {
            Ok(RecordBatch::new())
        }
    }

    #[test]
    fn test_locate_by_extension_and_dataset() {
        let source = MemorySource::new("mem")
            .with_file("a.txt", "")
            .with_file("b.txt", "")
            .with_file("c.json", "");
        let format = NullFormat;

        assert_eq!(format.locate_source_documents(&source, None).unwrap().len(), 2);
        let one = format.locate_source_documents(&source, Some("b")).unwrap();
        assert_eq!(one, vec![DocumentHandle::new("b.txt")]);

        let err = format.locate_source_documents(&source, Some("zzz")).unwrap_err();
        assert!(matches!(err, ConvertError::SourceNotFound { .. }));
    }

    #[test]
    fn test_locate_with_no_documents() {
        let source = MemorySource::new("mem").with_file("c.json", "");
        let err = NullFormat.locate_source_documents(&source, None).unwrap_err();
        assert!(matches!(err, ConvertError::SourceNotFound { dataset: None, .. }));
    }

    #[test]
    fn test_task_filters() {
        let polygon = RawGeometry::Polygon(vec![0.0, 0.0, 4.0, 0.0, 4.0, 3.0]);
        assert_eq!(
            ConversionTask::ObjectDetection.apply(polygon.clone()),
            Ok(RawGeometry::Bbox([0.0, 0.0, 4.0, 3.0]))
        );
        assert_eq!(
            ConversionTask::InstanceSegmentation.apply(RawGeometry::bbox(0.0, 0.0, 2.0, 2.0)),
            Ok(RawGeometry::Polygon(vec![0.0, 0.0, 2.0, 0.0, 2.0, 2.0, 0.0, 2.0]))
        );
        assert!(ConversionTask::KeypointDetection.apply(polygon).is_err());
        assert_eq!("object-detection".parse(), Ok(ConversionTask::ObjectDetection));
    }

    #[test]
    fn test_build_reuses_classes_and_skips_bad_geometry() {
        let mut batch = RecordBatch::new();
        batch.add_item(ItemInfo::with_dimensions("img.jpg", 10, 10));
        batch.add_item(ItemInfo::named("empty.jpg"));
        batch.push(
            RawInstanceRecord::new("img.jpg", "car", RawGeometry::bbox(5.0, 5.0, 1.0, 1.0))
                .with_attributes(vec![("color".into(), json!("red"))]),
        );
        batch.push(RawInstanceRecord::new(
            "img.jpg",
            "car",
            RawGeometry::Point { x: 1.0, y: 2.0 },
        ));
        batch.push(RawInstanceRecord::new(
            "img.jpg",
            "car",
            RawGeometry::Polygon(vec![0.0, 0.0, 1.0, 1.0]),
        ));
        batch.push(RawInstanceRecord::new("img.jpg", " ", RawGeometry::Tag));

        let mut catalog = ClassCatalog::new(Palette::seeded(3));
        let outputs =
            NullFormat.build_canonical_outputs(batch, &mut catalog, &ParseOptions::default());

        assert_eq!(catalog.len(), 1);
        assert_eq!(outputs.documents.len(), 2);
        assert_eq!(outputs.instance_count(), 2);
        assert_eq!(outputs.skipped.len(), 2);

        let doc = &outputs.documents["img.jpg"];
        assert_eq!(doc.metadata.width, Some(10));
        assert_eq!(doc.instances[0].class_id, Some(1));
        assert_eq!(doc.instances[0].attributes.len(), 1);
        assert!(outputs.documents["empty.jpg"].instances.is_empty());
    }

    #[test]
    fn test_outputs_extend_appends_instances() {
        let mut a = CanonicalOutputs::default();
        a.push_instance("x.jpg", VectorInstance::new(VectorGeometry::Tag));
        let mut b = CanonicalOutputs::default();
        b.push_instance("x.jpg", VectorInstance::new(VectorGeometry::Tag));
        b.skip("y.jpg", "bad");

        a.extend(b);
        assert_eq!(a.documents.len(), 1);
        assert_eq!(a.instance_count(), 2);
        assert_eq!(a.skipped.len(), 1);
    }
}
