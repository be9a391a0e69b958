//! DataLoop JSON format.
//!
//! One JSON file per item:
//!
//! ```json
//! {
//!   "filename": "/folder/img.jpg",
//!   "metadata": {"system": {"width": 640, "height": 480}},
//!   "annotations": [
//!     {
//!       "type": "box",
//!       "label": "car",
//!       "coordinates": [{"x": 1, "y": 2}, {"x": 30, "y": 40}],
//!       "attributes": ["parked"],
//!       "metadata": {"system": {"attributes": {"color": "red"}}}
//!     }
//!   ]
//! }
//! ```
//!
//! `binary` annotations carry a base64 PNG mask whose regions become polygons.

use serde_json::Value;

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
};
use crate::geometry;
use crate::mask;
use crate::source::{DocumentHandle, DocumentSource};

/// Group receiving list-style DataLoop attributes.
const LIST_GROUP: &str = "attributes";

/// DataLoop strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataloopFormat;

impl FormatStrategy for DataloopFormat {
    fn id(&self) -> &'static str {
        "dataloop"
    }

    fn display_name(&self) -> &'static str {
        "DataLoop (JSON)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn parse_records(
        &self,
        source: &dyn DocumentSource,
        handle: &DocumentHandle,
        _options: &ParseOptions,
    ) -> Result<RecordBatch, ConvertError> {
        let document: Value = common::read_json(source, handle)?;
        let item = match document.get("filename").and_then(Value::as_str) {
            Some(name) if !common::base_name(name).is_empty() => common::base_name(name).to_string(),
            _ => handle.stem().to_string(),
        };

        let system = document.pointer("/metadata/system").unwrap_or(&Value::Null);
        let width = common::field(system, "width").unwrap_or(0.0);
        let height = common::field(system, "height").unwrap_or(0.0);

        let mut batch = RecordBatch::new();
        batch.add_item(ItemInfo::with_dimensions(&item, width as u32, height as u32));

        let annotations = document
            .get("annotations")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for annotation in annotations {
            parse_annotation(&item, annotation, &mut batch);
        }

        log::debug!("Parsed {} annotations from {}", batch.records.len(), handle);
        Ok(batch)
    }
}

fn parse_annotation(item: &str, annotation: &Value, batch: &mut RecordBatch) {
    let kind = annotation.get("type").and_then(Value::as_str).unwrap_or("");
    let Some(label) = annotation.get("label").and_then(Value::as_str) else {
        batch.skip(Some(item), format!("'{}' annotation has no label", kind));
        return;
    };
    let coordinates = annotation.get("coordinates").unwrap_or(&Value::Null);

    let geometries = match geometries(kind, coordinates) {
        Ok(geometries) => geometries,
        Err(reason) => {
            batch.skip(Some(item), reason);
            return;
        }
    };

    let candidates = attribute_candidates(annotation);
    for geometry in geometries {
        batch.push(
            RawInstanceRecord::new(item, label.trim(), geometry).with_attributes(candidates.clone()),
        );
    }
}

/// Geometries of one annotation; masks may yield several, degenerate contours none.
fn geometries(kind: &str, coordinates: &Value) -> Result<Vec<RawGeometry>, String> {
    let malformed = || format!("malformed '{}' coordinates", kind);

    let geometry = match kind {
        "box" => {
            let points = coordinates.as_array().ok_or_else(malformed)?;
            let flat = common::xy_list(points).filter(|f| f.len() >= 4).ok_or_else(malformed)?;
            RawGeometry::bbox(flat[0], flat[1], flat[2], flat[3])
        }
        "segment" => {
            let mut contour = coordinates.as_array().ok_or_else(malformed)?;
            // Either a single contour or a list of contours of which the first is used.
            if let Some(first) = contour.first().and_then(Value::as_array) {
                contour = first;
            }
            let flat = common::xy_list(contour).ok_or_else(malformed)?;
            if geometry::is_degenerate_contour(&flat) {
                return Ok(Vec::new());
            }
            RawGeometry::Polygon(flat)
        }
        "point" => {
            let point = coordinates
                .as_array()
                .and_then(|a| a.first())
                .unwrap_or(coordinates);
            let (x, y) = common::xy(point).ok_or_else(malformed)?;
            RawGeometry::Point { x, y }
        }
        "ellipse" => {
            let center = coordinates.get("center").ok_or_else(malformed)?;
            let (cx, cy) = common::xy(center).ok_or_else(malformed)?;
            RawGeometry::Ellipse {
                cx,
                cy,
                rx: common::field(coordinates, "rx").ok_or_else(malformed)?,
                ry: common::field(coordinates, "ry").ok_or_else(malformed)?,
                angle: common::field(coordinates, "angle").unwrap_or(0.0),
            }
        }
        "binary" => {
            let payload = coordinates.as_str().ok_or_else(malformed)?;
            let bytes = mask::decode_base64(payload).map_err(|e| e.to_string())?;
            let polygons = mask::image_to_polygons(&bytes, (0.0, 0.0)).map_err(|e| e.to_string())?;
            return Ok(polygons.into_iter().map(RawGeometry::Polygon).collect());
        }
        "class" => RawGeometry::Tag,
        other => return Err(format!("unsupported annotation type '{}'", other)),
    };
    Ok(vec![geometry])
}

fn attribute_candidates(annotation: &Value) -> Vec<(String, Value)> {
    let mut candidates = Vec::new();
    let list = annotation.get("attributes").and_then(Value::as_array);
    if let Some(list) = list.filter(|l| !l.is_empty()) {
        candidates.push((LIST_GROUP.to_string(), Value::Array(list.clone())));
    }
    if let Some(map) = annotation
        .pointer("/metadata/system/attributes")
        .and_then(Value::as_object)
    {
        candidates.extend(common::candidates(map, &[]));
    }
    candidates
}
