//! Supervisely project format.
//!
//! ```text
//! project/
//!   meta.json                 {"classes": [{"title": "car", "color": "#FF0000"}]}
//!   <dataset>/ann/img.jpg.json
//!   <dataset>/img/img.jpg
//! ```
//!
//! An annotation file carries the image size and its objects:
//!
//! ```json
//! {
//!   "size": {"width": 640, "height": 480},
//!   "objects": [
//!     {
//!       "classTitle": "car",
//!       "geometryType": "rectangle",
//!       "points": {"exterior": [[10, 20], [40, 60]], "interior": []},
//!       "tags": [{"name": "color", "value": "red"}, {"name": "parked", "value": null}]
//!     }
//!   ]
//! }
//! ```
//!
//! Bitmaps are base64 zlib-compressed PNG masks placed at `origin`. Polygon
//! interiors are dropped.

use std::collections::HashMap;

use serde_json::Value;

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
};
use crate::geometry;
use crate::mask;
use crate::source::{DocumentHandle, DocumentSource};

const META_FILE: &str = "meta.json";
const ANN_DIR: &str = "ann";

/// Group receiving valueless tags.
const TAG_GROUP: &str = "tags";

/// Supervisely strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperviselyFormat;

impl FormatStrategy for SuperviselyFormat {
    fn id(&self) -> &'static str {
        "supervisely"
    }

    fn display_name(&self) -> &'static str {
        "Supervisely (JSON)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    /// Annotation files under `<dataset>/ann/`; a dataset name selects one dataset folder.
    fn locate_source_documents(
        &self,
        source: &dyn DocumentSource,
        dataset: Option<&str>,
    ) -> Result<Vec<DocumentHandle>, ConvertError> {
        let handles: Vec<DocumentHandle> = source
            .list()?
            .into_iter()
            .filter(|h| h.has_extension(self.extensions()))
            .filter(|h| match dataset_of(h) {
                Some(name) => dataset.is_none_or(|wanted| wanted == name),
                None => false,
            })
            .collect();

        if handles.is_empty() {
            return Err(ConvertError::source_not_found(source.describe(), dataset));
        }
        Ok(handles)
    }

    fn parse_records(
        &self,
        source: &dyn DocumentSource,
        handle: &DocumentHandle,
        _options: &ParseOptions,
    ) -> Result<RecordBatch, ConvertError> {
        let colors = class_colors(source);
        let document: Value = common::read_json(source, handle)?;

        // `img.jpg.json` annotates `img.jpg`.
        let item = handle.stem().to_string();
        let size = document.get("size").unwrap_or(&Value::Null);
        let width = common::field(size, "width").unwrap_or(0.0);
        let height = common::field(size, "height").unwrap_or(0.0);

        let mut batch = RecordBatch::new();
        batch.add_item(ItemInfo::with_dimensions(&item, width as u32, height as u32));

        let objects = document
            .get("objects")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for object in objects {
            parse_object(&item, object, &colors, &mut batch);
        }

        log::debug!("Parsed {} objects from {}", batch.records.len(), handle);
        Ok(batch)
    }
}

/// Dataset folder of an annotation file, `None` if it is not under `ann/`.
fn dataset_of(handle: &DocumentHandle) -> Option<&str> {
    let dir = handle.parent();
    let dataset_dir = match dir.strip_suffix(ANN_DIR)? {
        "" => return Some(""),
        prefix => prefix.strip_suffix('/')?,
    };
    Some(dataset_dir.rsplit('/').next().unwrap_or(dataset_dir))
}

/// Class colors from the shallowest `meta.json` of the project.
fn class_colors(source: &dyn DocumentSource) -> HashMap<String, String> {
    let meta = source.list().ok().and_then(|handles| {
        handles
            .into_iter()
            .filter(|h| h.file_name() == META_FILE)
            .min_by_key(|h| h.key().matches('/').count())
    });
    let Some(meta) = meta else {
        log::debug!("No {} found in {}", META_FILE, source.describe());
        return HashMap::new();
    };

    let document: Value = match common::read_json(source, &meta) {
        Ok(document) => document,
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", meta, e);
            return HashMap::new();
        }
    };
    document
        .get("classes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|class| {
            let title = class.get("title")?.as_str()?;
            let color = class.get("color")?.as_str()?;
            Some((title.to_string(), color.to_string()))
        })
        .collect()
}

fn parse_object(item: &str, object: &Value, colors: &HashMap<String, String>, batch: &mut RecordBatch) {
    let Some(class_name) = object.get("classTitle").and_then(Value::as_str) else {
        batch.skip(Some(item), "object without 'classTitle'");
        return;
    };

    let geometries = match object_geometries(object) {
        Ok(geometries) => geometries,
        Err(reason) => {
            batch.skip(Some(item), reason);
            return;
        }
    };

    let candidates = tag_candidates(object);
    for geometry in geometries {
        batch.push(
            RawInstanceRecord::new(item, class_name, geometry)
                .with_color(colors.get(class_name).cloned())
                .with_attributes(candidates.clone()),
        );
    }
}

fn object_geometries(object: &Value) -> Result<Vec<RawGeometry>, String> {
    let kind = object.get("geometryType").and_then(Value::as_str).unwrap_or("");
    let malformed = || format!("malformed {} object", kind);
    let exterior = || {
        object
            .pointer("/points/exterior")
            .and_then(Value::as_array)
            .and_then(|points| common::pair_list(points))
            .ok_or_else(malformed)
    };

    let geometry = match kind {
        "rectangle" => {
            let flat = exterior()?;
            if flat.len() != 4 {
                return Err(malformed());
            }
            RawGeometry::bbox(flat[0], flat[1], flat[2], flat[3])
        }
        "polygon" => {
            let flat = exterior()?;
            if geometry::is_degenerate_contour(&flat) {
                return Ok(Vec::new());
            }
            RawGeometry::Polygon(flat)
        }
        "line" => {
            let flat = exterior()?;
            if flat.len() < 4 {
                return Ok(Vec::new());
            }
            RawGeometry::Polyline(flat)
        }
        "point" => {
            let flat = exterior()?;
            if flat.len() != 2 {
                return Err(malformed());
            }
            RawGeometry::Point {
                x: flat[0],
                y: flat[1],
            }
        }
        "bitmap" => {
            let bitmap = object.get("bitmap").ok_or_else(malformed)?;
            let data = bitmap.get("data").and_then(Value::as_str).ok_or_else(malformed)?;
            let origin = bitmap
                .get("origin")
                .and_then(|o| Some((common::number(&o[0])?, common::number(&o[1])?)))
                .unwrap_or((0.0, 0.0));
            let bytes = mask::decode_zlib_base64(data).map_err(|e| e.to_string())?;
            let polygons = mask::image_to_polygons(&bytes, origin).map_err(|e| e.to_string())?;
            return Ok(polygons.into_iter().map(RawGeometry::Polygon).collect());
        }
        other => return Err(format!("unsupported geometry type '{}'", other)),
    };
    Ok(vec![geometry])
}

/// Tags with a value become single-select groups, valueless tags the `tags` group.
fn tag_candidates(object: &Value) -> Vec<(String, Value)> {
    let mut candidates = Vec::new();
    let mut flags = Vec::new();
    for tag in object.get("tags").and_then(Value::as_array).into_iter().flatten() {
        let Some(name) = tag.get("name").and_then(Value::as_str) else {
            continue;
        };
        match tag.get("value") {
            None | Some(Value::Null) => flags.push(Value::String(name.to_string())),
            Some(value) => candidates.push((name.to_string(), value.clone())),
        }
    }
    if !flags.is_empty() {
        candidates.push((TAG_GROUP.to_string(), Value::Array(flags)));
    }
    candidates
}
