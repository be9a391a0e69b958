//! VoTT JSON format.
//!
//! Either a project export holding every asset:
//!
//! ```json
//! {
//!   "tags": [{"name": "car", "color": "#ff0000"}],
//!   "assets": {
//!     "a1b2": {
//!       "asset": {"name": "img.jpg", "size": {"width": 640, "height": 480}},
//!       "regions": [
//!         {
//!           "type": "RECTANGLE",
//!           "tags": ["car"],
//!           "boundingBox": {"left": 10, "top": 20, "width": 30, "height": 40},
//!           "points": [{"x": 10, "y": 20}, {"x": 40, "y": 60}]
//!         }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! or one `*-asset.json` file per asset with the `asset` and `regions` keys.

use std::collections::HashMap;

use serde_json::Value;

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
    locate_by_extension,
};
use crate::geometry;
use crate::source::{DocumentHandle, DocumentSource};

const ASSET_SUFFIX: &str = "-asset.json";

/// VoTT strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct VottFormat;

impl FormatStrategy for VottFormat {
    fn id(&self) -> &'static str {
        "vott"
    }

    fn display_name(&self) -> &'static str {
        "VoTT (JSON)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    /// Project exports win over per-asset files when both are present.
    fn locate_source_documents(
        &self,
        source: &dyn DocumentSource,
        dataset: Option<&str>,
    ) -> Result<Vec<DocumentHandle>, ConvertError> {
        let handles = locate_by_extension(source, self.extensions(), dataset, |_| true)?;
        if dataset.is_some() {
            return Ok(handles);
        }
        let (assets, projects): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .partition(|h| h.file_name().ends_with(ASSET_SUFFIX));
        Ok(if projects.is_empty() { assets } else { projects })
    }

    fn parse_records(
        &self,
        source: &dyn DocumentSource,
        handle: &DocumentHandle,
        _options: &ParseOptions,
    ) -> Result<RecordBatch, ConvertError> {
        let document: Value = common::read_json(source, handle)?;
        let colors = tag_colors(&document);

        let mut batch = RecordBatch::new();
        match (document.get("assets"), document.get("asset")) {
            (Some(Value::Object(assets)), _) => {
                for entry in assets.values() {
                    parse_asset(entry, &colors, &mut batch);
                }
            }
            (_, Some(_)) => parse_asset(&document, &colors, &mut batch),
            _ => {
                return Err(ConvertError::invalid_format(format!(
                    "'{}' has neither 'assets' nor 'asset'",
                    handle
                )));
            }
        }

        log::debug!(
            "Parsed {} regions of {} assets from {}",
            batch.records.len(),
            batch.items.len(),
            handle
        );
        Ok(batch)
    }
}

fn tag_colors(document: &Value) -> HashMap<String, String> {
    document
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|tag| {
            let name = tag.get("name")?.as_str()?;
            let color = tag.get("color")?.as_str()?;
            Some((name.to_string(), color.to_string()))
        })
        .collect()
}

fn parse_asset(entry: &Value, colors: &HashMap<String, String>, batch: &mut RecordBatch) {
    let asset = entry.get("asset").unwrap_or(&Value::Null);
    let Some(name) = asset.get("name").and_then(Value::as_str) else {
        batch.skip(None, "asset without a name");
        return;
    };
    let item = common::base_name(name);

    let size = asset.get("size").unwrap_or(&Value::Null);
    let width = common::field(size, "width").unwrap_or(0.0);
    let height = common::field(size, "height").unwrap_or(0.0);
    batch.add_item(ItemInfo::with_dimensions(item, width as u32, height as u32));

    let regions = entry
        .get("regions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for region in regions {
        let geometry = match region_geometry(region) {
            Ok(Some(geometry)) => geometry,
            Ok(None) => {
                log::trace!("Dropping degenerate region of {}", item);
                continue;
            }
            Err(reason) => {
                batch.skip(Some(item), reason);
                continue;
            }
        };

        let tags: Vec<&str> = region
            .get("tags")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect();
        if tags.is_empty() {
            batch.skip(Some(item), "region has no tags");
        }
        for tag in tags {
            batch.push(
                RawInstanceRecord::new(item, tag, geometry.clone())
                    .with_color(colors.get(tag).cloned()),
            );
        }
    }
}

fn region_geometry(region: &Value) -> Result<Option<RawGeometry>, String> {
    let kind = region.get("type").and_then(Value::as_str).unwrap_or("");
    let malformed = || format!("malformed {} region", kind);
    let points = region
        .get("points")
        .and_then(Value::as_array)
        .and_then(|p| common::xy_list(p));

    let geometry = match kind {
        "RECTANGLE" => match region.get("boundingBox") {
            Some(b) => RawGeometry::Bbox(geometry::bbox_from_xywh(
                common::field(b, "left").ok_or_else(malformed)?,
                common::field(b, "top").ok_or_else(malformed)?,
                common::field(b, "width").ok_or_else(malformed)?,
                common::field(b, "height").ok_or_else(malformed)?,
            )),
            None => {
                let b = points.as_deref().and_then(geometry::bounding_box).ok_or_else(malformed)?;
                RawGeometry::Bbox(b)
            }
        },
        "POLYGON" => {
            let points = points.ok_or_else(malformed)?;
            if geometry::is_degenerate_contour(&points) {
                return Ok(None);
            }
            RawGeometry::Polygon(points)
        }
        "POLYLINE" => {
            let points = points.ok_or_else(malformed)?;
            if points.len() < 4 {
                return Ok(None);
            }
            RawGeometry::Polyline(points)
        }
        "POINT" => {
            let points = points.filter(|p| p.len() >= 2).ok_or_else(malformed)?;
            RawGeometry::Point {
                x: points[0],
                y: points[1],
            }
        }
        other => return Err(format!("unsupported region type '{}'", other)),
    };
    Ok(Some(geometry))
}
