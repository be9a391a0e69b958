//! VGG Image Annotator (VIA) JSON format.
//!
//! A project file maps entry keys to images:
//!
//! ```json
//! {
//!   "img.jpg12345": {
//!     "filename": "img.jpg",
//!     "regions": [
//!       {
//!         "shape_attributes": {"name": "rect", "x": 10, "y": 20, "width": 30, "height": 40},
//!         "region_attributes": {"type": "car", "color": "red"}
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! VIA 2 projects wrap the entries in `_via_img_metadata`, and older exports
//! store `regions` as an object keyed by index.

use serde_json::{Map, Value};

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
};
use crate::geometry;
use crate::source::{DocumentHandle, DocumentSource};

/// VGG strategy.
#[derive(Debug, Clone)]
pub struct VggFormat {
    /// Region attribute holding the class name.
    pub class_key: String,
}

impl VggFormat {
    /// Create a strategy reading the class from the `type` region attribute.
    pub fn new() -> Self {
        Self {
            class_key: "type".to_string(),
        }
    }

    /// Read the class from another region attribute.
    pub fn with_class_key(mut self, key: impl Into<String>) -> Self {
        self.class_key = key.into();
        self
    }

    fn class_name(&self, attributes: &Map<String, Value>) -> Option<String> {
        let name = match attributes.get(&self.class_key)? {
            Value::String(s) => Some(s.trim().to_string()),
            // Checkbox attributes: `{"car": true}`.
            Value::Object(options) => options
                .iter()
                .find(|(_, v)| v.as_bool().unwrap_or(false))
                .map(|(k, _)| k.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        };
        name.filter(|name| !name.is_empty())
    }
}

impl Default for VggFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatStrategy for VggFormat {
    fn id(&self) -> &'static str {
        "vgg"
    }

    fn display_name(&self) -> &'static str {
        "VGG Image Annotator (JSON)"
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
        let project: Value = common::read_json(source, handle)?;
        let entries = project
            .get("_via_img_metadata")
            .unwrap_or(&project)
            .as_object()
            .ok_or_else(|| ConvertError::invalid_format("VGG project must be a JSON object"))?;

        let images = common::ImageIndex::new(source);
        let mut batch = RecordBatch::new();
        for (key, entry) in entries {
            let item = entry
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or(key)
                .to_string();
            batch.add_item(match images.dimensions(&item) {
                Some((w, h)) => ItemInfo::with_dimensions(&item, w, h),
                None => ItemInfo::named(&item),
            });

            for region in regions(entry) {
                self.parse_region(&item, region, &mut batch);
            }
        }

        log::debug!(
            "Parsed {} regions of {} images from {}",
            batch.records.len(),
            batch.items.len(),
            handle
        );
        Ok(batch)
    }
}

impl VggFormat {
    fn parse_region(&self, item: &str, region: &Value, batch: &mut RecordBatch) {
        let empty = Map::new();
        let attributes = region
            .get("region_attributes")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let Some(class_name) = self.class_name(attributes) else {
            batch.skip(Some(item), format!("region has no '{}' attribute", self.class_key));
            return;
        };

        let shape = region.get("shape_attributes").unwrap_or(&Value::Null);
        let geometry = match shape_geometry(shape) {
            Ok(Some(geometry)) => geometry,
            Ok(None) => {
                log::trace!("Dropping degenerate region of {}", item);
                return;
            }
            Err(reason) => {
                batch.skip(Some(item), reason);
                return;
            }
        };

        let candidates = common::candidates(attributes, &[self.class_key.as_str()]);
        batch.push(RawInstanceRecord::new(item, class_name, geometry).with_attributes(candidates));
    }
}

/// Regions of an entry, given as an array or an index-keyed object.
fn regions(entry: &Value) -> Vec<&Value> {
    match entry.get("regions") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    }
}

/// Geometry of a region; `Ok(None)` for a degenerate contour.
fn shape_geometry(shape: &Value) -> Result<Option<RawGeometry>, String> {
    let name = shape.get("name").and_then(Value::as_str).unwrap_or("");
    let malformed = || format!("malformed '{}' region", name);
    let num = |key: &str| common::field(shape, key).ok_or_else(malformed);

    let geometry = match name {
        "rect" => {
            let b = geometry::bbox_from_xywh(num("x")?, num("y")?, num("width")?, num("height")?);
            RawGeometry::Bbox(b)
        }
        "polygon" | "polyline" => {
            let points = zip_points(shape).ok_or_else(malformed)?;
            if name == "polyline" {
                if points.len() < 4 {
                    return Ok(None);
                }
                RawGeometry::Polyline(points)
            } else {
                if geometry::is_degenerate_contour(&points) {
                    return Ok(None);
                }
                RawGeometry::Polygon(points)
            }
        }
        "circle" => {
            let r = num("r")?;
            RawGeometry::Ellipse {
                cx: num("cx")?,
                cy: num("cy")?,
                rx: r,
                ry: r,
                angle: 0.0,
            }
        }
        "ellipse" => RawGeometry::Ellipse {
            cx: num("cx")?,
            cy: num("cy")?,
            rx: num("rx")?,
            ry: num("ry")?,
            angle: common::field(shape, "theta").unwrap_or(0.0).to_degrees(),
        },
        "point" => RawGeometry::Point {
            x: num("cx")?,
            y: num("cy")?,
        },
        other => return Err(format!("unsupported region shape '{}'", other)),
    };
    Ok(Some(geometry))
}

fn zip_points(shape: &Value) -> Option<Vec<f64>> {
    let xs = shape.get("all_points_x")?.as_array()?;
    let ys = shape.get("all_points_y")?.as_array()?;
    if xs.len() != ys.len() {
        return None;
    }
    let mut points = Vec::with_capacity(xs.len() * 2);
    for (x, y) in xs.iter().zip(ys) {
        points.extend([common::number(x)?, common::number(y)?]);
    }
    Some(points)
}
