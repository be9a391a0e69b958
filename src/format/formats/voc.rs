//! Pascal VOC XML format.
//!
//! One XML file per image, usually under `Annotations/`:
//!
//! ```xml
//! <annotation>
//!   <filename>image1.jpg</filename>
//!   <size><width>640</width><height>480</height><depth>3</depth></size>
//!   <object>
//!     <name>person</name>
//!     <pose>Unspecified</pose>
//!     <truncated>0</truncated>
//!     <difficult>0</difficult>
//!     <bndbox><xmin>100</xmin><ymin>100</ymin><xmax>200</xmax><ymax>200</ymax></bndbox>
//!     <attributes>
//!       <attribute><name>color</name><value>red</value></attribute>
//!     </attributes>
//!   </object>
//! </annotation>
//! ```
//!
//! Objects with a `<polygon>` (`x1`, `y1`, `x2`, `y2`, ... children) become
//! polygons, all others boxes.

use std::collections::BTreeMap;

use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::Value;

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
};
use crate::geometry::{self, BoxCoords};
use crate::source::{DocumentHandle, DocumentSource};

/// Flag elements turned into single-select attribute groups.
const FLAG_GROUPS: &[&str] = &["pose", "truncated", "difficult", "occluded"];

/// Pascal VOC strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct VocFormat;

impl FormatStrategy for VocFormat {
    fn id(&self) -> &'static str {
        "voc"
    }

    fn display_name(&self) -> &'static str {
        "Pascal VOC (XML)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["xml"]
    }

    fn parse_records(
        &self,
        source: &dyn DocumentSource,
        handle: &DocumentHandle,
        options: &ParseOptions,
    ) -> Result<RecordBatch, ConvertError> {
        let content = source.read_to_string(handle)?;
        let annotation: VocAnnotation = from_str(&content)?;

        let item = match annotation.filename.trim() {
            "" => format!("{}.jpg", handle.stem()),
            name => name.to_string(),
        };
        let mut batch = RecordBatch::new();
        batch.add_item(match &annotation.size {
            Some(size) => ItemInfo::with_dimensions(&item, size.width as u32, size.height as u32),
            None => ItemInfo::named(&item),
        });

        let mut kept: Vec<(String, BoxCoords)> = Vec::new();
        for object in annotation.objects {
            let Some(geometry) = object.geometry() else {
                batch.skip(Some(&item), format!("object '{}' has no usable geometry", object.name));
                continue;
            };

            if let (Some(threshold), RawGeometry::Bbox(b)) = (options.duplicate_iou, &geometry) {
                let duplicate = kept
                    .iter()
                    .any(|(class, other)| *class == object.name && geometry::iou(*b, *other) >= threshold);
                if duplicate {
                    batch.skip(Some(&item), format!("duplicate '{}' box", object.name));
                    continue;
                }
                kept.push((object.name.clone(), *b));
            }

            let attributes = object.candidates();
            batch.push(
                RawInstanceRecord::new(&item, object.name.trim(), geometry).with_attributes(attributes),
            );
        }

        log::debug!(
            "Parsed {} objects from {} ({} skipped)",
            batch.records.len(),
            handle,
            batch.skipped.len()
        );
        Ok(batch)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "annotation")]
struct VocAnnotation {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    size: Option<VocSize>,
    #[serde(rename = "object", default)]
    objects: Vec<VocObject>,
}

#[derive(Debug, Deserialize)]
struct VocSize {
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

#[derive(Debug, Deserialize)]
struct VocObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    pose: Option<String>,
    #[serde(default)]
    truncated: Option<String>,
    #[serde(default)]
    difficult: Option<String>,
    #[serde(default)]
    occluded: Option<String>,
    #[serde(default)]
    bndbox: Option<VocBndbox>,
    #[serde(default)]
    polygon: Option<BTreeMap<String, String>>,
    #[serde(default)]
    attributes: Option<VocAttributes>,
}

#[derive(Debug, Deserialize)]
struct VocBndbox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

#[derive(Debug, Deserialize)]
struct VocAttributes {
    #[serde(rename = "attribute", default)]
    items: Vec<VocAttribute>,
}

#[derive(Debug, Deserialize)]
struct VocAttribute {
    name: String,
    #[serde(default)]
    value: String,
}

impl VocObject {
    fn geometry(&self) -> Option<RawGeometry> {
        let polygon = self.polygon.as_ref().and_then(polygon_points);
        if let Some(points) = polygon.filter(|p| !geometry::is_degenerate_contour(p)) {
            return Some(RawGeometry::Polygon(points));
        }
        self.bndbox
            .as_ref()
            .map(|b| RawGeometry::bbox(b.xmin, b.ymin, b.xmax, b.ymax))
    }

    fn candidates(&self) -> Vec<(String, Value)> {
        let flags = [&self.pose, &self.truncated, &self.difficult, &self.occluded];
        let mut candidates: Vec<(String, Value)> = FLAG_GROUPS
            .iter()
            .zip(flags)
            .filter_map(|(group, value)| {
                let value = value.as_deref()?.trim();
                if value.is_empty() || (*group == "pose" && value == "Unspecified") {
                    return None;
                }
                Some((group.to_string(), Value::String(value.to_string())))
            })
            .collect();

        if let Some(attributes) = &self.attributes {
            candidates.extend(
                attributes
                    .items
                    .iter()
                    .map(|a| (a.name.trim().to_string(), Value::String(a.value.trim().to_string()))),
            );
        }
        candidates
    }
}

/// Collect `x1, y1, x2, y2, ...` children into a flat list, stopping at the first gap.
fn polygon_points(children: &BTreeMap<String, String>) -> Option<Vec<f64>> {
    let mut points = Vec::new();
    for n in 1.. {
        let (Some(x), Some(y)) = (children.get(&format!("x{n}")), children.get(&format!("y{n}")))
        else {
            break;
        };
        points.extend([common::parse_number(x)?, common::parse_number(y)?]);
    }
    (!points.is_empty()).then_some(points)
}
