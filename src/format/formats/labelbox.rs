//! Labelbox JSON export format.
//!
//! An array of rows, one per image:
//!
//! ```json
//! [
//!   {
//!     "External ID": "img.jpg",
//!     "Label": {
//!       "objects": [
//!         {
//!           "title": "car",
//!           "color": "#ff0000",
//!           "bbox": {"top": 10, "left": 20, "height": 30, "width": 40},
//!           "classifications": [
//!             {"title": "color", "answer": {"title": "red"}},
//!             {"title": "damage", "answers": [{"title": "dent"}]}
//!           ]
//!         }
//!       ],
//!       "classifications": [{"title": "weather", "answer": {"title": "sunny"}}]
//!     }
//!   }
//! ]
//! ```
//!
//! Image-level classifications become `tag` instances of a class named after
//! the question.

use serde_json::Value;

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
};
use crate::geometry;
use crate::source::{DocumentHandle, DocumentSource};

/// Labelbox strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelboxFormat;

impl FormatStrategy for LabelboxFormat {
    fn id(&self) -> &'static str {
        "labelbox"
    }

    fn display_name(&self) -> &'static str {
        "Labelbox (JSON)"
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
        let rows: Vec<Value> = common::read_json(source, handle)?;
        let images = common::ImageIndex::new(source);
        let mut batch = RecordBatch::new();

        for row in &rows {
            let Some(item) = row.get("External ID").and_then(Value::as_str) else {
                batch.skip(None, "row without 'External ID'");
                continue;
            };
            let item = common::base_name(item);

            let label = row.get("Label").unwrap_or(&Value::Null);
            let skipped = row.get("Skipped").and_then(Value::as_bool).unwrap_or(false);
            if skipped || label.as_str() == Some("Skip") {
                batch.skip(Some(item), "row was skipped in Labelbox");
                continue;
            }

            batch.add_item(match images.dimensions(item) {
                Some((w, h)) => ItemInfo::with_dimensions(item, w, h),
                None => ItemInfo::named(item),
            });

            for object in list(label, "objects") {
                parse_object(item, object, &mut batch);
            }
            for classification in list(label, "classifications") {
                let Some(title) = classification.get("title").and_then(Value::as_str) else {
                    continue;
                };
                let candidates = answer_candidate(classification).into_iter().collect();
                batch.push(RawInstanceRecord::new(item, title, RawGeometry::Tag).with_attributes(candidates));
            }
        }

        log::debug!(
            "Parsed {} objects of {} rows from {}",
            batch.records.len(),
            rows.len(),
            handle
        );
        Ok(batch)
    }
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn parse_object(item: &str, object: &Value, batch: &mut RecordBatch) {
    let class_name = object
        .get("title")
        .or_else(|| object.get("value"))
        .and_then(Value::as_str);
    let Some(class_name) = class_name else {
        batch.skip(Some(item), "object without a title");
        return;
    };

    let geometry = match object_geometry(object) {
        Ok(Some(geometry)) => geometry,
        Ok(None) => {
            log::trace!("Dropping degenerate '{}' object of {}", class_name, item);
            return;
        }
        Err(reason) => {
            batch.skip(Some(item), reason);
            return;
        }
    };

    let candidates = list(object, "classifications")
        .iter()
        .filter_map(answer_candidate)
        .collect();
    let color = object.get("color").and_then(Value::as_str).map(str::to_string);
    batch.push(
        RawInstanceRecord::new(item, class_name, geometry)
            .with_color(color)
            .with_attributes(candidates),
    );
}

fn object_geometry(object: &Value) -> Result<Option<RawGeometry>, String> {
    if let Some(b) = object.get("bbox") {
        let field = |key: &str| common::field(b, key).ok_or_else(|| "malformed bbox".to_string());
        let b = geometry::bbox_from_xywh(field("left")?, field("top")?, field("width")?, field("height")?);
        return Ok(Some(RawGeometry::Bbox(b)));
    }
    if let Some(Value::Array(points)) = object.get("polygon") {
        let flat = common::xy_list(points).ok_or_else(|| "malformed polygon".to_string())?;
        if geometry::is_degenerate_contour(&flat) {
            return Ok(None);
        }
        return Ok(Some(RawGeometry::Polygon(flat)));
    }
    if let Some(Value::Array(points)) = object.get("line") {
        let flat = common::xy_list(points).ok_or_else(|| "malformed line".to_string())?;
        if flat.len() < 4 {
            return Ok(None);
        }
        return Ok(Some(RawGeometry::Polyline(flat)));
    }
    if let Some(point) = object.get("point") {
        let (x, y) = common::xy(point).ok_or_else(|| "malformed point".to_string())?;
        return Ok(Some(RawGeometry::Point { x, y }));
    }
    Err("object has no supported geometry".to_string())
}

/// Attribute candidate of a classification: `answer` is single, `answers` multi.
fn answer_candidate(classification: &Value) -> Option<(String, Value)> {
    let group = classification.get("title")?.as_str()?.to_string();
    let title = |answer: &Value| -> Option<Value> {
        match answer {
            Value::String(s) => Some(Value::String(s.clone())),
            other => other
                .get("title")
                .or_else(|| other.get("value"))
                .cloned(),
        }
    };

    if let Some(answers) = classification.get("answers").and_then(Value::as_array) {
        let names: Vec<Value> = answers.iter().filter_map(title).collect();
        return Some((group, Value::Array(names)));
    }
    let answer = title(classification.get("answer")?)?;
    Some((group, answer))
}
