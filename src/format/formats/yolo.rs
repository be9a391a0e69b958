//! YOLO TXT format.
//!
//! One text file per image next to the image (or in a `labels/` folder
//! mirroring `images/`), plus a class list in `classes.txt` or `obj.names`.
//! Each row is either a detection or a segmentation, normalized to `[0, 1]`:
//!
//! ```text
//! 0 0.5 0.5 0.25 0.25            class x_center y_center width height
//! 0 0.5 0.5 0.25 0.25 0.87       ... with a confidence
//! 1 0.1 0.1 0.4 0.1 0.4 0.5      class x1 y1 x2 y2 x3 y3 ...
//! ```

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
    locate_by_extension,
};
use crate::geometry;
use crate::source::{DocumentHandle, DocumentSource};

/// Class list file names, in lookup order.
const CLASS_FILES: &[&str] = &["classes.txt", "obj.names"];

/// YOLO strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct YoloFormat;

impl FormatStrategy for YoloFormat {
    fn id(&self) -> &'static str {
        "yolo"
    }

    fn display_name(&self) -> &'static str {
        "YOLO (TXT)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn locate_source_documents(
        &self,
        source: &dyn DocumentSource,
        dataset: Option<&str>,
    ) -> Result<Vec<DocumentHandle>, ConvertError> {
        locate_by_extension(source, self.extensions(), dataset, |h| {
            !CLASS_FILES.contains(&h.file_name())
        })
    }

    fn parse_records(
        &self,
        source: &dyn DocumentSource,
        handle: &DocumentHandle,
        _options: &ParseOptions,
    ) -> Result<RecordBatch, ConvertError> {
        let content = source.read_to_string(handle)?;
        let names = class_names(source, handle)?;
        let mut batch = RecordBatch::new();

        let image = common::find_sibling_image(source, handle);
        let dimensions = image.as_ref().and_then(|h| common::image_dimensions(source, h));
        let (Some(image), Some((width, height))) = (image, dimensions) else {
            batch.skip(Some(handle.stem()), "image dimensions unknown");
            return Ok(batch);
        };
        let item = image.file_name().to_string();
        batch.add_item(ItemInfo::with_dimensions(&item, width, height));

        for (index, line) in content.lines().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            match parse_row(&tokens, &names, width, height) {
                Ok(Some(row)) => batch.push(row.into_record(&item)),
                Ok(None) => log::trace!("Dropping degenerate polygon in row {} of {}", index + 1, handle),
                Err(reason) => batch.skip(Some(&item), format!("row {}: {}", index + 1, reason)),
            }
        }

        log::debug!("Parsed {} rows from {}", batch.records.len(), handle);
        Ok(batch)
    }
}

struct Row {
    class_name: String,
    geometry: RawGeometry,
    confidence: Option<f64>,
}

impl Row {
    fn into_record(self, item: &str) -> RawInstanceRecord {
        let mut record = RawInstanceRecord::new(item, self.class_name, self.geometry);
        record.probability = self.confidence;
        record
    }
}

/// One row; `Ok(None)` for a degenerate polygon.
fn parse_row(tokens: &[&str], names: &[String], width: u32, height: u32) -> Result<Option<Row>, String> {
    let index: usize = tokens[0]
        .parse()
        .map_err(|_| format!("invalid class index '{}'", tokens[0]))?;
    let class_name = if names.is_empty() {
        index.to_string()
    } else {
        names
            .get(index)
            .cloned()
            .ok_or_else(|| format!("class index {} out of range", index))?
    };

    let values: Vec<f64> = tokens[1..]
        .iter()
        .map(|t| common::parse_number(t).ok_or_else(|| format!("invalid number '{}'", t)))
        .collect::<Result<_, _>>()?;

    let (geometry, confidence) = match values.as_slice() {
        &[xc, yc, w, h] => (detection(xc, yc, w, h, width, height), None),
        &[xc, yc, w, h, confidence] => (detection(xc, yc, w, h, width, height), Some(confidence)),
        coords if coords.len() >= 6 && coords.len() % 2 == 0 => {
            let points = geometry::denormalize(coords, width, height);
            if geometry::is_degenerate_contour(&points) {
                return Ok(None);
            }
            (RawGeometry::Polygon(points), None)
        }
        other => return Err(format!("unexpected value count {}", other.len())),
    };

    Ok(Some(Row {
        class_name,
        geometry,
        confidence,
    }))
}

fn detection(xc: f64, yc: f64, w: f64, h: f64, width: u32, height: u32) -> RawGeometry {
    RawGeometry::Bbox(geometry::yolo_to_bbox(xc, yc, w, h, width, height))
}

/// Class names from the nearest class list: same folder, its parent, then anywhere.
fn class_names(source: &dyn DocumentSource, handle: &DocumentHandle) -> Result<Vec<String>, ConvertError> {
    let parent = handle.parent();
    let grandparent = parent.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let join = |dir: &str, name: &str| match dir {
        "" => DocumentHandle::new(name),
        dir => DocumentHandle::new(format!("{}/{}", dir, name)),
    };

    let nearby = [parent, grandparent]
        .into_iter()
        .flat_map(|dir| CLASS_FILES.iter().map(move |name| join(dir, name)))
        .find(|h| source.contains(h));
    let found = match nearby {
        Some(h) => Some(h),
        None => source
            .list()?
            .into_iter()
            .filter(|h| CLASS_FILES.contains(&h.file_name()))
            .min_by_key(|h| h.key().matches('/').count()),
    };

    let Some(found) = found else {
        log::debug!("No class list for {}, using class indices as names", handle);
        return Ok(Vec::new());
    };
    let content = source.read_to_string(&found)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
