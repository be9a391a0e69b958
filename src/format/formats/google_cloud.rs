//! GoogleCloud AutoML Vision CSV format.
//!
//! One row per box, coordinates normalized to `[0, 1]`:
//!
//! ```text
//! TRAIN,gs://bucket/images/img.jpg,car,0.1,0.2,,,0.5,0.6,,
//! ```
//!
//! The pixel size of each box comes from the header of the referenced image,
//! looked up by file name in the export. Rows whose image cannot be read are
//! skipped.

use std::collections::HashMap;

use serde_json::Value;

use crate::format::error::ConvertError;
use crate::format::formats::common;
use crate::format::traits::{
    FormatStrategy, ItemInfo, ParseOptions, RawGeometry, RawInstanceRecord, RecordBatch,
};
use crate::source::{DocumentHandle, DocumentSource};

/// Columns of one row.
const COLUMNS: usize = 9;

/// Group receiving the ML set (`TRAIN`, `VALIDATION`, `TEST`, `UNASSIGNED`).
const SET_GROUP: &str = "set";

/// GoogleCloud strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleCloudFormat;

impl FormatStrategy for GoogleCloudFormat {
    fn id(&self) -> &'static str {
        "googlecloud"
    }

    fn display_name(&self) -> &'static str {
        "GoogleCloud AutoML (CSV)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["csv"]
    }

    fn parse_records(
        &self,
        source: &dyn DocumentSource,
        handle: &DocumentHandle,
        _options: &ParseOptions,
    ) -> Result<RecordBatch, ConvertError> {
        let content = source.read_to_string(handle)?;
        let images = common::ImageIndex::new(source);
        let mut batch = RecordBatch::new();
        let mut dimensions: HashMap<String, Option<(u32, u32)>> = HashMap::new();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let columns = split_row(line);
            if columns.len() < COLUMNS {
                batch.skip(None, format!("row {} has {} columns", index + 1, columns.len()));
                continue;
            }
            let coords: Option<Vec<f64>> = [3, 4, 7, 8]
                .iter()
                .map(|&i| common::parse_number(&columns[i]))
                .collect();
            let Some(coords) = coords else {
                if index == 0 {
                    log::trace!("Treating first row of {} as a header", handle);
                } else {
                    batch.skip(None, format!("row {} has non-numeric coordinates", index + 1));
                }
                continue;
            };

            let item = common::base_name(&columns[1]).to_string();
            let size = *dimensions
                .entry(item.clone())
                .or_insert_with(|| images.dimensions(&item));
            let Some((width, height)) = size else {
                batch.skip(Some(&item), "image dimensions unknown");
                continue;
            };
            batch.add_item(ItemInfo::with_dimensions(&item, width, height));

            let (w, h) = (f64::from(width), f64::from(height));
            let geometry = RawGeometry::bbox(coords[0] * w, coords[1] * h, coords[2] * w, coords[3] * h);
            let mut record = RawInstanceRecord::new(&item, columns[2].as_str(), geometry);
            if !columns[0].is_empty() {
                record = record.with_attributes(vec![(
                    SET_GROUP.to_string(),
                    Value::String(columns[0].clone()),
                )]);
            }
            batch.push(record);
        }

        log::debug!("Parsed {} rows from {}", batch.records.len(), handle);
        Ok(batch)
    }
}

/// Split one CSV row, honoring double-quoted fields.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_row() {
        assert_eq!(split_row("a, b ,,c"), ["a", "b", "", "c"]);
        assert_eq!(split_row(r#"x,"gs://b/a,b.jpg",y"#), ["x", "gs://b/a,b.jpg", "y"]);
        assert_eq!(split_row(r#""say ""hi""""#), [r#"say "hi""#]);
    }
}
