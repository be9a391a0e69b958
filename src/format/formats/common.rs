//! Helpers shared by the format strategies.

use std::collections::HashMap;
use std::io::Cursor;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::constants::IMAGE_EXTENSIONS;
use crate::format::error::ConvertError;
use crate::source::{DocumentHandle, DocumentSource};

/// Read and deserialize a JSON document.
pub fn read_json<T: DeserializeOwned>(
    source: &dyn DocumentSource,
    handle: &DocumentHandle,
) -> Result<T, ConvertError> {
    let bytes = source.read(handle)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// A finite number, or a string holding one.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => return parse_number(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Parse a finite number from text; `NaN` and infinities are rejected.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric field of a JSON object.
pub fn field(object: &Value, key: &str) -> Option<f64> {
    object.get(key).and_then(number)
}

/// `(x, y)` of a `{"x": .., "y": ..}` object.
pub fn xy(object: &Value) -> Option<(f64, f64)> {
    Some((field(object, "x")?, field(object, "y")?))
}

/// Flatten a list of `{"x", "y"}` objects, failing on the first malformed point.
pub fn xy_list(points: &[Value]) -> Option<Vec<f64>> {
    let mut flat = Vec::with_capacity(points.len() * 2);
    for point in points {
        let (x, y) = xy(point)?;
        flat.extend([x, y]);
    }
    Some(flat)
}

/// Flatten a list of `[x, y]` pairs, failing on the first malformed pair.
pub fn pair_list(points: &[Value]) -> Option<Vec<f64>> {
    let mut flat = Vec::with_capacity(points.len() * 2);
    for point in points {
        let pair = point.as_array()?;
        if pair.len() < 2 {
            return None;
        }
        flat.extend([number(&pair[0])?, number(&pair[1])?]);
    }
    Some(flat)
}

/// Attribute candidates from a JSON object, in key order.
pub fn candidates(map: &Map<String, Value>, exclude: &[&str]) -> Vec<(String, Value)> {
    map.iter()
        .filter(|(k, _)| !exclude.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Last path component of a file name or URI.
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
}

/// Width and height read from the header of an image document.
///
/// Returns `None` when the document is missing or not a readable image.
pub fn image_dimensions(source: &dyn DocumentSource, handle: &DocumentHandle) -> Option<(u32, u32)> {
    let bytes = source.read(handle).ok()?;
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok((w, h)) if w > 0 && h > 0 => Some((w, h)),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Could not read image header of {}: {}", handle, e);
            None
        }
    }
}

/// Image documents of a source keyed by file name, listed once per document.
///
/// When several folders hold an image of the same name, the first in listing
/// order wins.
pub struct ImageIndex<'a> {
    source: &'a dyn DocumentSource,
    by_name: HashMap<String, DocumentHandle>,
}

impl<'a> ImageIndex<'a> {
    /// List the source and index every image by file name.
    pub fn new(source: &'a dyn DocumentSource) -> Self {
        let handles = source.list().unwrap_or_else(|e| {
            log::debug!("Could not list {} for images: {}", source.describe(), e);
            Vec::new()
        });
        let mut by_name = HashMap::new();
        for handle in handles.into_iter().filter(|h| h.has_extension(IMAGE_EXTENSIONS)) {
            by_name.entry(handle.file_name().to_string()).or_insert(handle);
        }
        log::trace!("Indexed {} images of {}", by_name.len(), source.describe());
        Self { source, by_name }
    }

    /// Find an image by its key, or by file name anywhere in the source.
    pub fn find(&self, name: &str) -> Option<DocumentHandle> {
        let direct = DocumentHandle::new(name);
        if self.source.contains(&direct) {
            return Some(direct);
        }
        self.by_name.get(base_name(name)).cloned()
    }

    /// Width and height of the named image, read from its header.
    pub fn dimensions(&self, name: &str) -> Option<(u32, u32)> {
        image_dimensions(self.source, &self.find(name)?)
    }
}

/// Find the image next to an annotation file with the same stem.
///
/// Both `dir/img.txt -> dir/img.jpg` and `labels/img.txt -> images/img.jpg`
/// layouts are recognized.
pub fn find_sibling_image(source: &dyn DocumentSource, handle: &DocumentHandle) -> Option<DocumentHandle> {
    let parent = handle.parent();
    let mut dirs = vec![parent.to_string()];
    if let Some(images) = swap_labels_dir(parent) {
        dirs.push(images);
    }

    for dir in &dirs {
        for ext in IMAGE_EXTENSIONS {
            let name = format!("{}.{}", handle.stem(), ext);
            let candidate = if dir.is_empty() {
                DocumentHandle::new(name)
            } else {
                DocumentHandle::new(format!("{}/{}", dir, name))
            };
            if source.contains(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn swap_labels_dir(parent: &str) -> Option<String> {
    if parent == "labels" {
        return Some("images".to_string());
    }
    if let Some(prefix) = parent.strip_suffix("/labels") {
        return Some(format!("{}/images", prefix));
    }
    parent
        .contains("/labels/")
        .then(|| parent.replacen("/labels/", "/images/", 1))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::source::MemorySource;
    use image::{ImageFormat, RgbImage};
    use serde_json::json;

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        assert_eq!(number(&json!(3)), Some(3.0));
        assert_eq!(number(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(number(&json!("x")), None);
        assert_eq!(number(&json!("NaN")), None);
        assert_eq!(number(&json!("-inf")), None);
        assert_eq!(number(&json!(null)), None);
    }

    #[test]
    fn test_point_lists() {
        assert_eq!(
            xy_list(&[json!({"x": 1, "y": 2}), json!({"x": 3, "y": 4})]),
            Some(vec![1.0, 2.0, 3.0, 4.0])
        );
        assert_eq!(xy_list(&[json!({"x": 1})]), None);
        assert_eq!(pair_list(&[json!([1, 2]), json!([3, 4])]), Some(vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("gs://bucket/dir/img.jpg"), "img.jpg");
        assert_eq!(base_name("img.jpg"), "img.jpg");
        assert_eq!(base_name("C:\\data\\img.png"), "img.png");
    }

    #[test]
    fn test_image_dimensions_from_header() {
        let source = MemorySource::new("mem")
            .with_file("a.png", png(7, 5))
            .with_file("b.png", b"not an image".to_vec());
        assert_eq!(image_dimensions(&source, &DocumentHandle::new("a.png")), Some((7, 5)));
        assert_eq!(image_dimensions(&source, &DocumentHandle::new("b.png")), None);
        assert_eq!(image_dimensions(&source, &DocumentHandle::new("c.png")), None);
    }

    #[test]
    fn test_find_sibling_image() {
        let source = MemorySource::new("mem")
            .with_file("set/images/a.png", png(2, 2))
            .with_file("set/labels/a.txt", "")
            .with_file("flat/b.jpg", png(2, 2))
            .with_file("flat/b.txt", "");

        assert_eq!(
            find_sibling_image(&source, &DocumentHandle::new("set/labels/a.txt")),
            Some(DocumentHandle::new("set/images/a.png"))
        );
        assert_eq!(
            find_sibling_image(&source, &DocumentHandle::new("flat/b.txt")),
            Some(DocumentHandle::new("flat/b.jpg"))
        );
    }

    #[test]
    fn test_image_index() {
        let source = MemorySource::new("mem")
            .with_file("set/images/a.png", png(3, 2))
            .with_file("set/labels/a.txt", "")
            .with_file("z/a.png", png(9, 9));
        let index = ImageIndex::new(&source);

        assert_eq!(index.find("a.png"), Some(DocumentHandle::new("set/images/a.png")));
        assert_eq!(index.find("z/a.png"), Some(DocumentHandle::new("z/a.png")));
        assert_eq!(index.find("other/a.png"), Some(DocumentHandle::new("set/images/a.png")));
        assert_eq!(index.find("a.txt"), None);
        assert_eq!(index.dimensions("a.png"), Some((3, 2)));
        assert_eq!(index.dimensions("missing.png"), None);
    }
}
