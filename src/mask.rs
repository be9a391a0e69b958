//! Bitmap mask decoding and contour extraction.
//!
//! Mask-based formats ship instance masks as compressed bitmaps. A mask is
//! decoded to a single channel, binarized, and every connected region is
//! traced along its outer border. Holes are not represented: each region
//! becomes one polygon from its external contour.

use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::ZlibDecoder;
use image::DynamicImage;
use ndarray::Array2;
use thiserror::Error;

use crate::geometry;

/// Errors that can occur while decoding a mask payload.
#[derive(Error, Debug)]
pub enum MaskError {
    /// Payload is not valid base64
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload could not be inflated
    #[error("Invalid compressed payload: {0}")]
    Inflate(#[from] std::io::Error),

    /// Payload is not a readable image
    #[error("Invalid mask image: {0}")]
    Image(#[from] image::ImageError),
}

/// Binarization threshold applied to the mask channel.
pub const MASK_THRESHOLD: u8 = 127;

/// Decode a base64 payload, with or without a `data:...;base64,` prefix.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, MaskError> {
    let data = match payload.split_once(";base64,") {
        Some((_, data)) => data,
        None => payload,
    };
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(cleaned)?)
}

/// Decode a base64 payload holding a zlib-compressed image.
pub fn decode_zlib_base64(payload: &str) -> Result<Vec<u8>, MaskError> {
    let compressed = decode_base64(payload)?;
    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Decode image bytes into a single-channel mask of shape `(height, width)`.
///
/// The alpha channel is used when the image has one, the luminance otherwise.
pub fn decode_mask(bytes: &[u8]) -> Result<Array2<u8>, MaskError> {
    let image = image::load_from_memory(bytes)?;
    Ok(single_channel(&image))
}

fn single_channel(image: &DynamicImage) -> Array2<u8> {
    let has_alpha = image.color().has_alpha();
    let pixels = image.to_luma_alpha8();
    let (width, height) = pixels.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        let [luma, alpha] = pixels.get_pixel(x as u32, y as u32).0;
        if has_alpha { alpha } else { luma }
    })
}

/// Pixels strictly above `threshold` are foreground.
pub fn binarize(mask: &Array2<u8>, threshold: u8) -> Array2<bool> {
    mask.mapv(|v| v > threshold)
}

/// Neighbor offsets `(dy, dx)` in clockwise order starting west.
const NEIGHBORS: [(isize, isize); 8] = [
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
];

fn neighbor_index(dy: isize, dx: isize) -> usize {
    NEIGHBORS
        .iter()
        .position(|&n| n == (dy, dx))
        .unwrap_or(0)
}

fn is_set(mask: &Array2<bool>, y: isize, x: isize) -> bool {
    let (h, w) = mask.dim();
    y >= 0 && x >= 0 && (y as usize) < h && (x as usize) < w && mask[[y as usize, x as usize]]
}

/// Trace the outer border of every 8-connected foreground region.
///
/// Returns one contour per region as `(x, y)` pixel positions, regions in
/// raster order of their top-left pixel.
pub fn external_contours(mask: &Array2<bool>) -> Vec<Vec<(usize, usize)>> {
    let (h, w) = mask.dim();
    let mut visited = Array2::from_elem((h, w), false);
    let mut contours = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if !mask[[y, x]] || visited[[y, x]] {
                continue;
            }
            contours.push(trace_border(mask, (y as isize, x as isize)));
            fill_region(mask, &mut visited, (y, x));
        }
    }
    contours
}

/// Moore-neighbor tracing from the first pixel of a region in raster order.
fn trace_border(mask: &Array2<bool>, start: (isize, isize)) -> Vec<(usize, usize)> {
    let mut contour = vec![start];
    let mut current = start;
    // The west neighbor of the first raster pixel is always background.
    let mut backtrack = 0usize;
    let mut first_step = None;

    loop {
        let found = (1..=8)
            .map(|i| (backtrack + i) % 8)
            .find(|&d| is_set(mask, current.0 + NEIGHBORS[d].0, current.1 + NEIGHBORS[d].1));
        let Some(d) = found else {
            break;
        };

        let next = (current.0 + NEIGHBORS[d].0, current.1 + NEIGHBORS[d].1);
        if current == start {
            match first_step {
                None => first_step = Some(next),
                Some(step) if step == next => break,
                Some(_) => {}
            }
        }

        let previous = NEIGHBORS[(d + 7) % 8];
        backtrack = neighbor_index(
            current.0 + previous.0 - next.0,
            current.1 + previous.1 - next.1,
        );
        current = next;
        contour.push(current);
    }

    if contour.len() > 1 && contour.last() == contour.first() {
        contour.pop();
    }
    contour
        .into_iter()
        .map(|(y, x)| (x as usize, y as usize))
        .collect()
}

fn fill_region(mask: &Array2<bool>, visited: &mut Array2<bool>, seed: (usize, usize)) {
    let mut stack = vec![seed];
    visited[seed] = true;
    while let Some((y, x)) = stack.pop() {
        for (dy, dx) in NEIGHBORS {
            let (ny, nx) = (y as isize + dy, x as isize + dx);
            if is_set(mask, ny, nx) && !visited[[ny as usize, nx as usize]] {
                visited[[ny as usize, nx as usize]] = true;
                stack.push((ny as usize, nx as usize));
            }
        }
    }
}

/// Convert a mask into flat polygons, offset by `origin`.
///
/// Regions whose contour has fewer than three distinct vertices are dropped.
pub fn mask_to_polygons(mask: &Array2<bool>, origin: (f64, f64)) -> Vec<Vec<f64>> {
    let contours = external_contours(mask);
    let total = contours.len();
    let polygons: Vec<Vec<f64>> = contours
        .into_iter()
        .map(|contour| {
            geometry::flatten_points(
                contour
                    .into_iter()
                    .map(|(x, y)| (x as f64 + origin.0, y as f64 + origin.1)),
            )
        })
        .filter(|flat| !geometry::is_degenerate_contour(flat))
        .collect();

    log::trace!(
        "Extracted {} polygons from {} contours ({} degenerate)",
        polygons.len(),
        total,
        total - polygons.len()
    );
    polygons
}

/// Decode image bytes and convert the mask into polygons.
pub fn image_to_polygons(bytes: &[u8], origin: (f64, f64)) -> Result<Vec<Vec<f64>>, MaskError> {
    let mask = decode_mask(bytes)?;
    Ok(mask_to_polygons(&binarize(&mask, MASK_THRESHOLD), origin))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Encode a boolean grid as an RGBA PNG whose alpha channel is the mask.
    pub(crate) fn mask_png(rows: &[&str]) -> Vec<u8> {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut img = RgbaImage::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let alpha = if c == '#' { 255 } else { 0 };
                img.put_pixel(x as u32, y as u32, Rgba([255, 255, 255, alpha]));
            }
        }
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn grid(rows: &[&str]) -> Array2<bool> {
        let h = rows.len();
        let w = rows[0].len();
        Array2::from_shape_fn((h, w), |(y, x)| rows[y].as_bytes()[x] == b'#')
    }

    #[test]
    fn test_square_contour() {
        let mask = grid(&["....", ".##.", ".##.", "...."]);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0], vec![(1, 1), (2, 1), (2, 2), (1, 2)]);
    }

    #[test]
    fn test_separate_regions() {
        let mask = grid(&["##...", "##...", ".....", "...##", "...##"]);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0][0], (0, 0));
        assert_eq!(contours[1][0], (3, 3));
    }

    #[test]
    fn test_holes_are_not_traced() {
        let mask = grid(&["#####", "#...#", "#...#", "#####"]);
        let contours = external_contours(&mask);
        assert_eq!(contours.len(), 1);
        // Border pixels only, each once.
        assert_eq!(contours[0].len(), 14);
    }

    #[test]
    fn test_degenerate_regions_are_dropped() {
        let mask = grid(&["#....", ".....", "..##.", ".....", "...##", "...##"]);
        let polygons = mask_to_polygons(&mask, (0.0, 0.0));
        // Single pixel and two-pixel line are degenerate; only the square survives.
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0], vec![3.0, 4.0, 4.0, 4.0, 4.0, 5.0, 3.0, 5.0]);
    }

    #[test]
    fn test_origin_offset() {
        let mask = grid(&["##", "##"]);
        let polygons = mask_to_polygons(&mask, (10.0, 20.0));
        assert_eq!(polygons, vec![vec![10.0, 20.0, 11.0, 20.0, 11.0, 21.0, 10.0, 21.0]]);
    }

    #[test]
    fn test_png_alpha_mask() {
        let png = mask_png(&["...", ".##", ".##"]);
        let polygons = image_to_polygons(&png, (0.0, 0.0)).unwrap();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0][..2], [1.0, 1.0]);
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let encoded = STANDARD.encode(b"mask");
        let decoded = decode_base64(&format!("data:image/png;base64,{}", encoded)).unwrap();
        assert_eq!(decoded, b"mask");
    }

    #[test]
    fn test_zlib_payload() {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"bitmap").unwrap();
        let payload = STANDARD.encode(encoder.finish().unwrap());

        assert_eq!(decode_zlib_base64(&payload).unwrap(), b"bitmap");
    }
}
