//! Coordinate utilities shared by all format strategies.

use crate::constants::MIN_POLYGON_VERTICES;

/// Axis-aligned box as `(xmin, ymin, xmax, ymax)`.
pub type BoxCoords = [f64; 4];

/// Normalize two corner points into `(xmin, ymin, xmax, ymax)`.
///
/// The corners may be given in any order. Non-finite corners are returned
/// unchanged so they are rejected downstream instead of being absorbed by
/// `min`/`max`.
pub fn normalize_bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoxCoords {
    if ![x1, y1, x2, y2].iter().all(|c| c.is_finite()) {
        return [x1, y1, x2, y2];
    }
    [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]
}

/// Box from a top-left corner and a size. Negative sizes are flipped.
pub fn bbox_from_xywh(x: f64, y: f64, width: f64, height: f64) -> BoxCoords {
    normalize_bbox(x, y, x + width, y + height)
}

/// Smallest box enclosing a flat `[x1, y1, x2, y2, ...]` coordinate list.
///
/// `None` for an empty list or one holding a non-finite value.
pub fn bounding_box(flat: &[f64]) -> Option<BoxCoords> {
    if flat.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let mut points = flat.chunks_exact(2);
    let first = points.next()?;
    let init = [first[0], first[1], first[0], first[1]];
    Some(points.fold(init, |[x0, y0, x1, y1], p| {
        [x0.min(p[0]), y0.min(p[1]), x1.max(p[0]), y1.max(p[1])]
    }))
}

/// The four corners of a box as a flat polygon, clockwise from the top-left.
pub fn bbox_to_polygon(b: BoxCoords) -> Vec<f64> {
    vec![b[0], b[1], b[2], b[1], b[2], b[3], b[0], b[3]]
}

/// Intersection over union of two axis-aligned boxes.
///
/// Returns 0 for disjoint boxes and for two zero-area boxes.
pub fn iou(a: BoxCoords, b: BoxCoords) -> f64 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = ix * iy;

    let area = |r: BoxCoords| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Flatten a point list into `[x1, y1, x2, y2, ...]`.
pub fn flatten_points<I>(points: I) -> Vec<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    points.into_iter().flat_map(|(x, y)| [x, y]).collect()
}

/// Number of distinct vertices in a flat coordinate list.
pub fn distinct_vertices(flat: &[f64]) -> usize {
    let mut seen: Vec<(u64, u64)> = Vec::with_capacity(flat.len() / 2);
    for p in flat.chunks_exact(2) {
        let key = (p[0].to_bits(), p[1].to_bits());
        if !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen.len()
}

/// Whether a flat contour carries too little geometry to form a polygon.
pub fn is_degenerate_contour(flat: &[f64]) -> bool {
    flat.len() % 2 != 0 || distinct_vertices(flat) < MIN_POLYGON_VERTICES
}

/// Convert normalized `[0, 1]` coordinates to pixels.
pub fn denormalize(flat: &[f64], width: u32, height: u32) -> Vec<f64> {
    flat.chunks_exact(2)
        .flat_map(|p| [p[0] * f64::from(width), p[1] * f64::from(height)])
        .collect()
}

/// Convert a normalized YOLO box (center and size) to pixel `(xmin, ymin, xmax, ymax)`.
pub fn yolo_to_bbox(x_center: f64, y_center: f64, w: f64, h: f64, width: u32, height: u32) -> BoxCoords {
    let (iw, ih) = (f64::from(width), f64::from(height));
    let half_w = w * iw / 2.0;
    let half_h = h * ih / 2.0;
    normalize_bbox(
        (x_center * iw - half_w).max(0.0),
        (y_center * ih - half_h).max(0.0),
        x_center * iw + half_w,
        y_center * ih + half_h,
    )
}
