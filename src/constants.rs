//! Global constants for annotation file layout.

/// Folder (under the output directory) holding the classes document.
pub const CLASSES_DIR: &str = "classes";

/// File name of the canonical classes document.
pub const CLASSES_FILE: &str = "classes.json";

/// Postfix appended to the item name for vector annotation files.
pub const VECTOR_POSTFIX: &str = "___objects.json";

/// Postfix appended to the item name for pixel annotation files.
pub const PIXEL_POSTFIX: &str = "___pixel.json";

/// Postfix appended to the item name for video and document annotation files.
pub const PLAIN_POSTFIX: &str = ".json";

/// Image extensions searched when a format needs the dimensions of a referenced image.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "JPG", "JPEG", "PNG"];

/// Minimum number of distinct vertices a contour needs to become a polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;
