//! Project media types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{PIXEL_POSTFIX, PLAIN_POSTFIX, VECTOR_POSTFIX};
use crate::model::error::UnknownMediaType;

/// Instance types accepted by vector projects, in schema order.
pub const VECTOR_DISCRIMINANTS: &[&str] = &[
    "point", "polyline", "polygon", "bbox", "ellipse", "template", "cuboid", "rbbox", "tag",
];

/// Instance types accepted by video projects.
pub const VIDEO_DISCRIMINANTS: &[&str] = &["event", "bbox"];

/// Instance types accepted by document projects.
pub const DOCUMENT_DISCRIMINANTS: &[&str] = &["entity"];

/// The kind of media a project annotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Images annotated with vector shapes.
    Vector,
    /// Images annotated with segmentation masks.
    Pixel,
    /// Videos annotated with timelines.
    Video,
    /// Text documents annotated with character spans.
    Document,
}

impl MediaType {
    /// All media types.
    pub fn all() -> &'static [MediaType] {
        &[
            MediaType::Vector,
            MediaType::Pixel,
            MediaType::Video,
            MediaType::Document,
        ]
    }

    /// Lowercase name used in configuration and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            MediaType::Vector => "vector",
            MediaType::Pixel => "pixel",
            MediaType::Video => "video",
            MediaType::Document => "document",
        }
    }

    /// Instance type names this media type accepts. Pixel instances are untyped.
    pub fn discriminants(&self) -> &'static [&'static str] {
        match self {
            MediaType::Vector => VECTOR_DISCRIMINANTS,
            MediaType::Video => VIDEO_DISCRIMINANTS,
            MediaType::Document => DOCUMENT_DISCRIMINANTS,
            MediaType::Pixel => &[],
        }
    }

    /// File name postfix of per-item annotation files.
    pub fn file_postfix(&self) -> &'static str {
        match self {
            MediaType::Vector => VECTOR_POSTFIX,
            MediaType::Pixel => PIXEL_POSTFIX,
            MediaType::Video | MediaType::Document => PLAIN_POSTFIX,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vector" => Ok(MediaType::Vector),
            "pixel" => Ok(MediaType::Pixel),
            "video" => Ok(MediaType::Video),
            "document" => Ok(MediaType::Document),
            _ => Err(UnknownMediaType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_type() {
        assert_eq!("Vector".parse::<MediaType>(), Ok(MediaType::Vector));
        assert_eq!(" video ".parse::<MediaType>(), Ok(MediaType::Video));
        assert!("audio".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_discriminants() {
        assert!(MediaType::Vector.discriminants().contains(&"rbbox"));
        assert_eq!(MediaType::Video.discriminants(), &["event", "bbox"]);
        assert!(MediaType::Pixel.discriminants().is_empty());
    }

    #[test]
    fn test_file_postfix() {
        assert_eq!(MediaType::Vector.file_postfix(), "___objects.json");
        assert_eq!(MediaType::Pixel.file_postfix(), "___pixel.json");
    }
}
