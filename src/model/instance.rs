//! Canonical instance types, one closed sum type per media type.
//!
//! Every instance carries the attributes attached to it, an optional class
//! reference, and exactly the geometry fields its `type` requires.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geometry::{self, BoxCoords};
use crate::model::error::ModelError;
use crate::model::media::MediaType;

/// Reference from an instance to an attribute of its class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceAttribute {
    /// Attribute name.
    pub name: String,

    /// Name of the attribute group the attribute belongs to.
    #[serde(rename = "groupName")]
    pub group_name: String,
}

impl InstanceAttribute {
    /// Create a new attribute reference.
    pub fn new(name: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_name: group_name.into(),
        }
    }
}

/// Box corners, always stored with `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BboxPoints {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BboxPoints {
    /// Build from two corners given in any order.
    pub fn normalized(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::from_box(geometry::normalize_bbox(x1, y1, x2, y2))
    }

    /// Build from an already normalized box.
    pub fn from_box(b: BoxCoords) -> Self {
        Self {
            x1: b[0],
            y1: b[1],
            x2: b[2],
            y2: b[3],
        }
    }

    /// Corners as `(xmin, ymin, xmax, ymax)`.
    pub fn as_box(&self) -> BoxCoords {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

/// Front and rear faces of a cuboid, two opposite corners each.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuboidPoints {
    pub f1: Vertex,
    pub f2: Vertex,
    pub r1: Vertex,
    pub r2: Vertex,
}

/// The four corners of a rotated box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RbboxPoints {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub x3: f64,
    pub y3: f64,
    pub x4: f64,
    pub y4: f64,
}

/// A keypoint of a template instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemplatePoint {
    pub x: f64,
    pub y: f64,
    pub id: u32,
}

/// An edge between two template keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConnection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub from: u32,
    pub to: u32,
}

/// Geometry of a vector instance, selected by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VectorGeometry {
    /// Single keypoint.
    Point { x: f64, y: f64 },

    /// Open line through `[x1, y1, x2, y2, ...]`.
    Polyline { points: Vec<f64> },

    /// Closed contour `[x1, y1, x2, y2, ...]`.
    Polygon { points: Vec<f64> },

    /// Axis-aligned box.
    Bbox { points: BboxPoints },

    /// Rotated ellipse; `angle` in degrees.
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        angle: f64,
    },

    /// Keypoint skeleton.
    Template {
        points: Vec<TemplatePoint>,
        #[serde(default)]
        connections: Vec<TemplateConnection>,
        #[serde(
            rename = "templateName",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        template_name: Option<String>,
    },

    /// Pseudo-3D box.
    Cuboid { points: CuboidPoints },

    /// Rotated box.
    Rbbox { points: RbboxPoints },

    /// Whole-image tag without geometry.
    Tag,
}

impl VectorGeometry {
    /// The `type` value of this geometry.
    pub fn discriminant(&self) -> &'static str {
        match self {
            VectorGeometry::Point { .. } => "point",
            VectorGeometry::Polyline { .. } => "polyline",
            VectorGeometry::Polygon { .. } => "polygon",
            VectorGeometry::Bbox { .. } => "bbox",
            VectorGeometry::Ellipse { .. } => "ellipse",
            VectorGeometry::Template { .. } => "template",
            VectorGeometry::Cuboid { .. } => "cuboid",
            VectorGeometry::Rbbox { .. } => "rbbox",
            VectorGeometry::Tag => "tag",
        }
    }

    /// Box geometry with min/max coercion of the corners.
    pub fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        VectorGeometry::Bbox {
            points: BboxPoints::normalized(x1, y1, x2, y2),
        }
    }

    /// Build geometry of the given type from a flat coordinate list.
    ///
    /// Arity per type: point 2, bbox 4, ellipse 5 (`cx cy rx ry angle`),
    /// rbbox 8, cuboid 8 (`f1 f2 r1 r2`), polyline an even count of at least 4,
    /// polygon an even count of at least 6, template an even count of at least 2
    /// (keypoints numbered from 1, no connections), tag none.
    /// Every coordinate must be finite.
    pub fn from_coords(discriminant: &str, coords: &[f64]) -> Result<Self, ModelError> {
        if let Some(bad) = coords.iter().find(|c| !c.is_finite()) {
            return Err(ModelError::geometry_mismatch(
                discriminant,
                format!("non-finite coordinate {}", bad),
            ));
        }
        let exact = |n: usize| {
            if coords.len() == n {
                Ok(())
            } else {
                Err(ModelError::geometry_mismatch(
                    discriminant,
                    format!("expected {} coordinates, got {}", n, coords.len()),
                ))
            }
        };
        let even_at_least = |n: usize| {
            if coords.len() >= n && coords.len() % 2 == 0 {
                Ok(())
            } else {
                Err(ModelError::geometry_mismatch(
                    discriminant,
                    format!(
                        "expected an even number of at least {} coordinates, got {}",
                        n,
                        coords.len()
                    ),
                ))
            }
        };
        let c = coords;

        let geometry = match discriminant {
            "point" => {
                exact(2)?;
                VectorGeometry::Point { x: c[0], y: c[1] }
            }
            "polyline" => {
                even_at_least(4)?;
                VectorGeometry::Polyline { points: c.to_vec() }
            }
            "polygon" => {
                even_at_least(6)?;
                VectorGeometry::Polygon { points: c.to_vec() }
            }
            "bbox" => {
                exact(4)?;
                VectorGeometry::bbox(c[0], c[1], c[2], c[3])
            }
            "ellipse" => {
                exact(5)?;
                VectorGeometry::Ellipse {
                    cx: c[0],
                    cy: c[1],
                    rx: c[2],
                    ry: c[3],
                    angle: c[4],
                }
            }
            "template" => {
                even_at_least(2)?;
                let points = c
                    .chunks_exact(2)
                    .zip(1u32..)
                    .map(|(p, id)| TemplatePoint { x: p[0], y: p[1], id })
                    .collect();
                VectorGeometry::Template {
                    points,
                    connections: Vec::new(),
                    template_name: None,
                }
            }
            "cuboid" => {
                exact(8)?;
                let v = |i: usize| Vertex { x: c[i], y: c[i + 1] };
                VectorGeometry::Cuboid {
                    points: CuboidPoints {
                        f1: v(0),
                        f2: v(2),
                        r1: v(4),
                        r2: v(6),
                    },
                }
            }
            "rbbox" => {
                exact(8)?;
                VectorGeometry::Rbbox {
                    points: RbboxPoints {
                        x1: c[0],
                        y1: c[1],
                        x2: c[2],
                        y2: c[3],
                        x3: c[4],
                        y3: c[5],
                        x4: c[6],
                        y4: c[7],
                    },
                }
            }
            "tag" => {
                exact(0)?;
                VectorGeometry::Tag
            }
            other => return Err(ModelError::unknown_discriminant(other, MediaType::Vector)),
        };
        Ok(geometry)
    }
}

/// An instance on a vector image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorInstance {
    #[serde(flatten)]
    pub geometry: VectorGeometry,

    #[serde(rename = "className", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(rename = "classId", default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,

    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl VectorInstance {
    /// Create an instance without class or attributes.
    pub fn new(geometry: VectorGeometry) -> Self {
        Self {
            geometry,
            class_name: None,
            class_id: None,
            attributes: Vec::new(),
            probability: None,
            visible: None,
            locked: None,
        }
    }

    /// Attach a class reference.
    pub fn with_class(mut self, id: u32, name: impl Into<String>) -> Self {
        self.class_id = Some(id);
        self.class_name = Some(name.into());
        self
    }

    /// Attach attribute references.
    pub fn with_attributes(mut self, attributes: Vec<InstanceAttribute>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Position on a video timeline, in microseconds.
///
/// Serialized as a string so it can key a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer timestamp")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
                Ok(Timestamp(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
                u64::try_from(v)
                    .map(Timestamp)
                    .map_err(|_| E::custom("timestamp must not be negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
                v.parse()
                    .map(Timestamp)
                    .map_err(|_| E::custom(format!("invalid timestamp '{}'", v)))
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

/// State of a video box at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BboxState {
    pub points: BboxPoints,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
}

/// State of a video event at one timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
}

/// Timeline of a video instance, selected by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VideoTrack {
    /// A box moving over time.
    Bbox {
        timeline: BTreeMap<Timestamp, BboxState>,
    },
    /// A time span without geometry.
    Event {
        timeline: BTreeMap<Timestamp, EventState>,
    },
}

impl VideoTrack {
    /// The `type` value of this track.
    pub fn discriminant(&self) -> &'static str {
        match self {
            VideoTrack::Bbox { .. } => "bbox",
            VideoTrack::Event { .. } => "event",
        }
    }
}

/// An instance on a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInstance {
    #[serde(flatten)]
    pub track: VideoTrack,

    #[serde(rename = "className", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(rename = "classId", default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,

    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
}

/// The only document instance type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Entity,
}

/// A character span in a text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInstance {
    #[serde(rename = "type", default)]
    pub kind: EntityKind,

    pub start: u64,

    pub end: u64,

    #[serde(rename = "className", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(rename = "classId", default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,

    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
}

/// One colored part of a pixel mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPart {
    pub color: String,
}

/// A mask instance on a pixel image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelInstance {
    #[serde(rename = "className", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(rename = "classId", default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,

    pub parts: Vec<PixelPart>,

    #[serde(default)]
    pub attributes: Vec<InstanceAttribute>,
}

/// An instance of any media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Instance {
    Vector(VectorInstance),
    Video(VideoInstance),
    Document(DocumentInstance),
    Pixel(PixelInstance),
}

impl Instance {
    /// Build an instance from its type name and flat coordinates.
    ///
    /// Vector types follow [`VectorGeometry::from_coords`]. A video `bbox` takes
    /// 4 coordinates and becomes a single active state at timestamp 0; a video
    /// `event` takes none. A document `entity` takes `[start, end]`. Pixel
    /// instances are part based and have no type, so every name is rejected.
    pub fn of(
        media_type: MediaType,
        discriminant: &str,
        coords: &[f64],
        attributes: Vec<InstanceAttribute>,
    ) -> Result<Self, ModelError> {
        if !media_type.discriminants().contains(&discriminant) {
            return Err(ModelError::unknown_discriminant(discriminant, media_type));
        }
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::geometry_mismatch(discriminant, "non-finite coordinate"));
        }

        match media_type {
            MediaType::Vector => {
                let geometry = VectorGeometry::from_coords(discriminant, coords)?;
                Ok(Instance::Vector(
                    VectorInstance::new(geometry).with_attributes(attributes),
                ))
            }
            MediaType::Video => Self::video_of(discriminant, coords, attributes),
            MediaType::Document => {
                let &[start, end] = coords else {
                    return Err(ModelError::geometry_mismatch(
                        discriminant,
                        format!("expected 2 offsets, got {}", coords.len()),
                    ));
                };
                if start < 0.0 || end < start || start.fract() != 0.0 || end.fract() != 0.0 {
                    return Err(ModelError::geometry_mismatch(
                        discriminant,
                        "offsets must be non-negative integers with start <= end",
                    ));
                }
                Ok(Instance::Document(DocumentInstance {
                    kind: EntityKind::Entity,
                    start: start as u64,
                    end: end as u64,
                    class_name: None,
                    class_id: None,
                    attributes,
                }))
            }
            MediaType::Pixel => Err(ModelError::unknown_discriminant(discriminant, media_type)),
        }
    }

    fn video_of(
        discriminant: &str,
        coords: &[f64],
        attributes: Vec<InstanceAttribute>,
    ) -> Result<Self, ModelError> {
        let track = match (discriminant, coords) {
            ("bbox", &[x1, y1, x2, y2]) => {
                let state = BboxState {
                    points: BboxPoints::normalized(x1, y1, x2, y2),
                    active: Some(true),
                    attributes: Vec::new(),
                };
                VideoTrack::Bbox {
                    timeline: BTreeMap::from([(Timestamp(0), state)]),
                }
            }
            ("event", &[]) => {
                let state = EventState {
                    active: Some(true),
                    attributes: Vec::new(),
                };
                VideoTrack::Event {
                    timeline: BTreeMap::from([(Timestamp(0), state)]),
                }
            }
            _ => {
                return Err(ModelError::geometry_mismatch(
                    discriminant,
                    format!("unexpected coordinate count {}", coords.len()),
                ));
            }
        };
        Ok(Instance::Video(VideoInstance {
            track,
            class_name: None,
            class_id: None,
            start: None,
            end: None,
            attributes,
        }))
    }
}
