//! Static schema tables for the four media types.
//!
//! A schema is a list of [`Field`]s, each with a [`Kind`]. Instance schemas
//! of vector, video and document media are split into fields common to every
//! instance and per-variant fields selected through a [`DiscriminantMap`].

use indexmap::IndexMap;

use crate::model::{ITEM_STATUSES, MediaType};

/// Expected shape of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Any,
    String,
    Bool,
    Number,
    /// Non-negative integer.
    Integer,
    /// Non-negative integer no larger than `u32::MAX`.
    U32,
    /// `#rrggbb` string.
    Color,
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
    /// Flat number array with at least `min` elements, optionally an even count.
    Coords { min: usize, even: bool },
    Array(&'static Kind),
    Object(&'static [Field]),
    /// Object keyed by non-negative integer timestamps.
    Timeline(&'static Kind),
}

impl Kind {
    /// JSON type name used in messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Kind::Any => "any value",
            Kind::String | Kind::Color | Kind::Enum(_) => "string",
            Kind::Bool => "boolean",
            Kind::Number => "number",
            Kind::Integer | Kind::U32 => "integer",
            Kind::Coords { .. } | Kind::Array(_) => "array",
            Kind::Object(_) | Kind::Timeline(_) => "object",
        }
    }
}

/// A named field of an object schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Cross-field constraint of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The first integer field must not exceed the second.
    Ordered(&'static str, &'static str),
}

/// Fields and rules of one discriminant value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub fields: Vec<Field>,
    pub rules: Vec<Rule>,
}

/// Maps the values of a discriminant field to variant schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminantMap {
    /// Name of the discriminant field.
    pub field: &'static str,
    /// Variant used when the discriminant is absent.
    pub default: Option<&'static str>,
    variants: IndexMap<String, Variant>,
}

impl DiscriminantMap {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            default: None,
            variants: IndexMap::new(),
        }
    }

    pub fn with_default(mut self, name: &'static str) -> Self {
        self.default = Some(name);
        self
    }

    /// Add or replace a variant.
    pub fn register(&mut self, name: impl Into<String>, fields: &[Field], rules: &[Rule]) {
        self.variants.insert(
            name.into(),
            Variant {
                fields: fields.to_vec(),
                rules: rules.to_vec(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.variants.get(name)
    }

    /// Registered discriminant values, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.variants.keys().map(String::as_str).collect()
    }

    /// Whether `key` is a field of some variant other than `name` but not of `name`.
    pub fn is_foreign(&self, name: &str, key: &str) -> bool {
        let own = self
            .variants
            .get(name)
            .is_some_and(|v| v.fields.iter().any(|f| f.name == key));
        !own && self
            .variants
            .iter()
            .any(|(other, v)| other != name && v.fields.iter().any(|f| f.name == key))
    }
}

/// Complete schema of one media type.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSchema {
    /// Top-level fields other than `instances`.
    pub document: &'static [Field],
    /// Fields shared by every instance.
    pub instance: &'static [Field],
    /// Variant dispatch, absent for untyped (pixel) instances.
    pub variants: Option<DiscriminantMap>,
}

// Shared pieces.

const ATTRIBUTE: &[Field] = &[
    Field::required("name", Kind::String),
    Field::required("groupName", Kind::String),
];
const ATTRIBUTES: Kind = Kind::Array(&Kind::Object(ATTRIBUTE));

const COMMENT_ENTRY: &[Field] = &[
    Field::required("text", Kind::String),
    Field::optional("email", Kind::String),
];
const COMMENT: &[Field] = &[
    Field::optional("x", Kind::Number),
    Field::optional("y", Kind::Number),
    Field::optional("resolved", Kind::Bool),
    Field::required("correspondence", Kind::Array(&Kind::Object(COMMENT_ENTRY))),
];

const BBOX_POINTS: &[Field] = &[
    Field::required("x1", Kind::Number),
    Field::required("y1", Kind::Number),
    Field::required("x2", Kind::Number),
    Field::required("y2", Kind::Number),
];

const VERTEX: &[Field] = &[
    Field::required("x", Kind::Number),
    Field::required("y", Kind::Number),
];

// Metadata.

const IMAGE_METADATA: &[Field] = &[
    Field::required("name", Kind::String),
    Field::optional("width", Kind::U32),
    Field::optional("height", Kind::U32),
    Field::optional("status", Kind::Enum(ITEM_STATUSES)),
    Field::optional("pinned", Kind::Bool),
    Field::optional("url", Kind::String),
];

const VIDEO_METADATA: &[Field] = &[
    Field::required("name", Kind::String),
    Field::optional("width", Kind::U32),
    Field::optional("height", Kind::U32),
    Field::optional("duration", Kind::Integer),
    Field::optional("status", Kind::Enum(ITEM_STATUSES)),
    Field::optional("url", Kind::String),
];

const TEXT_METADATA: &[Field] = &[
    Field::required("name", Kind::String),
    Field::optional("status", Kind::Enum(ITEM_STATUSES)),
    Field::optional("url", Kind::String),
];

const IMAGE_DOCUMENT: &[Field] = &[
    Field::required("metadata", Kind::Object(IMAGE_METADATA)),
    Field::optional("tags", Kind::Array(&Kind::String)),
    Field::optional("comments", Kind::Array(&Kind::Object(COMMENT))),
];

const VIDEO_DOCUMENT: &[Field] = &[
    Field::required("metadata", Kind::Object(VIDEO_METADATA)),
    Field::optional("tags", Kind::Array(&Kind::String)),
    Field::optional("comments", Kind::Array(&Kind::Object(COMMENT))),
];

const TEXT_DOCUMENT: &[Field] = &[
    Field::required("metadata", Kind::Object(TEXT_METADATA)),
    Field::optional("tags", Kind::Array(&Kind::String)),
    Field::optional("comments", Kind::Array(&Kind::Object(COMMENT))),
];

// Vector instances.

const VECTOR_COMMON: &[Field] = &[
    Field::optional("className", Kind::String),
    Field::optional("classId", Kind::U32),
    Field::optional("attributes", ATTRIBUTES),
    Field::optional("probability", Kind::Number),
    Field::optional("visible", Kind::Bool),
    Field::optional("locked", Kind::Bool),
];

const POINT: &[Field] = &[
    Field::required("x", Kind::Number),
    Field::required("y", Kind::Number),
];
const POLYLINE: &[Field] = &[Field::required("points", Kind::Coords { min: 4, even: true })];
const POLYGON: &[Field] = &[Field::required("points", Kind::Coords { min: 6, even: true })];
const BBOX: &[Field] = &[Field::required("points", Kind::Object(BBOX_POINTS))];
const ELLIPSE: &[Field] = &[
    Field::required("cx", Kind::Number),
    Field::required("cy", Kind::Number),
    Field::required("rx", Kind::Number),
    Field::required("ry", Kind::Number),
    Field::required("angle", Kind::Number),
];

const TEMPLATE_POINT: &[Field] = &[
    Field::required("x", Kind::Number),
    Field::required("y", Kind::Number),
    Field::required("id", Kind::U32),
];
const TEMPLATE_CONNECTION: &[Field] = &[
    Field::optional("id", Kind::U32),
    Field::required("from", Kind::U32),
    Field::required("to", Kind::U32),
];
const TEMPLATE: &[Field] = &[
    Field::required("points", Kind::Array(&Kind::Object(TEMPLATE_POINT))),
    Field::optional("connections", Kind::Array(&Kind::Object(TEMPLATE_CONNECTION))),
    Field::optional("templateName", Kind::String),
];

const CUBOID_POINTS: &[Field] = &[
    Field::required("f1", Kind::Object(VERTEX)),
    Field::required("f2", Kind::Object(VERTEX)),
    Field::required("r1", Kind::Object(VERTEX)),
    Field::required("r2", Kind::Object(VERTEX)),
];
const CUBOID: &[Field] = &[Field::required("points", Kind::Object(CUBOID_POINTS))];

const RBBOX_POINTS: &[Field] = &[
    Field::required("x1", Kind::Number),
    Field::required("y1", Kind::Number),
    Field::required("x2", Kind::Number),
    Field::required("y2", Kind::Number),
    Field::required("x3", Kind::Number),
    Field::required("y3", Kind::Number),
    Field::required("x4", Kind::Number),
    Field::required("y4", Kind::Number),
];
const RBBOX: &[Field] = &[Field::required("points", Kind::Object(RBBOX_POINTS))];

// Video instances.

const VIDEO_COMMON: &[Field] = &[
    Field::optional("className", Kind::String),
    Field::optional("classId", Kind::U32),
    Field::optional("start", Kind::Integer),
    Field::optional("end", Kind::Integer),
    Field::optional("attributes", ATTRIBUTES),
];

const BBOX_STATE: &[Field] = &[
    Field::required("points", Kind::Object(BBOX_POINTS)),
    Field::optional("active", Kind::Bool),
    Field::optional("attributes", ATTRIBUTES),
];
const EVENT_STATE: &[Field] = &[
    Field::optional("active", Kind::Bool),
    Field::optional("attributes", ATTRIBUTES),
];
const VIDEO_BBOX: &[Field] = &[Field::required("timeline", Kind::Timeline(&Kind::Object(BBOX_STATE)))];
const VIDEO_EVENT: &[Field] = &[Field::required("timeline", Kind::Timeline(&Kind::Object(EVENT_STATE)))];

// Document instances.

const DOCUMENT_COMMON: &[Field] = &[
    Field::optional("className", Kind::String),
    Field::optional("classId", Kind::U32),
    Field::optional("attributes", ATTRIBUTES),
];
const ENTITY: &[Field] = &[
    Field::required("start", Kind::Integer),
    Field::required("end", Kind::Integer),
];

// Pixel instances.

const PIXEL_PART: &[Field] = &[Field::required("color", Kind::Color)];
const PIXEL_INSTANCE: &[Field] = &[
    Field::optional("className", Kind::String),
    Field::optional("classId", Kind::U32),
    Field::required("parts", Kind::Array(&Kind::Object(PIXEL_PART))),
    Field::optional("attributes", ATTRIBUTES),
];

/// Name of the discriminant field of typed instances.
pub const DISCRIMINANT_FIELD: &str = "type";

/// Built-in schema of a media type.
pub fn builtin(media_type: MediaType) -> MediaSchema {
    match media_type {
        MediaType::Vector => {
            let mut variants = DiscriminantMap::new(DISCRIMINANT_FIELD);
            let tables: [(&str, &[Field]); 9] = [
                ("point", POINT),
                ("polyline", POLYLINE),
                ("polygon", POLYGON),
                ("bbox", BBOX),
                ("ellipse", ELLIPSE),
                ("template", TEMPLATE),
                ("cuboid", CUBOID),
                ("rbbox", RBBOX),
                ("tag", &[]),
            ];
            for (name, fields) in tables {
                variants.register(name, fields, &[]);
            }
            MediaSchema {
                document: IMAGE_DOCUMENT,
                instance: VECTOR_COMMON,
                variants: Some(variants),
            }
        }
        MediaType::Video => {
            let mut variants = DiscriminantMap::new(DISCRIMINANT_FIELD);
            variants.register("event", VIDEO_EVENT, &[]);
            variants.register("bbox", VIDEO_BBOX, &[]);
            MediaSchema {
                document: VIDEO_DOCUMENT,
                instance: VIDEO_COMMON,
                variants: Some(variants),
            }
        }
        MediaType::Document => {
            let mut variants = DiscriminantMap::new(DISCRIMINANT_FIELD).with_default("entity");
            variants.register("entity", ENTITY, &[Rule::Ordered("start", "end")]);
            MediaSchema {
                document: TEXT_DOCUMENT,
                instance: DOCUMENT_COMMON,
                variants: Some(variants),
            }
        }
        MediaType::Pixel => MediaSchema {
            document: IMAGE_DOCUMENT,
            instance: PIXEL_INSTANCE,
            variants: None,
        },
    }
}
