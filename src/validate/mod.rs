//! Structural validator for canonical annotation documents.
//!
//! Validation walks a parsed JSON document against the schema of its media
//! type and collects every defect instead of stopping at the first. Typed
//! instances dispatch on their `type` field through a [`DiscriminantMap`], so
//! new variants are added by registering a field table.
//!
//! ```rust,ignore
//! use annorm::validate::Validator;
//! use annorm::model::MediaType;
//!
//! let result = Validator::new().validate(&document, MediaType::Vector);
//! if !result.is_valid() {
//!     eprintln!("{}", result.report());
//! }
//! ```

mod error;
mod schema;

pub use error::{FieldPath, PathSegment, ValidationError, ValidationErrorKind, json_type};
pub use schema::{DISCRIMINANT_FIELD, DiscriminantMap, Field, Kind, MediaSchema, Rule, Variant};

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};

use crate::model::{MediaType, NormalizedDocument, UnknownMediaType};

/// Validates documents of all four media types.
#[derive(Debug, Clone)]
pub struct Validator {
    vector: MediaSchema,
    pixel: MediaSchema,
    video: MediaSchema,
    document: MediaSchema,
}

impl Validator {
    /// Create a validator with the built-in schemas.
    pub fn new() -> Self {
        Self {
            vector: schema::builtin(MediaType::Vector),
            pixel: schema::builtin(MediaType::Pixel),
            video: schema::builtin(MediaType::Video),
            document: schema::builtin(MediaType::Document),
        }
    }

    /// The schema used for a media type.
    pub fn schema(&self, media_type: MediaType) -> &MediaSchema {
        match media_type {
            MediaType::Vector => &self.vector,
            MediaType::Pixel => &self.pixel,
            MediaType::Video => &self.video,
            MediaType::Document => &self.document,
        }
    }

    /// Register an instance variant under a discriminant value.
    ///
    /// Returns `false` for media types whose instances are untyped.
    pub fn register_variant(&mut self, media_type: MediaType, name: &str, fields: &[Field]) -> bool {
        let schema = match media_type {
            MediaType::Vector => &mut self.vector,
            MediaType::Pixel => &mut self.pixel,
            MediaType::Video => &mut self.video,
            MediaType::Document => &mut self.document,
        };
        match schema.variants.as_mut() {
            Some(variants) => {
                variants.register(name, fields, &[]);
                log::debug!("Registered '{}' instances for {} media", name, media_type);
                true
            }
            None => false,
        }
    }

    /// Validate a document given the media type by name.
    pub fn validate_named(
        &self,
        document: &Value,
        media_type: &str,
    ) -> Result<ValidationResult, UnknownMediaType> {
        let media_type: MediaType = media_type.parse()?;
        Ok(self.validate(document, media_type))
    }

    /// Validate a document, collecting every defect.
    pub fn validate(&self, document: &Value, media_type: MediaType) -> ValidationResult {
        let schema = self.schema(media_type);
        let mut errors = Vec::new();
        let root = FieldPath::root();

        let Some(object) = document.as_object() else {
            errors.push(ValidationError::type_mismatch(root, "object", document));
            return ValidationResult::invalid(errors);
        };

        check_fields(object, schema.document, &root, &mut errors);

        match object.get("instances") {
            None => {}
            Some(Value::Array(instances)) => {
                let path = root.key("instances");
                for (i, instance) in instances.iter().enumerate() {
                    check_instance(instance, schema, &path.index(i), &mut errors);
                }
            }
            Some(other) => {
                errors.push(ValidationError::type_mismatch(root.key("instances"), "array", other));
            }
        }

        if !errors.is_empty() {
            log::debug!("{} document has {} defects", media_type, errors.len());
            return ValidationResult::invalid(errors);
        }

        let normalized = match NormalizedDocument::from_value(document.clone(), media_type) {
            Ok(normalized) => Some(normalized),
            Err(e) => {
                // Variants registered at runtime have no typed counterpart.
                log::debug!("Valid {} document has no typed form: {}", media_type, e);
                None
            }
        };
        ValidationResult { errors, normalized }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of validating one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,

    /// Typed document, present when the document is valid.
    pub normalized: Option<NormalizedDocument>,
}

impl ValidationResult {
    fn invalid(errors: Vec<ValidationError>) -> Self {
        Self {
            errors,
            normalized: None,
        }
    }

    /// True iff no defect was found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors of one kind.
    pub fn errors_of(&self, kind: ValidationErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// One line per error, paths left-aligned in a fixed-width column.
    pub fn report(&self) -> String {
        let paths: Vec<String> = self.errors.iter().map(|e| e.path.to_string()).collect();
        let width = paths.iter().map(String::len).max().unwrap_or(0);
        paths
            .iter()
            .zip(&self.errors)
            .map(|(path, e)| format!("{:<width$}  {}", path, e.message, width = width))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.normalized.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ValidationResult", len)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        if let Some(normalized) = &self.normalized {
            state.serialize_field("normalized", normalized)?;
        }
        state.end()
    }
}

fn check_instance(value: &Value, schema: &MediaSchema, path: &FieldPath, errors: &mut Vec<ValidationError>) {
    let Some(instance) = value.as_object() else {
        errors.push(ValidationError::type_mismatch(path.clone(), "object", value));
        return;
    };
    check_fields(instance, schema.instance, path, errors);

    let Some(variants) = &schema.variants else {
        return;
    };
    let type_path = path.key(variants.field);
    let expected = || variants.names().join(", ");
    let invalid = |message: String| {
        ValidationError::new(type_path.clone(), ValidationErrorKind::InvalidDiscriminant, message)
    };

    let name = match instance.get(variants.field) {
        Some(Value::String(name)) => name.as_str(),
        None => match variants.default {
            Some(default) => default,
            None => {
                errors.push(invalid(format!("missing instance type, expected one of: {}", expected())));
                return;
            }
        },
        Some(other) => {
            errors.push(invalid(format!(
                "instance type must be a string, found {} (expected one of: {})",
                json_type(other),
                expected()
            )));
            return;
        }
    };

    let Some(variant) = variants.get(name) else {
        errors.push(invalid(format!(
            "unknown instance type '{}', expected one of: {}",
            name,
            expected()
        )));
        return;
    };

    check_fields(instance, &variant.fields, path, errors);
    for rule in &variant.rules {
        check_rule(instance, *rule, path, errors);
    }

    for key in instance.keys() {
        let common = schema.instance.iter().any(|f| f.name == key);
        if !common && variants.is_foreign(name, key) {
            errors.push(ValidationError::new(
                path.key(key.as_str()),
                ValidationErrorKind::UnexpectedField,
                format!("field does not belong to '{}' instances", name),
            ));
        }
    }
}

fn check_rule(instance: &Map<String, Value>, rule: Rule, path: &FieldPath, errors: &mut Vec<ValidationError>) {
    match rule {
        Rule::Ordered(first, second) => {
            let a = instance.get(first).and_then(Value::as_u64);
            let b = instance.get(second).and_then(Value::as_u64);
            if let Some((a, b)) = a.zip(b).filter(|(a, b)| a > b) {
                errors.push(ValidationError::invalid_value(
                    path.key(second),
                    format!("'{}' ({}) must not be less than '{}' ({})", second, b, first, a),
                ));
            }
        }
    }
}

fn check_fields(object: &Map<String, Value>, fields: &[Field], path: &FieldPath, errors: &mut Vec<ValidationError>) {
    for field in fields {
        match object.get(field.name) {
            Some(value) => check_kind(value, &field.kind, &path.key(field.name), errors),
            None if field.required => errors.push(ValidationError::missing(path.key(field.name))),
            None => {}
        }
    }
}

fn check_kind(value: &Value, kind: &Kind, path: &FieldPath, errors: &mut Vec<ValidationError>) {
    let mismatch = || ValidationError::type_mismatch(path.clone(), kind.type_name(), value);

    match kind {
        Kind::Any => {}
        Kind::String => {
            if !value.is_string() {
                errors.push(mismatch());
            }
        }
        Kind::Bool => {
            if !value.is_boolean() {
                errors.push(mismatch());
            }
        }
        Kind::Number => {
            if !value.is_number() {
                errors.push(mismatch());
            }
        }
        Kind::Integer => match value {
            Value::Number(n) if n.is_u64() => {}
            Value::Number(n) => errors.push(ValidationError::invalid_value(
                path.clone(),
                format!("expected a non-negative integer, got {}", n),
            )),
            _ => errors.push(mismatch()),
        },
        Kind::U32 => match value {
            Value::Number(n) if n.as_u64().is_some_and(|v| v <= u64::from(u32::MAX)) => {}
            Value::Number(n) => errors.push(ValidationError::invalid_value(
                path.clone(),
                format!("expected an integer between 0 and {}, got {}", u32::MAX, n),
            )),
            _ => errors.push(mismatch()),
        },
        Kind::Color => match value.as_str() {
            Some(s) if crate::color_utils::is_hex_color(s) => {}
            Some(s) => errors.push(ValidationError::invalid_value(
                path.clone(),
                format!("'{}' is not a #rrggbb color", s),
            )),
            None => errors.push(mismatch()),
        },
        Kind::Enum(options) => match value.as_str() {
            Some(s) if options.contains(&s) => {}
            Some(s) => errors.push(ValidationError::invalid_value(
                path.clone(),
                format!("'{}' is not one of: {}", s, options.join(", ")),
            )),
            None => errors.push(mismatch()),
        },
        Kind::Coords { min, even } => {
            let Some(items) = value.as_array() else {
                errors.push(mismatch());
                return;
            };
            let mut numeric = true;
            for (i, item) in items.iter().enumerate() {
                if !item.is_number() {
                    numeric = false;
                    errors.push(ValidationError::type_mismatch(path.index(i), "number", item));
                }
            }
            if numeric && (items.len() < *min || (*even && items.len() % 2 != 0)) {
                errors.push(ValidationError::invalid_value(
                    path.clone(),
                    format!(
                        "expected {}at least {} coordinates, found {}",
                        if *even { "an even number of " } else { "" },
                        min,
                        items.len()
                    ),
                ));
            }
        }
        Kind::Array(inner) => {
            let Some(items) = value.as_array() else {
                errors.push(mismatch());
                return;
            };
            for (i, item) in items.iter().enumerate() {
                check_kind(item, inner, &path.index(i), errors);
            }
        }
        Kind::Object(fields) => match value.as_object() {
            Some(object) => check_fields(object, fields, path, errors),
            None => errors.push(mismatch()),
        },
        Kind::Timeline(inner) => {
            let Some(object) = value.as_object() else {
                errors.push(mismatch());
                return;
            };
            for (key, state) in object {
                let key_path = path.key(key.as_str());
                if key.parse::<u64>().is_err() {
                    errors.push(ValidationError::invalid_value(
                        key_path.clone(),
                        "timeline keys must be non-negative integer timestamps",
                    ));
                }
                check_kind(state, inner, &key_path, errors);
            }
        }
    }
}
