//! Validation errors and the paths that address them.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// One step from a JSON value to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a field, rendered like `instances[1].points`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to a key of the object at this path.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// Path to an element of the array at this path.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => f.write_str(key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What is wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// Instance type is absent, not a string, or not a known variant
    InvalidDiscriminant,
    /// Required field is absent
    MissingField,
    /// Field has the wrong JSON type
    TypeMismatch,
    /// Field belongs to another variant of the same media type
    UnexpectedField,
    /// Field has the right type but an illegal value
    InvalidValue,
}

/// One defect found in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub path: FieldPath,

    #[serde(skip)]
    pub kind: ValidationErrorKind,

    pub message: String,
}

impl ValidationError {
    pub fn new(path: FieldPath, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    pub fn missing(path: FieldPath) -> Self {
        Self::new(path, ValidationErrorKind::MissingField, "missing required field")
    }

    pub fn type_mismatch(path: FieldPath, expected: &str, found: &Value) -> Self {
        Self::new(
            path,
            ValidationErrorKind::TypeMismatch,
            format!("expected {}, found {}", expected, json_type(found)),
        )
    }

    pub fn invalid_value(path: FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, ValidationErrorKind::InvalidValue, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// JSON type name of a value, integers told apart from other numbers.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_rendering() {
        let path = FieldPath::root().key("instances").index(1).key("points");
        assert_eq!(path.to_string(), "instances[1].points");
        assert_eq!(FieldPath::root().key("metadata").key("name").to_string(), "metadata.name");
        assert_eq!(FieldPath::root().to_string(), "(root)");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(json_type(&json!(12)), "integer");
        assert_eq!(json_type(&json!(-3)), "integer");
        assert_eq!(json_type(&json!(1.5)), "number");
        assert_eq!(json_type(&json!({})), "object");
    }

    #[test]
    fn test_error_serializes_path_and_message() {
        let error = ValidationError::missing(FieldPath::root().key("metadata"));
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"path": "metadata", "message": "missing required field"})
        );
    }
}
