use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::paths::LocationSegment;
use serde::{Deserialize, Serialize};

/// One step into an instance: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathChunk {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathChunk::Key(key) => f.write_str(&crate::resolver::escape_pointer_token(key)),
            PathChunk::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<LocationSegment<'_>> for PathChunk {
    fn from(segment: LocationSegment<'_>) -> Self {
        match segment {
            LocationSegment::Property(key) => PathChunk::Key(key.into_owned()),
            LocationSegment::Index(index) => PathChunk::Index(index),
        }
    }
}

/// A single schema violation.
///
/// `context` carries the branch failures behind a combinator violation
/// (`anyOf`, `oneOf`). Context paths are absolute, like `instance_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// Location of the offending value inside the instance
    pub instance_path: Vec<PathChunk>,
    /// The keyword that failed
    pub keyword: String,
    /// Human-readable message
    pub message: String,
    /// Sub-violations for combinators
    pub context: Vec<SchemaViolation>,
}

impl SchemaViolation {
    pub(crate) fn new(keyword: &str, message: impl Into<String>) -> Self {
        Self {
            instance_path: Vec::new(),
            keyword: keyword.to_string(),
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub(crate) fn with_context(mut self, context: Vec<SchemaViolation>) -> Self {
        self.context = context;
        self
    }

    /// Translate a `jsonschema` error, unpacking violations raised by `oneOf`.
    pub(crate) fn from_error(error: &jsonschema::ValidationError<'_>) -> Self {
        let path: Vec<PathChunk> = error.instance_path().iter().map(PathChunk::from).collect();
        let context = match error.kind() {
            ValidationErrorKind::Custom { message, .. } => {
                if let Some(inner) = Self::decode(message) {
                    return inner.nested_under(&path);
                }
                Vec::new()
            }
            ValidationErrorKind::AnyOf { context }
            | ValidationErrorKind::OneOfNotValid { context }
            | ValidationErrorKind::OneOfMultipleValid { context } => {
                context.iter().flatten().map(Self::from_error).collect()
            }
            _ => Vec::new(),
        };
        Self {
            instance_path: path,
            keyword: error.kind().keyword().to_string(),
            message: error.to_string(),
            context,
        }
    }

    /// Serialized form carried through a custom keyword error.
    pub(crate) fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    fn decode(message: &str) -> Option<Self> {
        serde_json::from_str(message).ok()
    }

    fn nested_under(mut self, prefix: &[PathChunk]) -> Self {
        if !prefix.is_empty() {
            self.instance_path.splice(0..0, prefix.iter().cloned());
            self.context = self
                .context
                .into_iter()
                .map(|violation| violation.nested_under(prefix))
                .collect();
        }
        self
    }

    /// The instance path as a JSON pointer (`""` for the root).
    #[must_use]
    pub fn pointer(&self) -> String {
        self.instance_path
            .iter()
            .map(|chunk| format!("/{chunk}"))
            .collect()
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.pointer(), self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jsonschema_error_keeps_path_and_keyword() {
        let validator = jsonschema::draft4::new(&json!({
            "properties": { "tags": { "items": { "type": "string" } } }
        }))
        .unwrap();
        let instance = json!({ "tags": ["a", 5] });
        let error = validator.validate(&instance).unwrap_err();
        let violation = SchemaViolation::from_error(&error);
        assert_eq!(violation.pointer(), "/tags/1");
        assert_eq!(violation.keyword, "type");
        assert_eq!(violation.to_string(), "/tags/1: 5 is not of type \"string\"");
    }

    #[test]
    fn test_encoded_violation_nests_under_outer_path() {
        let inner = SchemaViolation {
            instance_path: vec![PathChunk::Key("name".into())],
            keyword: "oneOf".into(),
            message: "no match".into(),
            context: vec![SchemaViolation::new("type", "wrong type")],
        };
        let decoded = SchemaViolation::decode(&inner.encode()).unwrap();
        let nested = decoded.nested_under(&[PathChunk::Key("pets".into()), PathChunk::Index(0)]);
        assert_eq!(nested.pointer(), "/pets/0/name");
        assert_eq!(nested.context[0].pointer(), "/pets/0");
    }

    #[test]
    fn test_pointer_escapes_keys() {
        let violation = SchemaViolation {
            instance_path: vec![PathChunk::Key("a/b".into()), PathChunk::Index(2)],
            ..SchemaViolation::new("required", "missing")
        };
        assert_eq!(violation.pointer(), "/a~1b/2");
    }
}
