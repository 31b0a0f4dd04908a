//! # Content Dispatcher
//!
//! Bodies are handled by a fixed table of media kinds. Each registered content
//! type maps to exactly one behavior:
//!
//! | Content type       | Behavior                                           |
//! |--------------------|----------------------------------------------------|
//! | `text/plain`       | accepted unconditionally, no decoding              |
//! | `application/json` | UTF-8 JSON decode, then schema validation          |
//! | `audio/x-wav`      | returned as opaque bytes                           |
//!
//! Registering a new content type means adding a [`MediaKind`] variant and a row in
//! `REGISTERED`. Contracts declaring anything else fail construction.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ValidationError;
use crate::schema::SchemaNode;

/// Registered body handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    PlainText,
    Json,
    Wav,
}

const REGISTERED: &[(&str, MediaKind)] = &[
    ("text/plain", MediaKind::PlainText),
    ("application/json", MediaKind::Json),
    ("audio/x-wav", MediaKind::Wav),
];

impl MediaKind {
    /// The handler registered for `content_type`, matched exactly.
    #[must_use]
    pub fn lookup(content_type: &str) -> Option<Self> {
        REGISTERED
            .iter()
            .find(|(name, _)| *name == content_type)
            .map(|(_, kind)| *kind)
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            MediaKind::PlainText => "text/plain",
            MediaKind::Json => "application/json",
            MediaKind::Wav => "audio/x-wav",
        }
    }
}

/// A decoded body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
    /// No structured result (`text/plain`, or no body declared)
    Empty,
    Json(Value),
    Binary(Vec<u8>),
}

impl BodyValue {
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            BodyValue::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A declared content type and the schema for its body.
#[derive(Debug, Clone)]
pub struct MediaType {
    pub content_type: String,
    pub kind: MediaKind,
    pub schema: SchemaNode,
}

impl MediaType {
    /// Decode and validate `body` according to this media type's kind.
    pub fn validate(&self, body: &[u8]) -> Result<BodyValue, ValidationError> {
        match self.kind {
            MediaKind::PlainText => Ok(BodyValue::Empty),
            MediaKind::Json => {
                let value: Value =
                    serde_json::from_slice(body).map_err(|err| ValidationError::JsonDecode {
                        detail: err.to_string(),
                    })?;
                self.schema
                    .validate(&value)
                    .map_err(ValidationError::BodyValidation)?;
                Ok(BodyValue::Json(value))
            }
            MediaKind::Wav => Ok(BodyValue::Binary(body.to_vec())),
        }
    }
}

/// Strip media type parameters and normalize case: `Application/JSON; charset=utf-8`
/// becomes `application/json`.
#[must_use]
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Look up the media type declared for `content_type`.
pub fn select<'c>(
    content: &'c IndexMap<String, MediaType>,
    content_type: Option<&str>,
) -> Result<&'c MediaType, ValidationError> {
    content_type
        .map(essence)
        .and_then(|key| content.get(&key))
        .ok_or_else(|| ValidationError::MediaTypeNotAllowed {
            media_type: content_type.map(str::to_string),
            allowed: content.keys().cloned().collect(),
        })
}

/// Select the media type for `content_type` and validate `body` against it.
pub fn dispatch<'c>(
    content: &'c IndexMap<String, MediaType>,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<(&'c MediaType, BodyValue), ValidationError> {
    let media_type = select(content, content_type)?;
    let value = media_type.validate(body)?;
    Ok((media_type, value))
}
