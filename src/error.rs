//! Error kinds for contract construction and request/response validation.
//!
//! [`DocumentError`] describes a defect in the contract itself and is expected at
//! construction time. [`ValidationError`] describes a request or response that
//! does not conform to the contract. Internal kinds ([`ParameterTypeError`],
//! [`SchemaViolation`]) are always wrapped into a [`ValidationError`] at the step
//! where they occur.

use std::fmt;

use crate::schema::SchemaViolation;

/// A defect in the contract document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The `openapi` key is missing or names a version other than 3.0
    UnsupportedVersion {
        /// The declared version, if any
        found: Option<String>,
    },
    /// A required structural key is absent
    MissingKey {
        /// Location of the node that lacks the key
        location: String,
        /// The missing key
        key: &'static str,
    },
    /// A node has the wrong JSON type
    InvalidNode {
        /// Location of the offending node
        location: String,
        /// What the node should have been
        expected: &'static str,
    },
    /// A `$ref` pointer cannot be dereferenced
    UnresolvableRef {
        /// The reference, joined against its scope where possible
        reference: String,
        /// Why resolution failed
        reason: String,
    },
    /// A reference names a document through a scheme other than `file:`
    UnsupportedScheme {
        /// The document URL
        url: String,
    },
    /// A reference names another document while external references are disabled
    ExternalRefsDisabled {
        /// The document URL
        url: String,
    },
    /// An external document could not be read or parsed
    LoadFailed {
        /// The document URL
        url: String,
        /// The underlying failure
        reason: String,
    },
    /// A `$ref` → `$ref` chain exceeded the configured limit
    RefChainTooLong {
        /// Where the chain started
        location: String,
        /// The configured limit
        limit: usize,
    },
    /// A content map declares a media type outside the registered set
    UnsupportedMediaType {
        /// Location of the content map entry
        location: String,
        /// The declared media type
        media_type: String,
    },
    /// A `pattern` or `patternProperties` regex does not compile
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },
    /// A path template declares the same placeholder twice
    DuplicatePathParameter {
        /// The path template
        template: String,
        /// The repeated placeholder name
        name: String,
    },
    /// A `discriminator` is malformed or maps to a branch outside its `oneOf`
    InvalidDiscriminator {
        /// Location of the schema carrying the discriminator
        location: String,
        /// What is wrong with it
        reason: String,
    },
    /// A schema does not compile under Draft 4
    InvalidSchema {
        /// Location of the schema
        location: String,
        /// Compiler message
        reason: String,
    },
    /// A content map declares two media types with the same essence
    DuplicateMediaType {
        /// Location of the content map
        location: String,
        /// The shared essence, e.g. `application/json`
        essence: String,
    },
    /// The base location is neither a URL nor a usable filesystem path
    InvalidBaseLocation {
        /// The base location as given
        base: String,
    },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::UnsupportedVersion { found: Some(found) } => {
                write!(f, "unsupported OpenAPI version '{found}', expected 3.0")
            }
            DocumentError::UnsupportedVersion { found: None } => {
                write!(f, "missing 'openapi' version, expected 3.0")
            }
            DocumentError::MissingKey { location, key } => {
                write!(f, "{location}: missing required key '{key}'")
            }
            DocumentError::InvalidNode { location, expected } => {
                write!(f, "{location}: expected {expected}")
            }
            DocumentError::UnresolvableRef { reference, reason } => {
                write!(f, "unresolvable reference '{reference}': {reason}")
            }
            DocumentError::UnsupportedScheme { url } => {
                write!(f, "cannot retrieve '{url}': only file: documents are supported")
            }
            DocumentError::ExternalRefsDisabled { url } => {
                write!(f, "cannot retrieve '{url}': external references are disabled")
            }
            DocumentError::LoadFailed { url, reason } => {
                write!(f, "failed to load '{url}': {reason}")
            }
            DocumentError::RefChainTooLong { location, limit } => {
                write!(f, "{location}: reference chain longer than {limit} hops")
            }
            DocumentError::UnsupportedMediaType {
                location,
                media_type,
            } => {
                write!(f, "{location}: media type '{media_type}' is not supported")
            }
            DocumentError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid regular expression '{pattern}': {reason}")
            }
            DocumentError::DuplicatePathParameter { template, name } => {
                write!(f, "path template '{template}' declares '{{{name}}}' more than once")
            }
            DocumentError::InvalidDiscriminator { location, reason } => {
                write!(f, "{location}: invalid discriminator: {reason}")
            }
            DocumentError::InvalidSchema { location, reason } => {
                write!(f, "{location}: invalid schema: {reason}")
            }
            DocumentError::DuplicateMediaType { location, essence } => {
                write!(f, "{location}: media type '{essence}' is declared more than once")
            }
            DocumentError::InvalidBaseLocation { base } => {
                write!(f, "invalid base location '{base}'")
            }
        }
    }
}

impl std::error::Error for DocumentError {}

/// A raw parameter value that cannot be coerced to its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterTypeError {
    /// Parameter name
    pub name: String,
    /// The raw value as received
    pub value: String,
    /// The declared schema type
    pub expected: String,
}

impl fmt::Display for ParameterTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' value '{}' is not of type {}",
            self.name, self.value, self.expected
        )
    }
}

impl std::error::Error for ParameterTypeError {}

/// Why a parameter set was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// Coercion of a raw value failed
    Type(ParameterTypeError),
    /// The coerced mapping violates the synthesized schema
    Schema(SchemaViolation),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::Type(err) => err.fmt(f),
            ParamError::Schema(violation) => violation.fmt(f),
        }
    }
}

/// A request or response that does not conform to the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No path template matches the concrete path
    PathNotFound {
        /// The concrete path
        path: String,
    },
    /// Path parameters failed coercion or validation
    PathParamValidation(ParamError),
    /// The matched path does not declare the method
    OperationNotAllowed {
        /// The requested method, lowercase
        method: String,
        /// Declared methods, lowercase, in declaration order
        allowed: Vec<String>,
    },
    /// Query parameters failed coercion or validation
    QueryParamValidation(ParamError),
    /// The content type is not declared for the body
    MediaTypeNotAllowed {
        /// The content type received, if any
        media_type: Option<String>,
        /// Declared content types
        allowed: Vec<String>,
    },
    /// The decoded body violates its schema
    BodyValidation(SchemaViolation),
    /// The body is not valid UTF-8 JSON
    JsonDecode {
        /// Decoder message
        detail: String,
    },
    /// The operation declares neither the status code nor `default`
    ResponseCodeNotAllowed {
        /// The status code received
        code: String,
        /// Declared status codes
        allowed: Vec<String>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::PathNotFound { path } => write!(f, "path '{path}' not found"),
            ValidationError::PathParamValidation(detail) => {
                write!(f, "invalid path parameters: {detail}")
            }
            ValidationError::OperationNotAllowed { method, allowed } => write!(
                f,
                "operation '{method}' not allowed, expected one of [{}]",
                allowed.join(", ")
            ),
            ValidationError::QueryParamValidation(detail) => {
                write!(f, "invalid query parameters: {detail}")
            }
            ValidationError::MediaTypeNotAllowed {
                media_type,
                allowed,
            } => write!(
                f,
                "media type '{}' not allowed, expected one of [{}]",
                media_type.as_deref().unwrap_or(""),
                allowed.join(", ")
            ),
            ValidationError::BodyValidation(detail) => write!(f, "invalid body: {detail}"),
            ValidationError::JsonDecode { detail } => write!(f, "invalid JSON body: {detail}"),
            ValidationError::ResponseCodeNotAllowed { code, allowed } => write!(
                f,
                "response code '{code}' not allowed, expected one of [{}]",
                allowed.join(", ")
            ),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::PathParamValidation(ParamError::Type(err))
            | ValidationError::QueryParamValidation(ParamError::Type(err)) => Some(err),
            _ => None,
        }
    }
}
