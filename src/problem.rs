//! Protocol-facing translation of [`ValidationError`].
//!
//! A framework shim maps each failure to an HTTP status and a JSON body:
//!
//! ```json
//! {
//!   "code": "OperationNotAllowed",
//!   "message": "operation 'post' not allowed, expected one of [get]"
//! }
//! ```

use http::StatusCode;
use serde::Serialize;

use crate::error::ValidationError;

/// JSON error body for a rejected request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    /// Stable name of the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::PathNotFound { .. } => "PathNotFound",
            ValidationError::PathParamValidation(_) => "PathParamValidationError",
            ValidationError::OperationNotAllowed { .. } => "OperationNotAllowed",
            ValidationError::QueryParamValidation(_) => "QueryParamValidationError",
            ValidationError::MediaTypeNotAllowed { .. } => "MediaTypeNotAllowed",
            ValidationError::BodyValidation(_) => "BodyValidationError",
            ValidationError::JsonDecode { .. } => "JsonDecodeError",
            ValidationError::ResponseCodeNotAllowed { .. } => "ResponseCodeNotAllowed",
        }
    }

    /// HTTP status a server should answer with.
    ///
    /// An unmatched path parameter means the resource does not exist, hence 404.
    /// Response-side failures are the server's fault.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ValidationError::PathNotFound { .. } | ValidationError::PathParamValidation(_) => {
                StatusCode::NOT_FOUND
            }
            ValidationError::OperationNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ValidationError::QueryParamValidation(_)
            | ValidationError::BodyValidation(_)
            | ValidationError::JsonDecode { .. } => StatusCode::BAD_REQUEST,
            ValidationError::MediaTypeNotAllowed { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ValidationError::ResponseCodeNotAllowed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn problem(&self) -> Problem {
        Problem {
            code: self.code(),
            message: self.to_string(),
        }
    }
}
