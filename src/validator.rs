//! # Validation Orchestrator
//!
//! Request pipeline, stopping at the first violated step:
//!
//! 1. path match
//! 2. path parameters (deserialize, then validate) against the template-level set
//! 3. operation lookup by method, then path parameters again against the
//!    operation's own declarations
//! 4. query parameters (deserialize, then validate)
//! 5. request body dispatch, when the operation declares one
//!
//! The response pipeline reuses the resulting [`ValidationState`] to find the
//! declared response (exact status code, then `default`) and dispatch its body.

use std::time::Instant;

use http::Method;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::media::{self, BodyValue, MediaType};
use crate::params::QueryParams;
use crate::router::PathTemplate;
use crate::spec::{Document, Operation};

/// Per-request result of a successful request validation.
///
/// Borrows the matched nodes from the [`Document`]; never mutates it.
#[derive(Debug, Clone)]
pub struct ValidationState<'d> {
    pub path: String,
    pub method: Method,
    pub query: QueryParams,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub template: &'d PathTemplate,
    pub operation: &'d Operation,
    /// Coerced path parameters
    pub path_params: Map<String, Value>,
    /// Coerced query parameters
    pub query_params: Map<String, Value>,
    /// `None` when the operation declares no request body or an optional body was omitted
    pub media_type: Option<&'d MediaType>,
    pub body_value: BodyValue,
}

impl Document {
    /// Validate a request against the contract.
    ///
    /// `method` is case-insensitive. Repeated query keys use their last value.
    pub fn validate_request(
        &self,
        path: &str,
        method: &str,
        query: &QueryParams,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<ValidationState<'_>, ValidationError> {
        debug!(path = %path, method = %method, "Validating request");
        let start = Instant::now();

        match self.request_pipeline(path, method, query, content_type, body) {
            Ok(state) => {
                info!(
                    path = %path,
                    method = %state.method,
                    route_pattern = %state.template.pattern,
                    duration_us = start.elapsed().as_micros(),
                    "Request validated"
                );
                Ok(state)
            }
            Err(err) => {
                warn!(
                    path = %path,
                    method = %method,
                    code = err.code(),
                    error = %err,
                    duration_us = start.elapsed().as_micros(),
                    "Request rejected"
                );
                Err(err)
            }
        }
    }

    /// Validate a response for the operation matched by `state`.
    ///
    /// Responses that declare no content skip body validation regardless of the body.
    pub fn validate_response(
        &self,
        state: &ValidationState<'_>,
        status_code: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<(), ValidationError> {
        debug!(
            path = %state.path,
            method = %state.method,
            status_code = %status_code,
            "Validating response"
        );
        let start = Instant::now();

        match response_pipeline(state.operation, status_code, content_type, body) {
            Ok(()) => {
                info!(
                    path = %state.path,
                    method = %state.method,
                    status_code = %status_code,
                    duration_us = start.elapsed().as_micros(),
                    "Response validated"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    path = %state.path,
                    method = %state.method,
                    status_code = %status_code,
                    code = err.code(),
                    error = %err,
                    "Response rejected"
                );
                Err(err)
            }
        }
    }

    fn request_pipeline(
        &self,
        path: &str,
        method: &str,
        query: &QueryParams,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<ValidationState<'_>, ValidationError> {
        let route = self
            .router
            .route(path)
            .ok_or_else(|| ValidationError::PathNotFound {
                path: path.to_string(),
            })?;
        let template = route.template;

        let captures = || route.path_params.iter().map(|(k, v)| (k.as_ref(), v.as_str()));
        template.path_parameters.process(captures())?;

        let not_allowed = || ValidationError::OperationNotAllowed {
            method: method.to_ascii_lowercase(),
            allowed: template.allowed_methods(),
        };
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| not_allowed())?;
        let operation = template.operation(&method).ok_or_else(not_allowed)?;
        // the operation's own declarations decide the coerced values
        let path_params = operation.path_parameters.process(captures())?;

        // last write wins; keys without values are absent
        let query_params = operation.query_parameters.process(
            query
                .iter()
                .filter_map(|(k, values)| values.last().map(|v| (k.as_str(), v.as_str()))),
        )?;

        let (media_type, body_value) = match &operation.request_body {
            None => (None, BodyValue::Empty),
            Some(request_body)
                if !request_body.required && content_type.is_none() && body.is_empty() =>
            {
                (None, BodyValue::Empty)
            }
            Some(request_body) => {
                let (media_type, value) =
                    media::dispatch(&request_body.content, content_type, body)?;
                (Some(media_type), value)
            }
        };

        Ok(ValidationState {
            path: path.to_string(),
            method,
            query: query.clone(),
            content_type: content_type.map(str::to_string),
            body: body.to_vec(),
            template,
            operation,
            path_params,
            query_params,
            media_type,
            body_value,
        })
    }
}

fn response_pipeline(
    operation: &Operation,
    status_code: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<(), ValidationError> {
    let response = operation
        .response_for(status_code)
        .ok_or_else(|| ValidationError::ResponseCodeNotAllowed {
            code: status_code.to_string(),
            allowed: operation.responses.keys().cloned().collect(),
        })?;
    if let Some(content) = &response.content {
        media::dispatch(content, content_type, body)?;
    }
    Ok(())
}
