//! # oapi3
//!
//! **oapi3** validates HTTP requests and responses against an
//! [OpenAPI 3.0](https://spec.openapis.org/oas/v3.0.3) contract.
//!
//! ## Overview
//!
//! A contract is built once into an immutable [`Document`]. Per request, the
//! document answers two questions: does the request match a declared
//! path/operation with conforming parameters and body, and does the handler's
//! response conform to what that operation declares for its status code.
//! Transport parsing and framework bindings are left to the caller, which hands
//! over an already parsed method, path, query mapping, content type and raw body.
//!
//! ## Architecture
//!
//! - **[`resolver`]** - `$ref` resolution across the root contract and `file:` documents
//! - **[`schema`]** - Draft 4 schema evaluation with `discriminator` and a recursion guard
//! - **[`params`]** - path/query parameter coercion and validation
//! - **[`router`]** - path template compilation and first-match lookup
//! - **[`media`]** - content type dispatch over a fixed table of body handlers
//! - **[`spec`]** - the typed contract model and its construction
//! - **[`validator`]** - the request and response pipelines
//! - **[`problem`]** - mapping of failures to HTTP status codes and `{code, message}` bodies
//!
//! ### Request Validation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Shim as Framework shim
//!     participant Doc as Document
//!     participant Router
//!     participant Params as ParameterSet
//!     participant Media as Content dispatcher
//!     participant Schema as SchemaNode
//!
//!     Shim->>Doc: validate_request(path, method, query, content_type, body)
//!     Doc->>Router: route(path)
//!     Router-->>Doc: PathTemplate + captures
//!     Doc->>Params: path parameters: deserialize + validate
//!     Doc->>Doc: operation lookup by method
//!     Doc->>Params: query parameters: deserialize + validate
//!     Doc->>Media: dispatch(content, content_type, body)
//!     Media->>Schema: validate(decoded body)
//!     Doc-->>Shim: ValidationState
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use oapi3::params::parse_query;
//! use oapi3::spec::from_yaml_str;
//!
//! # fn main() -> anyhow::Result<()> {
//! let document = from_yaml_str(
//!     r#"
//! openapi: "3.0"
//! paths:
//!   /items/{id}:
//!     parameters:
//!       - { name: id, in: path, required: true, schema: { type: integer } }
//!     get:
//!       responses:
//!         "200": { description: ok }
//! "#,
//!     "file:///srv/contract.yaml",
//! )?;
//!
//! let state = document.validate_request("/items/42", "GET", &parse_query(""), None, b"")?;
//! assert_eq!(state.path_params["id"], 42);
//! document.validate_response(&state, "200", None, b"")?;
//!
//! let err = document
//!     .validate_request("/items/abc", "GET", &parse_query(""), None, b"")
//!     .unwrap_err();
//! assert_eq!(err.code(), "PathParamValidationError");
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Construction is single-threaded and may read referenced files. The built
//! [`Document`] is `Send + Sync` and needs no locking. Every schema is compiled
//! during construction; validation only reads the compiled validators.

pub mod cli;
pub mod error;
pub mod media;
pub mod params;
pub mod problem;
pub mod resolver;
pub mod router;
pub mod runtime_config;
pub mod schema;
pub mod spec;
pub mod validator;

pub use error::{DocumentError, ValidationError};
pub use spec::{build, load_contract, Document};
pub use validator::ValidationState;
