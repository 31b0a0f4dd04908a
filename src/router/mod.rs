//! # Router Module
//!
//! Path-template routing for contract validation.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling every declared path template into an anchored regex matcher
//! - Matching concrete request paths against templates in declaration order
//! - Extracting raw path parameter strings in placeholder order
//!
//! ## Architecture
//!
//! 1. **Compilation**: at construction, `/pets/{id}` becomes
//!    `^/pets/([0-9a-zA-Z_\-]+)$`. Placeholders capture letters, digits,
//!    underscore and hyphen. Literal text is escaped, so `/v1.0/pets` only matches
//!    itself.
//!
//! 2. **Matching**: each request path is tested against the templates in the order
//!    the contract declares them; the first full match wins. Lookup does not
//!    depend on the HTTP method; method checks happen after path parameters are
//!    validated.
//!
//! ## Example
//!
//! ```rust,ignore
//! let document = oapi3::spec::from_yaml_str(yaml, "file:///srv/contract.yaml")?;
//! if let Some(m) = document.router().route("/pets/123") {
//!     println!("template: {}", m.template.pattern);
//!     println!("id: {:?}", m.get_path_param("id"));
//! }
//! ```

mod core;

pub use core::{CaptureVec, PathMatcher, PathTemplate, RouteMatch, Router, MAX_INLINE_PARAMS};
