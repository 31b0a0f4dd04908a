//! # Schema Module
//!
//! JSON Schema Draft 4 validation extended for OpenAPI 3.0 contracts, compiled with
//! the `jsonschema` crate.
//!
//! ## Extensions
//!
//! - `discriminator` on `oneOf`: the instance must carry the discriminator property
//!   with one of the mapped values, and only the mapped branch is evaluated
//! - `nullable: true` admits `null`
//! - OpenAPI type names `long`, `double` and `float`
//! - `$ref` is resolved relative to the document of the referring schema, never the
//!   caller's scope
//!
//! ## Recursion
//!
//! Re-entering the same `oneOf` branch for the same instance value is treated as
//! satisfied. Self-referential schemas therefore always terminate.

mod discriminator;
mod engine;
mod node;
mod one_of;
mod violation;

pub(crate) use discriminator::Discriminator;
pub(crate) use engine::SchemaEngine;
pub use node::SchemaNode;
pub use violation::{PathChunk, SchemaViolation};
