//! # Resolver Module
//!
//! Resolves `$ref` pointers against the contract and any documents it references.
//!
//! ## Overview
//!
//! Resolution happens in two phases:
//!
//! 1. **Loading**: [`RefResolver::load`] starts from the root contract, follows every
//!    `$ref` that names another document (`file:` scheme only) and keeps each fetched
//!    document in memory. Every reference, regex pattern, `multipleOf` and
//!    discriminator mapping in every loaded document is then verified, so a dangling
//!    pointer is a construction error rather than a per-request failure. The loaded
//!    documents also seed the schema engine's Draft 4 registry.
//!
//! 2. **Lookup**: [`RefResolver::resolve`] joins a reference against a scope URL and
//!    dereferences the JSON pointer fragment. The returned URL is the scope that must be
//!    active while the target fragment is interpreted.
//!
//! After loading the resolver is immutable and shared (`Arc`) by the contract tree.
//! Schema nodes are compiled against absolute locations, so validation keeps no
//! shared scope state.

mod store;

pub use store::RefResolver;
pub(crate) use store::{escape_pointer_token, join, parse_document_text};
