use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::{json, Value};
use url::Url;

use super::engine::schema_uri;
use super::SchemaViolation;
use crate::error::DocumentError;
use crate::resolver::RefResolver;

/// A schema fragment bound to the resolution scope it was found under.
///
/// The node is compiled once at construction. Document fragments are compiled
/// through their absolute location, so validation always starts from the captured
/// scope whichever structural context invokes it.
#[derive(Clone)]
pub struct SchemaNode {
    schema: Value,
    scope: Url,
    reference: Option<String>,
    validator: Arc<Validator>,
}

impl SchemaNode {
    /// A fragment taken from a loaded document at `scope`.
    pub(crate) fn located(
        resolver: &RefResolver,
        schema: &Value,
        scope: Url,
    ) -> Result<Self, DocumentError> {
        let reference = schema_uri(&scope);
        let validator = resolver.engine().compile_reference(&reference)?;
        Ok(Self {
            schema: schema.clone(),
            scope,
            reference: Some(reference),
            validator: Arc::new(validator),
        })
    }

    /// A schema assembled in memory. References in it must be absolute.
    pub(crate) fn synthesized(
        resolver: &RefResolver,
        schema: Value,
    ) -> Result<Self, DocumentError> {
        let validator = resolver.engine().compile_inline(&schema)?;
        Ok(Self {
            schema,
            scope: resolver.root().clone(),
            reference: None,
            validator: Arc::new(validator),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// The captured resolution scope.
    #[must_use]
    pub fn scope(&self) -> &Url {
        &self.scope
    }

    /// The `type` keyword when it is a single string.
    #[must_use]
    pub fn declared_type(&self) -> Option<&str> {
        self.schema.get("type").and_then(Value::as_str)
    }

    /// A schema usable inside another schema that validates exactly like this node.
    ///
    /// Document fragments are embedded as an absolute `$ref` so their scope survives.
    pub(crate) fn embed(&self) -> Value {
        match &self.reference {
            Some(reference) => json!({ "$ref": reference }),
            None => self.schema.clone(),
        }
    }

    /// Every violation of `instance`.
    #[must_use]
    pub fn violations(&self, instance: &Value) -> Vec<SchemaViolation> {
        self.validator
            .iter_errors(instance)
            .map(|error| SchemaViolation::from_error(&error))
            .collect()
    }

    /// Validate `instance`, reporting the first violation.
    pub fn validate(&self, instance: &Value) -> Result<(), SchemaViolation> {
        self.validator
            .validate(instance)
            .map_err(|error| SchemaViolation::from_error(&error))
    }

    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("schema", &self.schema)
            .field("scope", &self.scope.as_str())
            .finish_non_exhaustive()
    }
}
