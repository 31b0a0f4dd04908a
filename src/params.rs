//! # Parameter Pipeline
//!
//! Path and query parameters are processed in two phases:
//!
//! 1. **Deserialize**: each raw string is coerced using the declared `type` of its
//!    parameter schema. `integer`, `long` and `double` parse as integers; every other
//!    type passes the string through. Undeclared keys pass through unchanged.
//! 2. **Validate**: the resulting mapping is checked against a synthesized object
//!    schema (one property per parameter, required names, no additional properties).
//!
//! Missing required parameters and unknown parameters both surface as schema
//! violations of the second phase.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::error::{DocumentError, ParamError, ParameterTypeError, ValidationError};
use crate::schema::SchemaViolation;
use crate::resolver::RefResolver;
use crate::schema::SchemaNode;
use crate::spec::{Parameter, ParameterLocation};

/// Raw query input: every value received per key, in arrival order.
pub type QueryParams = IndexMap<String, Vec<String>>;

/// Parse a raw query string (without the leading `?`) into [`QueryParams`].
#[must_use]
pub fn parse_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// All parameters of one location on one operation.
///
/// The synthesized schema is built once from the final collection.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    location: ParameterLocation,
    parameters: IndexMap<String, Parameter>,
    schema: SchemaNode,
}

impl ParameterSet {
    pub(crate) fn new(
        resolver: &RefResolver,
        location: ParameterLocation,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> Result<Self, DocumentError> {
        let parameters: IndexMap<String, Parameter> = parameters
            .into_iter()
            .map(|parameter| (parameter.name.clone(), parameter))
            .collect();
        let schema = SchemaNode::synthesized(resolver, synthesize(&parameters))?;
        Ok(Self {
            location,
            parameters,
            schema,
        })
    }

    #[must_use]
    pub fn location(&self) -> ParameterLocation {
        self.location
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Declared parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// The synthesized object schema.
    #[must_use]
    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// Coerce raw values by declared type.
    pub fn deserialize<'a>(
        &self,
        raw: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Map<String, Value>, ParameterTypeError> {
        let mut values = Map::new();
        for (name, value) in raw {
            let coerced = match self.parameters.get(name) {
                Some(parameter) => coerce(parameter, value)?,
                None => Value::String(value.to_string()),
            };
            values.insert(name.to_string(), coerced);
        }
        Ok(values)
    }

    /// Check a deserialized mapping against the synthesized schema.
    pub fn validate(&self, values: &Map<String, Value>) -> Result<(), SchemaViolation> {
        self.schema.validate(&Value::Object(values.clone()))
    }

    /// Both phases, with failures translated for this set's location.
    pub fn process<'a>(
        &self,
        raw: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let values = self.deserialize(raw).map_err(|err| match self.location {
            ParameterLocation::Path => ValidationError::PathParamValidation(ParamError::Type(err)),
            _ => ValidationError::QueryParamValidation(ParamError::Type(err)),
        })?;
        self.validate(&values).map_err(|violation| match self.location {
            ParameterLocation::Path => {
                ValidationError::PathParamValidation(ParamError::Schema(violation))
            }
            _ => ValidationError::QueryParamValidation(ParamError::Schema(violation)),
        })?;
        Ok(values)
    }
}

fn synthesize(parameters: &IndexMap<String, Parameter>) -> Value {
    let properties: Map<String, Value> = parameters
        .iter()
        .map(|(name, parameter)| (name.clone(), parameter.schema.embed()))
        .collect();
    let required: Vec<&str> = parameters
        .values()
        .filter(|parameter| parameter.required)
        .map(|parameter| parameter.name.as_str())
        .collect();

    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false
    });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

fn coerce(parameter: &Parameter, raw: &str) -> Result<Value, ParameterTypeError> {
    match parameter.schema.declared_type() {
        Some(expected @ ("integer" | "long" | "double")) => {
            let trimmed = raw.trim();
            trimmed
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| trimmed.parse::<u64>().map(Value::from))
                .map_err(|_| ParameterTypeError {
                    name: parameter.name.clone(),
                    value: raw.to_string(),
                    expected: expected.to_string(),
                })
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}
