//! Compiles contract schemas with `jsonschema` (Draft 4) extended for OpenAPI 3.0.
//!
//! Every loaded document is copied into a Draft 4 [`Registry`] after a
//! normalization pass:
//!
//! - OpenAPI type names map onto JSON types (`long` → `integer`, `double`/`float`
//!   → `number`); unknown names are dropped
//! - `nullable: true` adds `"null"` to `type` and to `enum`
//! - a schema object carrying `oneOf` is tagged with its absolute location so the
//!   `oneOf` keyword can address its branches through the registry
//!
//! The raw documents stay untouched for [`Document::contract`](crate::Document::contract).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use jsonschema::{Draft, PatternOptions, Registry, ValidationOptions, Validator};
use once_cell::sync::OnceCell;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use super::one_of::OneOf;
use crate::error::DocumentError;
use crate::resolver::escape_pointer_token;

/// Key tagging a `oneOf` schema object with its absolute location.
pub(super) const LOCATION_KEY: &str = "x-oapi3-location";

/// Compiled `oneOf` branches of every loaded document, keyed by branch location.
///
/// Branches are compiled once after the registry is built and looked up at
/// validation time, which lets recursive schemas compile.
#[derive(Default)]
pub(super) struct BranchTable {
    validators: OnceCell<HashMap<String, Validator>>,
}

impl BranchTable {
    pub(super) fn get(&self, location: &str) -> Option<&Validator> {
        self.validators.get()?.get(location)
    }
}

/// Draft 4 compiler over the loaded contract documents.
pub(crate) struct SchemaEngine {
    registry: Registry,
    branches: Arc<BranchTable>,
}

impl SchemaEngine {
    pub(crate) fn new(documents: &HashMap<Url, Value>) -> Result<Self, DocumentError> {
        let mut located = Vec::new();
        let mut resources = Vec::with_capacity(documents.len());
        for (url, document) in documents {
            let mut copy = document.clone();
            normalize(&mut copy, Some(url.as_str()), &mut String::new(), &mut located);
            resources.push((url.as_str().to_string(), Draft::Draft4.create_resource(copy)));
        }
        let registry = Registry::options()
            .draft(Draft::Draft4)
            .build(resources)
            .map_err(|err| DocumentError::InvalidSchema {
                location: "contract registry".to_string(),
                reason: err.to_string(),
            })?;

        let engine = Self {
            registry,
            branches: Arc::new(BranchTable::default()),
        };
        let mut validators = HashMap::new();
        for (location, count) in located {
            for index in 0..count {
                let branch = format!("{location}/oneOf/{index}");
                let validator = engine.compile_reference(&branch)?;
                validators.insert(branch, validator);
            }
        }
        debug!(
            branches_count = validators.len(),
            "Compiled oneOf branches"
        );
        if engine.branches.validators.set(validators).is_err() {
            return Err(DocumentError::InvalidSchema {
                location: "contract registry".to_string(),
                reason: "oneOf branches compiled twice".to_string(),
            });
        }
        Ok(engine)
    }

    /// Compile `{"$ref": location}` where `location` is an absolute schema URI.
    pub(crate) fn compile_reference(&self, location: &str) -> Result<Validator, DocumentError> {
        self.compile(&json!({ "$ref": location }), location)
    }

    /// Compile a schema assembled in memory; it is normalized like a loaded document.
    pub(crate) fn compile_inline(&self, schema: &Value) -> Result<Validator, DocumentError> {
        let mut copy = schema.clone();
        normalize(&mut copy, None, &mut String::new(), &mut Vec::new());
        self.compile(&copy, "synthesized schema")
    }

    fn compile(&self, schema: &Value, location: &str) -> Result<Validator, DocumentError> {
        options(&self.registry, &Arc::downgrade(&self.branches))
            .build(schema)
            .map_err(|err| DocumentError::InvalidSchema {
                location: location.to_string(),
                reason: err.to_string(),
            })
    }
}

impl fmt::Debug for SchemaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaEngine").finish_non_exhaustive()
    }
}

/// Draft 4 options with the registry and the OpenAPI `oneOf` keyword.
///
/// `format` is an annotation only. Patterns use the `regex` crate dialect.
pub(super) fn options(registry: &Registry, branches: &Weak<BranchTable>) -> ValidationOptions {
    let (registry_for_keyword, branches_for_keyword) = (registry.clone(), branches.clone());
    jsonschema::draft4::options()
        .with_registry(registry.clone())
        .with_pattern_options(PatternOptions::regex())
        .should_validate_formats(false)
        .with_keyword("oneOf", move |parent, value, _| {
            OneOf::compile(parent, value, &registry_for_keyword, &branches_for_keyword)
                .map(|keyword| Box::new(keyword) as Box<dyn jsonschema::Keyword>)
        })
}

/// Absolute schema URI for a scope URL, with a strictly encoded pointer fragment.
pub(crate) fn schema_uri(scope: &Url) -> String {
    let mut document = scope.clone();
    document.set_fragment(None);
    let fragment = scope.fragment().unwrap_or("");
    let pointer = urlencoding::decode(fragment).unwrap_or(std::borrow::Cow::Borrowed(fragment));
    pointer_uri(document.as_str(), &pointer)
}

fn pointer_uri(document: &str, pointer: &str) -> String {
    let encoded: Vec<_> = pointer.split('/').map(urlencoding::encode).collect();
    format!("{document}#{}", encoded.join("/"))
}

/// Rewrite OpenAPI extensions into plain Draft 4 and tag `oneOf` locations.
///
/// `document` is `None` for in-memory schemas, which have no addressable location.
fn normalize(
    value: &mut Value,
    document: Option<&str>,
    pointer: &mut String,
    located: &mut Vec<(String, usize)>,
) {
    match value {
        Value::Object(map) => {
            normalize_types(map);
            if let (Some(document), Some(count)) = (document, one_of_branches(map)) {
                let location = pointer_uri(document, pointer);
                map.insert(LOCATION_KEY.to_string(), Value::String(location.clone()));
                located.push((location, count));
            }
            for (key, child) in map.iter_mut() {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&escape_pointer_token(key));
                normalize(child, document, pointer, located);
                pointer.truncate(len);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&index.to_string());
                normalize(child, document, pointer, located);
                pointer.truncate(len);
            }
        }
        _ => {}
    }
}

fn one_of_branches(map: &Map<String, Value>) -> Option<usize> {
    let branches = map.get("oneOf")?.as_array()?;
    branches.iter().all(Value::is_object).then_some(branches.len())
}

fn json_type(name: &str) -> Option<&'static str> {
    match name {
        "integer" | "long" => Some("integer"),
        "number" | "double" | "float" => Some("number"),
        "string" => Some("string"),
        "boolean" => Some("boolean"),
        "object" => Some("object"),
        "array" => Some("array"),
        "null" => Some("null"),
        _ => None,
    }
}

fn normalize_types(map: &mut Map<String, Value>) {
    let nullable = map.get("nullable").and_then(Value::as_bool) == Some(true);
    let types = match map.get("type") {
        Some(Value::String(name)) => Some(json_type(name).into_iter().collect::<Vec<_>>()),
        Some(Value::Array(names)) => Some(
            names
                .iter()
                .filter_map(Value::as_str)
                .filter_map(json_type)
                .collect(),
        ),
        _ => None,
    };
    if let Some(mut types) = types {
        if nullable && !types.is_empty() && !types.contains(&"null") {
            types.push("null");
        }
        match types.as_slice() {
            [] => {
                map.remove("type");
            }
            [single] => {
                map.insert("type".to_string(), Value::from(*single));
            }
            _ => {
                map.insert("type".to_string(), json!(types));
            }
        }
    }
    if nullable {
        if let Some(Value::Array(options)) = map.get_mut("enum") {
            if !options.contains(&Value::Null) {
                options.push(Value::Null);
            }
        }
    }
}
