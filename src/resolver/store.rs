use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use crate::error::DocumentError;
use crate::runtime_config::ContractConfig;
use crate::schema::{Discriminator, SchemaEngine};

/// In-memory store of the root contract and every document it references.
///
/// Documents are keyed by their URL without fragment. The schema engine holds a
/// compiled registry over the same documents.
#[derive(Debug)]
pub struct RefResolver {
    root: Url,
    documents: HashMap<Url, Value>,
    engine: SchemaEngine,
}

impl RefResolver {
    /// Load the root contract and every document reachable through `$ref`.
    ///
    /// Fails when a referenced document cannot be retrieved, a pointer does not
    /// dereference, a regex does not compile, a `multipleOf` is not positive, or a
    /// discriminator mapping names a schema outside its `oneOf`.
    pub fn load(
        root: Url,
        contract: Value,
        config: &ContractConfig,
    ) -> Result<Self, DocumentError> {
        let root = without_fragment(&root);
        let mut documents = HashMap::new();
        documents.insert(root.clone(), contract);
        let mut pending = vec![root.clone()];

        while let Some(url) = pending.pop() {
            let references = match documents.get(&url) {
                Some(document) => collect_references(document)?,
                None => continue,
            };
            for reference in references {
                let document_url = without_fragment(&join(&url, &reference)?);
                if documents.contains_key(&document_url) {
                    continue;
                }
                let document = fetch(&document_url, config)?;
                debug!(
                    url = %document_url,
                    referenced_from = %url,
                    "Fetched external contract document"
                );
                documents.insert(document_url.clone(), document);
                pending.push(document_url);
            }
        }

        verify(&documents)?;
        let engine = SchemaEngine::new(&documents)?;
        debug!(
            root = %root,
            documents_count = documents.len(),
            "Contract references verified"
        );
        Ok(Self {
            root,
            documents,
            engine,
        })
    }

    /// URL of the root contract (no fragment).
    #[must_use]
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// A loaded document by URL; the fragment is ignored.
    #[must_use]
    pub fn document(&self, url: &Url) -> Option<&Value> {
        self.documents.get(&without_fragment(url))
    }

    /// Number of loaded documents, the root included.
    #[must_use]
    pub fn documents_count(&self) -> usize {
        self.documents.len()
    }

    /// Resolve `reference` against `scope`.
    ///
    /// Returns the absolute target URL, which is the scope for interpreting the
    /// target, together with the target fragment.
    pub fn resolve<'a>(
        &'a self,
        scope: &Url,
        reference: &str,
    ) -> Result<(Url, &'a Value), DocumentError> {
        resolve_in(&self.documents, scope, reference)
    }

    pub(crate) fn engine(&self) -> &SchemaEngine {
        &self.engine
    }
}

fn resolve_in<'a>(
    documents: &'a HashMap<Url, Value>,
    scope: &Url,
    reference: &str,
) -> Result<(Url, &'a Value), DocumentError> {
    let target = join(scope, reference)?;
    let document = documents.get(&without_fragment(&target)).ok_or_else(|| {
        DocumentError::UnresolvableRef {
            reference: target.to_string(),
            reason: "document is not loaded".to_string(),
        }
    })?;

    let pointer = urlencoding::decode(target.fragment().unwrap_or("")).map_err(|err| {
        DocumentError::UnresolvableRef {
            reference: target.to_string(),
            reason: err.to_string(),
        }
    })?;
    let found = if pointer.is_empty() {
        Some(document)
    } else if pointer.starts_with('/') {
        document.pointer(&pointer)
    } else {
        return Err(DocumentError::UnresolvableRef {
            reference: target.to_string(),
            reason: "fragment is not a JSON pointer".to_string(),
        });
    };
    let value = found.ok_or_else(|| DocumentError::UnresolvableRef {
        reference: target.to_string(),
        reason: format!("'{pointer}' does not exist"),
    })?;
    Ok((target, value))
}

/// Check every reference, regex, `multipleOf` and discriminator in every document.
fn verify(documents: &HashMap<Url, Value>) -> Result<(), DocumentError> {
    let shape = discriminator_shape()?;
    for (url, document) in documents {
        walk_objects(document, &mut String::new(), &mut |pointer, map| {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                resolve_in(documents, url, reference)?;
            }
            verify_keywords(map, &format!("{url}#{pointer}"))?;
            let (Some(discriminator), Some(branches)) = (
                map.get("discriminator"),
                map.get("oneOf").and_then(Value::as_array),
            ) else {
                return Ok(());
            };

            let location = format!("{url}#{pointer}");
            if let Some(error) = shape.iter_errors(discriminator).next() {
                return Err(DocumentError::InvalidDiscriminator {
                    location,
                    reason: error.to_string(),
                });
            }
            let Some(discriminator) = Discriminator::from_schema(map, branches) else {
                return Err(DocumentError::InvalidDiscriminator {
                    location,
                    reason: "propertyName must be a string".to_string(),
                });
            };
            for value in discriminator.values() {
                if discriminator.branch_for(url, branches, value)?.is_none() {
                    return Err(DocumentError::InvalidDiscriminator {
                        location,
                        reason: format!("mapping for '{value}' does not name a oneOf branch"),
                    });
                }
            }
            Ok(())
        })?;
    }
    Ok(())
}

/// Keyword values the schema engine would only reject once a schema is compiled.
fn verify_keywords(map: &Map<String, Value>, location: &str) -> Result<(), DocumentError> {
    let mut patterns: Vec<&str> = Vec::new();
    if let Some(pattern) = map.get("pattern").and_then(Value::as_str) {
        patterns.push(pattern);
    }
    if let Some(keys) = map.get("patternProperties").and_then(Value::as_object) {
        patterns.extend(keys.keys().map(String::as_str));
    }
    for pattern in patterns {
        Regex::new(pattern).map_err(|err| DocumentError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
    }
    if let Some(divisor) = map.get("multipleOf").and_then(Value::as_f64) {
        if divisor <= 0.0 {
            return Err(DocumentError::InvalidSchema {
                location: location.to_string(),
                reason: format!("multipleOf must be greater than 0, found {divisor}"),
            });
        }
    }
    Ok(())
}

/// Draft 4 shape of an OpenAPI `discriminator` object.
fn discriminator_shape() -> Result<jsonschema::Validator, DocumentError> {
    let meta = json!({
        "type": "object",
        "properties": {
            "propertyName": { "type": "string" },
            "mapping": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            }
        },
        "required": ["propertyName"]
    });
    jsonschema::draft4::new(&meta).map_err(|err| DocumentError::InvalidDiscriminator {
        location: "discriminator meta-schema".to_string(),
        reason: err.to_string(),
    })
}

fn collect_references(document: &Value) -> Result<Vec<String>, DocumentError> {
    let mut references = Vec::new();
    walk_objects(document, &mut String::new(), &mut |_, map| {
        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            references.push(reference.to_string());
        }
        Ok(())
    })?;
    Ok(references)
}

/// Visit every object in `value` with its JSON pointer, parents before children.
fn walk_objects<'v, F>(
    value: &'v Value,
    pointer: &mut String,
    visit: &mut F,
) -> Result<(), DocumentError>
where
    F: FnMut(&str, &'v Map<String, Value>) -> Result<(), DocumentError>,
{
    match value {
        Value::Object(map) => {
            visit(pointer, map)?;
            for (key, child) in map {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&escape_pointer_token(key));
                walk_objects(child, pointer, visit)?;
                pointer.truncate(len);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let len = pointer.len();
                pointer.push('/');
                pointer.push_str(&index.to_string());
                walk_objects(child, pointer, visit)?;
                pointer.truncate(len);
            }
        }
        _ => {}
    }
    Ok(())
}

fn fetch(url: &Url, config: &ContractConfig) -> Result<Value, DocumentError> {
    if url.scheme() != "file" {
        return Err(DocumentError::UnsupportedScheme {
            url: url.to_string(),
        });
    }
    if !config.external_refs {
        return Err(DocumentError::ExternalRefsDisabled {
            url: url.to_string(),
        });
    }
    let path = url.to_file_path().map_err(|()| DocumentError::LoadFailed {
        url: url.to_string(),
        reason: "not a local file path".to_string(),
    })?;
    let text = std::fs::read_to_string(&path).map_err(|err| DocumentError::LoadFailed {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    parse_document_text(&text, &path).map_err(|reason| DocumentError::LoadFailed {
        url: url.to_string(),
        reason,
    })
}

/// Parse a contract document: YAML for `.yaml`/`.yml`, JSON otherwise.
pub(crate) fn parse_document_text(text: &str, path: &Path) -> Result<Value, String> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(text).map_err(|err| err.to_string())
    } else {
        serde_json::from_str(text).map_err(|err| err.to_string())
    }
}

pub(crate) fn join(base: &Url, reference: &str) -> Result<Url, DocumentError> {
    base.join(reference).map_err(|err| DocumentError::UnresolvableRef {
        reference: reference.to_string(),
        reason: err.to_string(),
    })
}

pub(crate) fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Escape one JSON pointer token (`~` → `~0`, `/` → `~1`).
pub(crate) fn escape_pointer_token(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}
