//! Single top-down pass from the raw contract to the typed [`Document`] tree.
//!
//! Every node that may carry `$ref` is resolved first; the typed node is built from
//! the resolved value and keeps the resolved location as its scope.

use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::info;
use url::Url;

use super::types::{Document, Operation, Parameter, ParameterLocation, RequestBody, Response};
use crate::error::DocumentError;
use crate::media::{essence, MediaKind, MediaType};
use crate::params::ParameterSet;
use crate::resolver::{escape_pointer_token, RefResolver};
use crate::router::{PathMatcher, PathTemplate, Router};
use crate::runtime_config::ContractConfig;
use crate::schema::SchemaNode;

const METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// A value inside a loaded document together with its absolute location.
#[derive(Debug, Clone)]
struct Located<'r> {
    value: &'r Value,
    location: Url,
}

impl<'r> Located<'r> {
    fn child(&self, key: &str) -> Option<Located<'r>> {
        let value = match self.value {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
        let mut location = self.location.clone();
        let token = escape_pointer_token(key).replace('%', "%25");
        let fragment = format!("{}/{}", self.location.fragment().unwrap_or(""), token);
        location.set_fragment(Some(&fragment));
        Some(Located { value, location })
    }

    fn require(&self, key: &'static str) -> Result<Located<'r>, DocumentError> {
        self.child(key).ok_or_else(|| DocumentError::MissingKey {
            location: self.location.to_string(),
            key,
        })
    }

    fn object(&self) -> Result<&'r Map<String, Value>, DocumentError> {
        self.value.as_object().ok_or_else(|| self.invalid("an object"))
    }

    fn invalid(&self, expected: &'static str) -> DocumentError {
        DocumentError::InvalidNode {
            location: self.location.to_string(),
            expected,
        }
    }
}

struct Builder<'r> {
    resolver: &'r Arc<RefResolver>,
    max_ref_chain: usize,
}

/// Build the document tree for an already parsed contract.
pub(crate) fn build_document(
    contract: Value,
    base: Url,
    config: &ContractConfig,
) -> Result<Document, DocumentError> {
    let openapi = check_version(&contract)?;
    if contract.get("paths").is_none() {
        return Err(DocumentError::MissingKey {
            location: base.to_string(),
            key: "paths",
        });
    }

    let resolver = Arc::new(RefResolver::load(base, contract, config)?);
    let builder = Builder {
        resolver: &resolver,
        max_ref_chain: config.max_ref_chain,
    };
    let templates = builder.templates()?;
    let router = Router::new(templates);
    router.dump_routes();

    info!(
        base = %resolver.root(),
        openapi = %openapi,
        templates_count = router.templates().len(),
        documents_count = resolver.documents_count(),
        "Contract document built"
    );
    Ok(Document {
        openapi,
        resolver,
        router,
    })
}

fn check_version(contract: &Value) -> Result<String, DocumentError> {
    let found = contract.get("openapi").and_then(Value::as_str);
    match found {
        Some(version) if version == "3.0" || version.starts_with("3.0.") => Ok(version.to_string()),
        _ => Err(DocumentError::UnsupportedVersion {
            found: found.map(str::to_string),
        }),
    }
}

impl<'r> Builder<'r> {
    fn root(&self) -> Result<Located<'r>, DocumentError> {
        let resolver: &'r RefResolver = self.resolver;
        let location = resolver.root().clone();
        let value = resolver
            .document(&location)
            .ok_or_else(|| DocumentError::LoadFailed {
                url: location.to_string(),
                reason: "root document is not loaded".to_string(),
            })?;
        Ok(Located { value, location })
    }

    /// Follow a `$ref` chain to the value it finally names.
    fn resolve(&self, node: Located<'r>) -> Result<Located<'r>, DocumentError> {
        let resolver: &'r RefResolver = self.resolver;
        let mut current = node;
        let mut hops = 0;
        while let Some(reference) = current.value.get("$ref").and_then(Value::as_str) {
            hops += 1;
            if hops > self.max_ref_chain {
                return Err(DocumentError::RefChainTooLong {
                    location: current.location.to_string(),
                    limit: self.max_ref_chain,
                });
            }
            let (location, value) = resolver.resolve(&current.location, reference)?;
            current = Located { value, location };
        }
        Ok(current)
    }

    fn templates(&self) -> Result<Vec<PathTemplate>, DocumentError> {
        let paths = self.root()?.require("paths")?;
        let mut templates = Vec::new();
        for pattern in paths.object()?.keys() {
            let Some(item) = paths.child(pattern) else {
                continue;
            };
            templates.push(self.path_template(pattern, self.resolve(item)?)?);
        }
        Ok(templates)
    }

    fn path_template(
        &self,
        pattern: &str,
        item: Located<'r>,
    ) -> Result<PathTemplate, DocumentError> {
        let matcher = PathMatcher::compile(pattern)?;
        let shared = self.parameters(item.child("parameters"))?;

        let mut operations = IndexMap::new();
        for key in item.object()?.keys() {
            if !METHODS.contains(&key.as_str()) {
                continue;
            }
            let Some(node) = item.child(key) else {
                continue;
            };
            let method = Method::from_bytes(key.to_ascii_uppercase().as_bytes())
                .map_err(|_| node.invalid("an HTTP method"))?;
            let operation = self.operation(method.clone(), self.resolve(node)?, &shared)?;
            operations.insert(method, operation);
        }

        let path_parameters = self.template_path_parameters(&shared, &operations)?;
        Ok(PathTemplate {
            pattern: pattern.to_string(),
            matcher,
            path_parameters: ParameterSet::new(
                self.resolver,
                ParameterLocation::Path,
                path_parameters,
            )?,
            operations,
        })
    }

    /// Path parameters checked before the method is known.
    ///
    /// A name keeps its declaration when every operation declares it identically.
    /// A name the operations disagree on is only checked once the operation is
    /// selected, so it stays unconstrained here.
    fn template_path_parameters(
        &self,
        shared: &[Parameter],
        operations: &IndexMap<Method, Operation>,
    ) -> Result<Vec<Parameter>, DocumentError> {
        let mut declared: IndexMap<String, Vec<&Parameter>> = IndexMap::new();
        for parameter in shared.iter().filter(|p| p.location == ParameterLocation::Path) {
            declared.entry(parameter.name.clone()).or_default();
        }
        for operation in operations.values() {
            for parameter in operation.path_parameters.iter() {
                declared
                    .entry(parameter.name.clone())
                    .or_default()
                    .push(parameter);
            }
        }

        let mut parameters = Vec::with_capacity(declared.len());
        for (name, declarations) in declared {
            let agreed = match declarations.as_slice() {
                [] => shared.iter().find(|p| p.name == name).cloned(),
                [first, rest @ ..] if declarations.len() == operations.len()
                    && rest.iter().all(|other| same_declaration(first, other)) =>
                {
                    Some((*first).clone())
                }
                _ => None,
            };
            let parameter = match agreed {
                Some(parameter) => parameter,
                None => Parameter {
                    name,
                    location: ParameterLocation::Path,
                    required: false,
                    schema: SchemaNode::synthesized(self.resolver, json!({}))?,
                },
            };
            parameters.push(parameter);
        }
        Ok(parameters)
    }

    fn operation(
        &self,
        method: Method,
        node: Located<'r>,
        shared: &[Parameter],
    ) -> Result<Operation, DocumentError> {
        let mut merged: IndexMap<(ParameterLocation, String), Parameter> = shared
            .iter()
            .map(|p| ((p.location, p.name.clone()), p.clone()))
            .collect();
        for parameter in self.parameters(node.child("parameters"))? {
            merged.insert((parameter.location, parameter.name.clone()), parameter);
        }

        let mut path = Vec::new();
        let mut query = Vec::new();
        let mut other_parameters = Vec::new();
        for parameter in merged.into_values() {
            match parameter.location {
                ParameterLocation::Path => path.push(parameter),
                ParameterLocation::Query => query.push(parameter),
                ParameterLocation::Header | ParameterLocation::Cookie => {
                    other_parameters.push(parameter);
                }
            }
        }

        let request_body = match node.child("requestBody") {
            Some(body) => Some(self.request_body(self.resolve(body)?)?),
            None => None,
        };

        let responses_node = node.require("responses")?;
        let mut responses = IndexMap::new();
        for status in responses_node.object()?.keys() {
            let Some(response) = responses_node.child(status) else {
                continue;
            };
            let response = self.response(status, self.resolve(response)?)?;
            responses.insert(status.clone(), response);
        }

        Ok(Operation {
            method,
            operation_id: node
                .value
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string),
            path_parameters: ParameterSet::new(self.resolver, ParameterLocation::Path, path)?,
            query_parameters: ParameterSet::new(self.resolver, ParameterLocation::Query, query)?,
            other_parameters,
            request_body,
            responses,
        })
    }

    fn parameters(&self, node: Option<Located<'r>>) -> Result<Vec<Parameter>, DocumentError> {
        let Some(node) = node else {
            return Ok(Vec::new());
        };
        let count = node.value.as_array().ok_or_else(|| node.invalid("an array"))?.len();
        let mut parameters = Vec::with_capacity(count);
        for index in 0..count {
            let Some(entry) = node.child(&index.to_string()) else {
                continue;
            };
            parameters.push(self.parameter(self.resolve(entry)?)?);
        }
        Ok(parameters)
    }

    fn parameter(&self, node: Located<'r>) -> Result<Parameter, DocumentError> {
        let name = node
            .require("name")?
            .value
            .as_str()
            .ok_or_else(|| node.invalid("a parameter with a string name"))?
            .to_string();
        let location = node
            .require("in")?
            .value
            .as_str()
            .and_then(ParameterLocation::parse)
            .ok_or_else(|| node.invalid("a parameter located in path, query, header or cookie"))?;
        let required = node
            .value
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Parameter {
            name,
            location,
            required,
            schema: self.schema(node.child("schema"))?,
        })
    }

    fn request_body(&self, node: Located<'r>) -> Result<RequestBody, DocumentError> {
        let content = node.require("content")?;
        Ok(RequestBody {
            required: node
                .value
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            content: self.content(content)?,
        })
    }

    fn response(&self, status: &str, node: Located<'r>) -> Result<Response, DocumentError> {
        let content = match node.child("content") {
            Some(content) if content.value.as_object().is_some_and(|map| !map.is_empty()) => {
                Some(self.content(content)?)
            }
            _ => None,
        };
        Ok(Response {
            status: status.to_string(),
            content,
        })
    }

    fn content(&self, node: Located<'r>) -> Result<IndexMap<String, MediaType>, DocumentError> {
        let mut content = IndexMap::new();
        for declared in node.object()?.keys() {
            let Some(entry) = node.child(declared) else {
                continue;
            };
            let content_type = essence(declared);
            let kind = MediaKind::lookup(&content_type).ok_or_else(|| {
                DocumentError::UnsupportedMediaType {
                    location: entry.location.to_string(),
                    media_type: declared.clone(),
                }
            })?;
            if content.contains_key(&content_type) {
                return Err(DocumentError::DuplicateMediaType {
                    location: node.location.to_string(),
                    essence: content_type,
                });
            }
            let entry = self.resolve(entry)?;
            let media_type = MediaType {
                content_type: content_type.clone(),
                kind,
                schema: self.schema(entry.child("schema"))?,
            };
            content.insert(content_type, media_type);
        }
        Ok(content)
    }

    /// A schema node bound to the scope it resolves to; absent schemas accept anything.
    fn schema(&self, node: Option<Located<'r>>) -> Result<SchemaNode, DocumentError> {
        match node {
            Some(node) => {
                let node = self.resolve(node)?;
                SchemaNode::located(self.resolver, node.value, node.location)
            }
            None => SchemaNode::synthesized(self.resolver, json!({})),
        }
    }
}

/// Two declarations of one path parameter that constrain it the same way.
fn same_declaration(a: &Parameter, b: &Parameter) -> bool {
    let document = |p: &Parameter| {
        let mut url = p.schema.scope().clone();
        url.set_fragment(None);
        url
    };
    a.required == b.required
        && (a.schema.embed() == b.schema.embed()
            || (a.schema.schema() == b.schema.schema() && document(a) == document(b)))
}
