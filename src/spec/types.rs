use std::fmt;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde_json::Value;
use url::Url;

use crate::error::DocumentError;
use crate::media::MediaType;
use crate::params::ParameterSet;
use crate::resolver::RefResolver;
use crate::router::Router;
use crate::schema::SchemaNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    /// `required` as declared, `false` when omitted
    pub required: bool,
    pub schema: SchemaNode,
}

/// A request body: media types keyed by content type, in declaration order.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

/// One declared response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code or the literal `default`
    pub status: String,
    /// `None` when the response declares no content; its body is never validated
    pub content: Option<IndexMap<String, MediaType>>,
}

/// One HTTP method on a path template.
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: Method,
    pub operation_id: Option<String>,
    pub path_parameters: ParameterSet,
    pub query_parameters: ParameterSet,
    /// Header and cookie parameters are kept for introspection only
    pub other_parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
}

impl Operation {
    /// The response for `status`, falling back to `default`.
    #[must_use]
    pub fn response_for(&self, status: &str) -> Option<&Response> {
        self.responses
            .get(status)
            .or_else(|| self.responses.get("default"))
    }
}

/// The root contract, built once and immutable afterwards.
///
/// `Document` is `Send + Sync`; share it behind an `Arc` between workers.
#[derive(Debug)]
pub struct Document {
    pub(crate) openapi: String,
    pub(crate) resolver: Arc<RefResolver>,
    pub(crate) router: Router,
}

impl Document {
    /// The declared `openapi` version.
    #[must_use]
    pub fn openapi(&self) -> &str {
        &self.openapi
    }

    /// Base location of the root contract.
    #[must_use]
    pub fn base(&self) -> &Url {
        self.resolver.root()
    }

    /// The raw contract mapping.
    #[must_use]
    pub fn contract(&self) -> &Value {
        // the root document is inserted before anything else is loaded
        self.resolver.document(self.resolver.root()).unwrap_or(&Value::Null)
    }

    #[must_use]
    pub fn resolver(&self) -> &RefResolver {
        &self.resolver
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// A schema node for any reference, resolved against the root contract.
    pub fn schema(&self, reference: &str) -> Result<SchemaNode, DocumentError> {
        let (scope, schema) = self.resolver.resolve(self.resolver.root(), reference)?;
        SchemaNode::located(&self.resolver, schema, scope)
    }
}
