//! Router core: path template compilation and first-match lookup.

use http::Method;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::DocumentError;
use crate::params::ParameterSet;
use crate::spec::Operation;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters in placeholder order.
///
/// Names are `Arc<str>` shared with the compiled template; values are per-request.
pub type CaptureVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([0-9a-zA-Z_]+)\}").expect("placeholder regex is valid"));

/// Characters a placeholder may capture.
const SEGMENT_CLASS: &str = "([0-9a-zA-Z_\\-]+)";

/// A compiled path template: one capture group per placeholder, anchored at both ends.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
    names: Vec<Arc<str>>,
}

impl PathMatcher {
    /// Compile `template`, e.g. `/users/{id}` into `^/users/([0-9a-zA-Z_\-]+)$`.
    ///
    /// Literal text is escaped. A template without placeholders compiles to a
    /// fixed-string matcher through the same path.
    pub fn compile(template: &str) -> Result<Self, DocumentError> {
        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');
        let mut names: Vec<Arc<str>> = Vec::with_capacity(template.matches('{').count());
        let mut last = 0;

        for captures in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if names.iter().any(|existing| existing.as_ref() == name.as_str()) {
                return Err(DocumentError::DuplicatePathParameter {
                    template: template.to_string(),
                    name: name.as_str().to_string(),
                });
            }
            pattern.push_str(&regex::escape(&template[last..whole.start()]));
            pattern.push_str(SEGMENT_CLASS);
            names.push(Arc::from(name.as_str()));
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|err| DocumentError::InvalidPattern {
            pattern,
            reason: err.to_string(),
        })?;
        Ok(Self { regex, names })
    }

    /// Placeholder names in order of first occurrence.
    #[must_use]
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Captures for `path`, or `None` unless the whole path matches.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<CaptureVec> {
        let captures = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .zip(captures.iter().skip(1))
                .filter_map(|(name, group)| {
                    group.map(|group| (Arc::clone(name), group.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// A declared path with its compiled matcher, path parameters and operations.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    pub pattern: String,
    pub matcher: PathMatcher,
    /// Path parameters checked before the method is looked up; names the
    /// operations declare differently are left unconstrained
    pub path_parameters: ParameterSet,
    /// Operations in declaration order
    pub operations: IndexMap<Method, Operation>,
}

impl PathTemplate {
    #[must_use]
    pub fn operation(&self, method: &Method) -> Option<&Operation> {
        self.operations.get(method)
    }

    /// Declared methods, lowercase, in declaration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<String> {
        self.operations
            .keys()
            .map(|method| method.as_str().to_ascii_lowercase())
            .collect()
    }
}

/// Result of matching a concrete path.
#[derive(Debug, Clone)]
pub struct RouteMatch<'d> {
    pub template: &'d PathTemplate,
    pub path_params: CaptureVec,
}

impl RouteMatch<'_> {
    /// Get a captured path parameter by name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Path templates in declaration order.
///
/// Lookup returns the first template whose matcher accepts the whole path, so
/// overlapping templates resolve by document order.
#[derive(Debug, Clone, Default)]
pub struct Router {
    templates: Vec<PathTemplate>,
}

impl Router {
    #[must_use]
    pub fn new(templates: Vec<PathTemplate>) -> Self {
        let operations_count: usize = templates.iter().map(|t| t.operations.len()).sum();
        info!(
            templates_count = templates.len(),
            operations_count,
            "Routing table loaded"
        );
        Self { templates }
    }

    #[must_use]
    pub fn templates(&self) -> &[PathTemplate] {
        &self.templates
    }

    /// Find the first template matching `path`.
    #[must_use]
    pub fn route(&self, path: &str) -> Option<RouteMatch<'_>> {
        debug!(path = %path, "Route match attempt");
        let match_start = std::time::Instant::now();

        for template in &self.templates {
            if let Some(path_params) = template.matcher.captures(path) {
                debug!(
                    path = %path,
                    route_pattern = %template.pattern,
                    path_params = ?path_params,
                    duration_us = match_start.elapsed().as_micros(),
                    "Route matched"
                );
                return Some(RouteMatch {
                    template,
                    path_params,
                });
            }
        }

        warn!(
            path = %path,
            duration_us = match_start.elapsed().as_micros(),
            "No route matched"
        );
        None
    }

    /// Log every template and its methods at debug level.
    pub fn dump_routes(&self) {
        for template in &self.templates {
            debug!(
                route_pattern = %template.pattern,
                regex = %template.matcher.as_str(),
                methods = ?template.allowed_methods(),
                "Registered path template"
            );
        }
    }
}
