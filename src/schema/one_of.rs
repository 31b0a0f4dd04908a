//! OpenAPI `oneOf`, with `discriminator` and `nullable` on the same schema object.
//!
//! Branches of a located `oneOf` are shared from the [`BranchTable`]. Each branch
//! is entered at most once per instance value on a thread's call stack; a repeated
//! (branch, instance) pair counts as satisfied so self-referential schemas terminate.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Weak;

use jsonschema::{Keyword, Registry, ValidationError, Validator};
use serde_json::{Map, Value};
use tracing::trace;
use url::Url;

use super::discriminator::Discriminator;
use super::engine::{self, BranchTable, LOCATION_KEY};
use super::violation::SchemaViolation;

thread_local! {
    static ACTIVE_BRANCHES: RefCell<HashSet<(usize, usize)>> = RefCell::new(HashSet::new());
}

enum Branches {
    /// Branches of a schema inside a loaded document, addressed by location
    Shared {
        table: Weak<BranchTable>,
        locations: Vec<String>,
    },
    /// Branches of an in-memory schema, compiled with the keyword
    Owned(Vec<Validator>),
}

struct Selection {
    gate: Validator,
    property: String,
    /// Discriminator value and the index of the branch it selects
    targets: Vec<(String, usize)>,
}

pub(super) struct OneOf {
    branches: Branches,
    labels: Vec<String>,
    nullable: bool,
    selection: Option<Selection>,
}

impl OneOf {
    pub(super) fn compile<'a>(
        parent: &'a Map<String, Value>,
        value: &'a Value,
        registry: &Registry,
        table: &Weak<BranchTable>,
    ) -> Result<Self, ValidationError<'a>> {
        let Some(branches) = value.as_array() else {
            return Err(ValidationError::schema("oneOf must be an array"));
        };
        let location = parent.get(LOCATION_KEY).and_then(Value::as_str);
        let compiled = match location {
            Some(location) => Branches::Shared {
                table: table.clone(),
                locations: (0..branches.len())
                    .map(|index| format!("{location}/oneOf/{index}"))
                    .collect(),
            },
            None => Branches::Owned(
                branches
                    .iter()
                    .map(|branch| engine::options(registry, table).build(branch))
                    .collect::<Result<_, _>>()?,
            ),
        };
        let selection = match parent.get("discriminator") {
            Some(_) => Some(Selection::compile(parent, branches, location)?),
            None => None,
        };
        Ok(Self {
            branches: compiled,
            labels: branches.iter().map(label).collect(),
            nullable: parent.get("nullable").and_then(Value::as_bool) == Some(true),
            selection,
        })
    }

    fn evaluate(&self, instance: &Value) -> Option<SchemaViolation> {
        if self.nullable && instance.is_null() {
            return None;
        }
        if let Some(selection) = &self.selection {
            if let Some(first) = selection.gate.iter_errors(instance).next() {
                return Some(SchemaViolation::from_error(&first));
            }
            let index = selection.target(instance)?;
            return self.visit(index, instance, None, |branch| {
                branch
                    .iter_errors(instance)
                    .next()
                    .map(|error| SchemaViolation::from_error(&error))
            });
        }

        let mut matched = Vec::new();
        let mut context = Vec::new();
        for index in 0..self.labels.len() {
            let errors: Vec<SchemaViolation> = self.visit(index, instance, Vec::new(), |branch| {
                branch
                    .iter_errors(instance)
                    .map(|error| SchemaViolation::from_error(&error))
                    .collect()
            });
            if errors.is_empty() {
                matched.push(index);
            } else {
                context.extend(errors);
            }
        }
        match matched.as_slice() {
            [] => Some(
                SchemaViolation::new(
                    "oneOf",
                    format!("{instance} is not valid under any of the given schemas"),
                )
                .with_context(context),
            ),
            [_] => None,
            ambiguous => {
                let labels: Vec<&str> = ambiguous
                    .iter()
                    .map(|&index| self.labels[index].as_str())
                    .collect();
                Some(SchemaViolation::new(
                    "oneOf",
                    format!("{instance} is valid under each of {}", labels.join(", ")),
                ))
            }
        }
    }

    fn matches(&self, instance: &Value) -> bool {
        if self.nullable && instance.is_null() {
            return true;
        }
        if let Some(selection) = &self.selection {
            if !selection.gate.is_valid(instance) {
                return false;
            }
            return match selection.target(instance) {
                Some(index) => {
                    self.visit(index, instance, true, |branch| branch.is_valid(instance))
                }
                None => true,
            };
        }
        let mut matched = 0;
        for index in 0..self.labels.len() {
            if self.visit(index, instance, true, |branch| branch.is_valid(instance)) {
                matched += 1;
                if matched > 1 {
                    return false;
                }
            }
        }
        matched == 1
    }

    /// Run `f` against branch `index`, or return `satisfied` when the branch is
    /// already active for this instance.
    fn visit<T>(
        &self,
        index: usize,
        instance: &Value,
        satisfied: T,
        f: impl FnOnce(&Validator) -> T,
    ) -> T {
        match &self.branches {
            Branches::Owned(validators) => match validators.get(index) {
                Some(branch) => f(branch),
                None => satisfied,
            },
            Branches::Shared { table, locations } => {
                let Some(table) = table.upgrade() else {
                    return satisfied;
                };
                let branch = locations
                    .get(index)
                    .and_then(|location| table.get(location));
                let Some(branch) = branch else {
                    return satisfied;
                };
                let key = (
                    branch as *const Validator as usize,
                    instance as *const Value as usize,
                );
                if !ACTIVE_BRANCHES.with(|active| active.borrow_mut().insert(key)) {
                    trace!(
                        branch = %locations[index],
                        "oneOf branch re-entered for the same instance, treating as satisfied"
                    );
                    return satisfied;
                }
                let out = f(branch);
                ACTIVE_BRANCHES.with(|active| active.borrow_mut().remove(&key));
                out
            }
        }
    }
}

impl Keyword for OneOf {
    fn validate<'i>(&self, instance: &'i Value) -> Result<(), ValidationError<'i>> {
        match self.evaluate(instance) {
            Some(violation) => Err(ValidationError::custom(violation.encode())),
            None => Ok(()),
        }
    }

    fn is_valid(&self, instance: &Value) -> bool {
        self.matches(instance)
    }
}

impl Selection {
    fn compile<'a>(
        parent: &'a Map<String, Value>,
        branches: &'a [Value],
        location: Option<&str>,
    ) -> Result<Self, ValidationError<'a>> {
        let discriminator = Discriminator::from_schema(parent, branches)
            .ok_or_else(|| ValidationError::schema("discriminator propertyName must be a string"))?;
        let scope = Url::parse(location.unwrap_or("json-schema:///"))
            .map_err(|err| ValidationError::schema(err.to_string()))?;
        let mut targets = Vec::new();
        for value in discriminator.values() {
            let index = discriminator
                .branch_for(&scope, branches, value)
                .map_err(|err| ValidationError::schema(err.to_string()))?
                .ok_or_else(|| {
                    ValidationError::schema(format!(
                        "discriminator mapping for '{value}' does not name a oneOf branch"
                    ))
                })?;
            targets.push((value.to_string(), index));
        }
        let gate = jsonschema::draft4::new(&discriminator.gate())?;
        Ok(Self {
            gate,
            property: discriminator.property.to_string(),
            targets,
        })
    }

    fn target(&self, instance: &Value) -> Option<usize> {
        let value = instance.get(&self.property).and_then(Value::as_str)?;
        self.targets
            .iter()
            .find(|(declared, _)| declared == value)
            .map(|(_, index)| *index)
    }
}

fn label(branch: &Value) -> String {
    match branch.get("$ref").and_then(Value::as_str) {
        Some(reference) => reference.to_string(),
        None => {
            let mut branch = branch.clone();
            if let Value::Object(map) = &mut branch {
                map.remove(LOCATION_KEY);
            }
            branch.to_string()
        }
    }
}
