use serde_json::{json, Map, Value};
use url::Url;

use crate::error::DocumentError;
use crate::resolver::join;

/// A `discriminator` attached to a `oneOf`.
///
/// Mapping targets containing `#` or `/` are references; any other value, dots
/// included, is a schema name standing for `#/components/schemas/<name>`. Without
/// an explicit `mapping` every `$ref` branch is reachable under the last segment of
/// its pointer.
#[derive(Debug, Clone)]
pub(crate) struct Discriminator<'s> {
    pub(crate) property: &'s str,
    mapping: Vec<(String, String)>,
}

impl<'s> Discriminator<'s> {
    pub(crate) fn from_schema(
        schema: &'s Map<String, Value>,
        branches: &'s [Value],
    ) -> Option<Self> {
        let discriminator = schema.get("discriminator")?.as_object()?;
        let property = discriminator.get("propertyName")?.as_str()?;
        let mapping = match discriminator.get("mapping").and_then(Value::as_object) {
            Some(explicit) => explicit
                .iter()
                .filter_map(|(value, target)| {
                    target.as_str().map(|t| (value.clone(), mapping_target(t)))
                })
                .collect(),
            None => branches
                .iter()
                .filter_map(|branch| branch.get("$ref").and_then(Value::as_str))
                .map(|reference| {
                    let name = reference.rsplit('/').next().unwrap_or(reference);
                    (name.to_string(), reference.to_string())
                })
                .collect(),
        };
        Some(Self { property, mapping })
    }

    /// Declared discriminator values, in mapping order.
    pub(crate) fn values(&self) -> impl Iterator<Item = &str> {
        self.mapping.iter().map(|(value, _)| value.as_str())
    }

    /// Schema accepting objects whose discriminator property is a declared value.
    pub(crate) fn gate(&self) -> Value {
        let values: Vec<&str> = self.values().collect();
        json!({
            "type": "object",
            "properties": {
                self.property: { "type": "string", "enum": values }
            },
            "required": [self.property]
        })
    }

    /// Index of the `oneOf` branch the mapping selects for `value`.
    ///
    /// `Ok(None)` means the mapping names a schema that is not one of the branches.
    pub(crate) fn branch_for(
        &self,
        scope: &Url,
        branches: &[Value],
        value: &str,
    ) -> Result<Option<usize>, DocumentError> {
        let Some((_, target)) = self.mapping.iter().find(|(v, _)| v == value) else {
            return Ok(None);
        };
        let target = join(scope, target)?;
        for (index, branch) in branches.iter().enumerate() {
            if let Some(reference) = branch.get("$ref").and_then(Value::as_str) {
                if join(scope, reference)? == target {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }
}

fn mapping_target(target: &str) -> String {
    if target.contains(['#', '/']) {
        target.to_string()
    } else {
        format!("#/components/schemas/{target}")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn scope() -> Url {
        Url::parse("file:///srv/contract.yaml#/components/schemas/Pet").unwrap()
    }

    #[test]
    fn test_explicit_mapping_selects_branch() {
        let schema = json!({
            "oneOf": [{ "$ref": "#/CatSchema" }, { "$ref": "#/DogSchema" }],
            "discriminator": {
                "propertyName": "type",
                "mapping": { "cat": "#/CatSchema", "dog": "#/DogSchema" }
            }
        });
        let map = schema.as_object().unwrap();
        let branches = map["oneOf"].as_array().unwrap();
        let discriminator = Discriminator::from_schema(map, branches).unwrap();
        assert_eq!(discriminator.property, "type");
        assert_eq!(discriminator.branch_for(&scope(), branches, "dog").unwrap(), Some(1));
        assert_eq!(discriminator.branch_for(&scope(), branches, "fish").unwrap(), None);
    }

    #[test]
    fn test_bare_names_and_implicit_mapping() {
        let schema = json!({
            "oneOf": [
                { "$ref": "#/components/schemas/Cat" },
                { "$ref": "#/components/schemas/Dog" }
            ],
            "discriminator": { "propertyName": "kind", "mapping": { "c": "Cat" } }
        });
        let map = schema.as_object().unwrap();
        let branches = map["oneOf"].as_array().unwrap();
        let explicit = Discriminator::from_schema(map, branches).unwrap();
        assert_eq!(explicit.branch_for(&scope(), branches, "c").unwrap(), Some(0));

        let implicit_schema = json!({
            "oneOf": map["oneOf"].clone(),
            "discriminator": { "propertyName": "kind" }
        });
        let implicit_map = implicit_schema.as_object().unwrap();
        let implicit = Discriminator::from_schema(implicit_map, branches).unwrap();
        assert_eq!(implicit.values().collect::<Vec<_>>(), vec!["Cat", "Dog"]);
        assert_eq!(implicit.branch_for(&scope(), branches, "Dog").unwrap(), Some(1));
    }

    #[test]
    fn test_dotted_name_is_a_schema_name() {
        let schema = json!({
            "oneOf": [
                { "$ref": "#/components/schemas/Pet.v1" },
                { "$ref": "#/components/schemas/Pet.v2" }
            ],
            "discriminator": {
                "propertyName": "version",
                "mapping": { "2": "Pet.v2", "1": "./shared.yaml#/Pet" }
            }
        });
        let map = schema.as_object().unwrap();
        let branches = map["oneOf"].as_array().unwrap();
        let discriminator = Discriminator::from_schema(map, branches).unwrap();
        assert_eq!(discriminator.branch_for(&scope(), branches, "2").unwrap(), Some(1));
        assert_eq!(discriminator.branch_for(&scope(), branches, "1").unwrap(), None);
    }

    #[test]
    fn test_gate_schema() {
        let schema = json!({
            "oneOf": [{ "$ref": "#/A" }],
            "discriminator": { "propertyName": "t", "mapping": { "a": "#/A" } }
        });
        let map = schema.as_object().unwrap();
        let branches = map["oneOf"].as_array().unwrap();
        let gate = Discriminator::from_schema(map, branches).unwrap().gate();
        assert_eq!(gate["properties"]["t"]["enum"], json!(["a"]));
        assert_eq!(gate["required"], json!(["t"]));
    }
}
