#![allow(dead_code)]

use oapi3::params::QueryParams;
use oapi3::spec::{build, Document};
use serde_json::Value;

pub const BASE: &str = "file:///srv/contract.yaml";

/// Build a document from inline YAML under [`BASE`].
pub fn document(yaml: &str) -> Document {
    let contract: Value = serde_yaml::from_str(yaml).expect("test contract is valid YAML");
    build(contract, BASE).expect("test contract builds")
}

pub fn query(pairs: &[(&str, &str)]) -> QueryParams {
    let mut query = QueryParams::new();
    for (key, value) in pairs {
        query
            .entry((*key).to_string())
            .or_default()
            .push((*value).to_string());
    }
    query
}

pub mod temp_files {
    use std::path::{Path, PathBuf};

    /// Write `content` to `name` inside `dir`, returning the full path.
    pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write temp contract file");
        path
    }
}
