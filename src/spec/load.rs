//! Entry points from a contract mapping, contract text, or a contract file.

use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use url::Url;

use super::build::build_document;
use super::types::Document;
use crate::error::DocumentError;
use crate::resolver::parse_document_text;
use crate::runtime_config::ContractConfig;

/// Build a document from a parsed contract with the default configuration.
///
/// `base_location` is the URL (or filesystem path) relative references in the
/// contract are resolved against.
pub fn build(contract: Value, base_location: &str) -> Result<Document, DocumentError> {
    build_with_config(contract, base_location, &ContractConfig::default())
}

/// Build a document with an explicit configuration.
pub fn build_with_config(
    contract: Value,
    base_location: &str,
    config: &ContractConfig,
) -> Result<Document, DocumentError> {
    build_document(contract, base_url(base_location)?, config)
}

/// Interpret `base_location` as an absolute URL, or else as a filesystem path.
pub fn base_url(base_location: &str) -> Result<Url, DocumentError> {
    let invalid = || DocumentError::InvalidBaseLocation {
        base: base_location.to_string(),
    };
    // single letters are Windows drive prefixes, not schemes
    if let Ok(url) = Url::parse(base_location) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = Path::new(base_location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_err(|_| invalid())?.join(path)
    };
    Url::from_file_path(&absolute).map_err(|()| invalid())
}

/// Parse YAML contract text and build it.
pub fn from_yaml_str(text: &str, base_location: &str) -> anyhow::Result<Document> {
    let contract: Value = serde_yaml::from_str(text).context("failed to parse contract YAML")?;
    build_with_config(contract, base_location, &ContractConfig::from_env())
        .with_context(|| format!("failed to build contract at {base_location}"))
}

/// Parse JSON contract text and build it.
pub fn from_json_str(text: &str, base_location: &str) -> anyhow::Result<Document> {
    let contract: Value = serde_json::from_str(text).context("failed to parse contract JSON")?;
    build_with_config(contract, base_location, &ContractConfig::from_env())
        .with_context(|| format!("failed to build contract at {base_location}"))
}

/// Load a contract file: YAML for `.yaml`/`.yml`, JSON otherwise.
///
/// The canonical path of the file is the base location.
pub fn load_contract(path: impl AsRef<Path>) -> anyhow::Result<Document> {
    let path = path.as_ref();
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to locate contract {}", path.display()))?;
    let text = std::fs::read_to_string(&canonical)
        .with_context(|| format!("failed to read contract {}", canonical.display()))?;
    let contract = parse_document_text(&text, &canonical)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("failed to parse contract {}", canonical.display()))?;
    let base = Url::from_file_path(&canonical)
        .map_err(|()| anyhow::anyhow!("not a file path: {}", canonical.display()))?;
    build_document(contract, base, &ContractConfig::from_env())
        .with_context(|| format!("failed to build contract {}", canonical.display()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_base_url_accepts_urls_and_paths() {
        assert_eq!(
            base_url("file:///srv/api.yaml").unwrap().as_str(),
            "file:///srv/api.yaml"
        );
        assert_eq!(base_url("/srv/api.yaml").unwrap().as_str(), "file:///srv/api.yaml");
        let relative = base_url("api.yaml").unwrap();
        assert_eq!(relative.scheme(), "file");
        assert!(relative.path().ends_with("/api.yaml"));
    }
}
