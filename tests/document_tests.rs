#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use common::{document, query, BASE};
use oapi3::error::{ParamError, ValidationError};
use oapi3::spec::{build, Document, ParameterLocation};
use oapi3::DocumentError;
use serde_json::Value;

fn build_yaml(yaml: &str) -> Result<Document, DocumentError> {
    let contract: Value = serde_yaml::from_str(yaml).unwrap();
    build(contract, BASE)
}

#[test]
fn test_request_body_without_content() {
    let err = build_yaml(
        r#"
openapi: "3.0"
paths:
  /a:
    post:
      requestBody:
        required: true
      responses:
        "200": { description: ok }
"#,
    )
    .unwrap_err();
    assert!(matches!(err, DocumentError::MissingKey { key: "content", .. }), "{err}");
}

#[test]
fn test_operation_without_responses() {
    let err = build_yaml(
        r#"
openapi: "3.0"
paths:
  /a:
    get:
      operationId: a
"#,
    )
    .unwrap_err();
    match err {
        DocumentError::MissingKey { ref location, key } => {
            assert_eq!(key, "responses");
            assert_eq!(location, "file:///srv/contract.yaml#/paths/~1a/get");
        }
        ref other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unregistered_media_type() {
    let err = build_yaml(
        r#"
openapi: "3.0"
paths:
  /a:
    get:
      responses:
        "200":
          description: ok
          content:
            application/xml:
              schema: { type: string }
"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        DocumentError::UnsupportedMediaType {
            location: concat!(
                "file:///srv/contract.yaml#/paths/~1a/get/responses/200",
                "/content/application~1xml"
            )
            .to_string(),
            media_type: "application/xml".to_string(),
        }
    );
}

#[test]
fn test_duplicate_placeholder() {
    let err = build_yaml(
        r#"
openapi: "3.0"
paths:
  /a/{id}/b/{id}:
    get:
      responses:
        "200": { description: ok }
"#,
    )
    .unwrap_err();
    assert!(matches!(err, DocumentError::DuplicatePathParameter { ref name, .. } if name == "id"));
}

#[test]
fn test_invalid_pattern() {
    let err = build_yaml(
        r#"
openapi: "3.0"
paths:
  /a:
    get:
      parameters:
        - { name: q, in: query, schema: { type: string, pattern: "([a-z" } }
      responses:
        "200": { description: ok }
"#,
    )
    .unwrap_err();
    assert!(matches!(err, DocumentError::InvalidPattern { .. }), "{err}");
}

#[test]
fn test_version_and_paths_are_required() {
    assert!(matches!(
        build_yaml("openapi: \"2.0\"\npaths: {}\n").unwrap_err(),
        DocumentError::UnsupportedVersion { .. }
    ));
    assert!(matches!(
        build_yaml("openapi: \"3.0\"\n").unwrap_err(),
        DocumentError::MissingKey { key: "paths", .. }
    ));
    let empty = build_yaml("openapi: \"3.0\"\npaths: {}\n").unwrap();
    assert!(empty.router().templates().is_empty());
    assert_eq!(empty.base().as_str(), BASE);
}

const MERGED: &str = r#"
openapi: "3.0"
paths:
  /items/{id}:
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
      - { name: fields, in: query, schema: { type: string, enum: [short, long] } }
      - { name: X-Trace, in: header, required: true, schema: { type: string } }
    get:
      parameters:
        - { name: fields, in: query, schema: { type: string, enum: [all] } }
      responses:
        "200": { description: ok }
    delete:
      responses:
        "204": { description: ok }
"#;

#[test]
fn test_operation_parameters_override_path_item_parameters() {
    let doc = document(MERGED);
    let ok = doc
        .validate_request("/items/1", "get", &query(&[("fields", "all")]), None, b"")
        .unwrap();
    assert_eq!(ok.query_params["fields"], "all");

    let err = doc
        .validate_request("/items/1", "get", &query(&[("fields", "short")]), None, b"")
        .unwrap_err();
    assert!(matches!(err, ValidationError::QueryParamValidation(ParamError::Schema(_))));

    // path-item parameters apply where the operation declares nothing
    doc.validate_request("/items/1", "delete", &query(&[("fields", "short")]), None, b"")
        .unwrap();
}

#[test]
fn test_header_parameters_are_not_validated() {
    let doc = document(MERGED);
    let state = doc.validate_request("/items/1", "delete", &query(&[]), None, b"").unwrap();
    let header = &state.operation.other_parameters[0];
    assert_eq!(header.name, "X-Trace");
    assert_eq!(header.location, ParameterLocation::Header);
    assert!(state.template.path_parameters.get("id").is_some());
}

#[test]
fn test_document_is_shared_between_threads() {
    let doc = Arc::new(document(MERGED));
    std::thread::scope(|scope| {
        for worker in 0..8 {
            let doc = Arc::clone(&doc);
            scope.spawn(move || {
                for i in 0..50 {
                    let id = (worker * 100 + i).to_string();
                    let state = doc
                        .validate_request(&format!("/items/{id}"), "get", &query(&[]), None, b"")
                        .unwrap();
                    assert_eq!(state.path_params["id"].to_string(), id);
                    assert!(doc
                        .validate_request(&format!("/items/x{id}"), "get", &query(&[]), None, b"")
                        .is_err());
                }
            });
        }
    });
}

#[test]
fn test_non_positive_multiple_of_is_a_document_defect() {
    let err = build_yaml(
        r#"
openapi: "3.0"
paths:
  /counters:
    post:
      requestBody:
        content:
          application/json:
            schema: { type: integer, multipleOf: -1 }
      responses:
        "204": { description: stored }
"#,
    )
    .unwrap_err();
    assert!(matches!(err, DocumentError::InvalidSchema { .. }), "{err}");
}

#[test]
fn test_duplicate_media_type_essence_is_a_document_defect() {
    let err = build_yaml(
        r#"
openapi: "3.0"
paths:
  /a:
    post:
      requestBody:
        content:
          application/json:
            schema: { type: object }
          "application/json; charset=utf-8":
            schema: { type: string }
      responses:
        "204": { description: ok }
"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        DocumentError::DuplicateMediaType {
            location: "file:///srv/contract.yaml#/paths/~1a/post/requestBody/content".to_string(),
            essence: "application/json".to_string(),
        }
    );
}
