#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{document, query};
use oapi3::error::{ParamError, ValidationError};
use oapi3::media::BodyValue;
use oapi3::spec::Document;
use serde_json::json;

const PET_STORE: &str = r##"
openapi: "3.0.3"
paths:
  /pets:
    get:
      operationId: list_pets
      parameters:
        - name: limit
          in: query
          schema: { type: integer, minimum: 1, maximum: 100 }
        - name: tag
          in: query
          required: true
          schema: { type: string }
      responses:
        "200":
          description: ok
    post:
      operationId: add_pet
      requestBody:
        required: true
        content:
          application/json:
            schema: { $ref: "#/components/schemas/Pet" }
      responses:
        "201": { description: created }
  /pets/{id}:
    parameters:
      - name: id
        in: path
        required: true
        schema: { type: integer }
    get:
      operationId: get_pet
      responses:
        "200": { description: ok }
    put:
      operationId: update_pet
      requestBody:
        content:
          application/json:
            schema: { $ref: "#/components/schemas/Pet" }
          text/plain:
            schema: { type: string }
      responses:
        "204": { description: updated }
  /pets/{id}/sound:
    parameters:
      - name: id
        in: path
        required: true
        schema: { type: integer }
    post:
      requestBody:
        required: true
        content:
          audio/x-wav: {}
      responses:
        "204": { description: stored }
  /pets/mine:
    get:
      responses:
        "200": { description: ok }
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name: { type: string, minLength: 1 }
        tag: { type: string, nullable: true }
      additionalProperties: false
"##;

fn pet_store() -> Document {
    document(PET_STORE)
}

#[test]
fn test_path_parameter_is_coerced() {
    let doc = pet_store();
    let state = doc.validate_request("/pets/42", "get", &query(&[]), None, b"").unwrap();
    assert_eq!(state.template.pattern, "/pets/{id}");
    assert_eq!(state.operation.operation_id.as_deref(), Some("get_pet"));
    assert_eq!(state.path_params["id"], json!(42));
    assert_eq!(state.body_value, BodyValue::Empty);
    assert!(state.media_type.is_none());
}

#[test]
fn test_path_parameter_type_error() {
    let doc = pet_store();
    let err = doc.validate_request("/pets/abc", "get", &query(&[]), None, b"").unwrap_err();
    match err {
        ValidationError::PathParamValidation(ParamError::Type(ref type_error)) => {
            assert_eq!(type_error.name, "id");
            assert_eq!(type_error.value, "abc");
            assert_eq!(type_error.expected, "integer");
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.code(), "PathParamValidationError");
}

#[test]
fn test_unknown_path() {
    let doc = pet_store();
    let err = doc.validate_request("/owners/1", "get", &query(&[]), None, b"").unwrap_err();
    assert_eq!(
        err,
        ValidationError::PathNotFound {
            path: "/owners/1".to_string()
        }
    );
}

#[test]
fn test_earlier_template_wins() {
    // "/pets/{id}" is declared before "/pets/mine" and captures "mine"
    let doc = pet_store();
    let err = doc.validate_request("/pets/mine", "get", &query(&[]), None, b"").unwrap_err();
    assert!(matches!(err, ValidationError::PathParamValidation(_)));
}

#[test]
fn test_operation_not_allowed_lists_declared_methods() {
    let doc = pet_store();
    let err = doc.validate_request("/pets/42", "post", &query(&[]), None, b"").unwrap_err();
    assert_eq!(
        err,
        ValidationError::OperationNotAllowed {
            method: "post".to_string(),
            allowed: vec!["get".to_string(), "put".to_string()],
        }
    );
    let err = doc.validate_request("/pets/42", "BREW", &query(&[]), None, b"").unwrap_err();
    assert!(matches!(
        err,
        ValidationError::OperationNotAllowed { ref method, .. } if method == "brew"
    ));
}

#[test]
fn test_method_is_case_insensitive() {
    let doc = pet_store();
    let state = doc.validate_request("/pets/7", "gEt", &query(&[]), None, b"").unwrap();
    assert_eq!(state.method, http::Method::GET);
}

#[test]
fn test_query_parameters() {
    let doc = pet_store();
    let state = doc
        .validate_request("/pets", "get", &query(&[("tag", "dog"), ("limit", "10")]), None, b"")
        .unwrap();
    assert_eq!(state.query_params["limit"], json!(10));
    assert_eq!(state.query_params["tag"], json!("dog"));

    let missing = doc
        .validate_request("/pets", "get", &query(&[("limit", "10")]), None, b"")
        .unwrap_err();
    assert!(matches!(
        missing,
        ValidationError::QueryParamValidation(ParamError::Schema(ref v))
            if v.message == "\"tag\" is a required property"
    ));

    let unknown = doc
        .validate_request("/pets", "get", &query(&[("tag", "dog"), ("debug", "1")]), None, b"")
        .unwrap_err();
    assert!(matches!(
        unknown,
        ValidationError::QueryParamValidation(ParamError::Schema(ref v))
            if v.keyword == "additionalProperties"
    ));

    let not_a_number = doc
        .validate_request("/pets", "get", &query(&[("tag", "dog"), ("limit", "ten")]), None, b"")
        .unwrap_err();
    assert!(matches!(not_a_number, ValidationError::QueryParamValidation(ParamError::Type(_))));

    let out_of_range = doc
        .validate_request("/pets", "get", &query(&[("tag", "dog"), ("limit", "0")]), None, b"")
        .unwrap_err();
    assert_eq!(out_of_range.code(), "QueryParamValidationError");
    assert_eq!(out_of_range.status(), http::StatusCode::BAD_REQUEST);
}

#[test]
fn test_repeated_query_key_uses_last_value() {
    let doc = pet_store();
    let state = doc
        .validate_request(
            "/pets",
            "get",
            &query(&[("tag", "dog"), ("limit", "500"), ("limit", "5")]),
            None,
            b"",
        )
        .unwrap();
    assert_eq!(state.query_params["limit"], json!(5));
    assert_eq!(state.query["limit"], vec!["500", "5"]);
}

#[test]
fn test_json_body_round_trip() {
    let doc = pet_store();
    let body = br#"{"name":"Rex","tag":null}"#;
    let state = doc
        .validate_request("/pets", "POST", &query(&[]), Some("application/json"), body)
        .unwrap();
    assert_eq!(state.body_value, BodyValue::Json(json!({ "name": "Rex", "tag": null })));
    assert_eq!(state.media_type.unwrap().content_type, "application/json");
    assert_eq!(state.body, body.to_vec());
}

#[test]
fn test_content_type_parameters_are_ignored() {
    let doc = pet_store();
    let state = doc
        .validate_request(
            "/pets",
            "post",
            &query(&[]),
            Some("Application/JSON; charset=utf-8"),
            br#"{"name":"Rex"}"#,
        )
        .unwrap();
    assert!(state.body_value.as_json().is_some());
}

#[test]
fn test_body_errors() {
    let doc = pet_store();
    let invalid = doc
        .validate_request("/pets", "post", &query(&[]), Some("application/json"), br#"{"name":""}"#)
        .unwrap_err();
    match invalid {
        ValidationError::BodyValidation(ref violation) => {
            assert_eq!(violation.pointer(), "/name");
            assert_eq!(violation.message, "\"\" is shorter than 1 character");
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(invalid.to_string(), "invalid body: /name: \"\" is shorter than 1 character");

    let garbage = doc
        .validate_request("/pets", "post", &query(&[]), Some("application/json"), b"{\"name\":")
        .unwrap_err();
    assert!(matches!(garbage, ValidationError::JsonDecode { .. }));

    let not_utf8 = doc
        .validate_request("/pets", "post", &query(&[]), Some("application/json"), &[0xff, 0xfe])
        .unwrap_err();
    assert!(matches!(not_utf8, ValidationError::JsonDecode { .. }));
}

#[test]
fn test_media_type_not_allowed() {
    let doc = pet_store();
    let err = doc
        .validate_request("/pets", "post", &query(&[]), Some("application/xml"), b"<pet/>")
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::MediaTypeNotAllowed {
            media_type: Some("application/xml".to_string()),
            allowed: vec!["application/json".to_string()],
        }
    );
    assert_eq!(err.status(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);

    // a required body cannot be omitted
    let err = doc.validate_request("/pets", "post", &query(&[]), None, b"").unwrap_err();
    assert!(matches!(err, ValidationError::MediaTypeNotAllowed { media_type: None, .. }));
}

#[test]
fn test_optional_body_may_be_omitted() {
    let doc = pet_store();
    let state = doc.validate_request("/pets/3", "put", &query(&[]), None, b"").unwrap();
    assert!(state.media_type.is_none());
    assert_eq!(state.body_value, BodyValue::Empty);

    let text = doc
        .validate_request("/pets/3", "put", &query(&[]), Some("text/plain"), b"not checked")
        .unwrap();
    assert_eq!(text.body_value, BodyValue::Empty);
    assert_eq!(text.media_type.unwrap().content_type, "text/plain");
}

#[test]
fn test_binary_body_is_returned_unchanged() {
    let doc = pet_store();
    let wav = [0x52, 0x49, 0x46, 0x46, 0x00];
    let state = doc
        .validate_request("/pets/3/sound", "post", &query(&[]), Some("audio/x-wav"), &wav)
        .unwrap();
    assert_eq!(state.body_value, BodyValue::Binary(wav.to_vec()));
}

#[test]
fn test_problem_body() {
    let doc = pet_store();
    let err = doc.validate_request("/nope", "get", &query(&[]), None, b"").unwrap_err();
    let problem = serde_json::to_value(err.problem()).unwrap();
    assert_eq!(problem, json!({ "code": "PathNotFound", "message": "path '/nope' not found" }));
}

#[test]
fn test_extreme_integer_body_against_multiple_of() {
    let doc = document(
        r#"
openapi: "3.0"
paths:
  /counters:
    post:
      requestBody:
        content:
          application/json:
            schema: { type: integer, multipleOf: 2 }
      responses:
        "204": { description: stored }
"#,
    );
    let min = i64::MIN.to_string();
    let json = Some("application/json");
    let state = doc
        .validate_request("/counters", "post", &query(&[]), json, min.as_bytes())
        .unwrap();
    assert_eq!(state.body_value.as_json(), Some(&json!(i64::MIN)));

    let err = doc
        .validate_request("/counters", "post", &query(&[]), json, b"-3")
        .unwrap_err();
    assert!(matches!(err, ValidationError::BodyValidation(ref v) if v.keyword == "multipleOf"));
}

#[test]
fn test_path_parameters_follow_the_selected_operation() {
    let doc = document(
        r#"
openapi: "3.0"
paths:
  /items/{id}:
    get:
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
      responses:
        "200": { description: ok }
    put:
      parameters:
        - { name: id, in: path, required: true, schema: { type: string, maxLength: 3 } }
      responses:
        "204": { description: updated }
"#,
    );
    let state = doc.validate_request("/items/abc", "PUT", &query(&[]), None, b"").unwrap();
    assert_eq!(state.path_params["id"], json!("abc"));

    let state = doc.validate_request("/items/7", "GET", &query(&[]), None, b"").unwrap();
    assert_eq!(state.path_params["id"], json!(7));

    let get = doc.validate_request("/items/abc", "GET", &query(&[]), None, b"").unwrap_err();
    assert!(matches!(get, ValidationError::PathParamValidation(ParamError::Type(_))));

    let put = doc.validate_request("/items/abcd", "PUT", &query(&[]), None, b"").unwrap_err();
    assert!(matches!(
        put,
        ValidationError::PathParamValidation(ParamError::Schema(ref v)) if v.keyword == "maxLength"
    ));
}

#[test]
fn test_shared_path_parameter_is_checked_before_the_method() {
    let doc = pet_store();
    // an undeclared method still fails on the shared integer id first
    let err = doc.validate_request("/pets/abc", "PATCH", &query(&[]), None, b"").unwrap_err();
    assert_eq!(err.code(), "PathParamValidationError");
}
