//! Compiled JSON Schemas used to gate fixtures.
//!
//! Three schemas take part in a load: the fixture document meta-schema
//! (shape of the whole file), and the operator-supplied request and
//! response schemas applied to every entry. All are draft-04.

use super::types::PayloadKind;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Built-in meta-schema for the fixture document.
pub const FIXTURE_DOCUMENT_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-04/schema#",
    "title": "Rift Replay Fixture Document",
    "type": "array",
    "items": {
        "type": "object",
        "properties": {
            "query": { "type": "string" },
            "req": {},
            "res": {}
        },
        "required": ["req", "res"]
    }
}"#;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid {name} schema: {message}")]
    Compile { name: &'static str, message: String },
    #[error("Built-in fixture document schema is not valid JSON: {0}")]
    BuiltIn(#[from] serde_json::Error),
}

/// Request, response and document schemas compiled once at startup.
pub struct SchemaSet {
    request: JSONSchema,
    response: JSONSchema,
    document: JSONSchema,
}

impl fmt::Debug for SchemaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaSet").finish_non_exhaustive()
    }
}

impl SchemaSet {
    /// Compile the request and response schemas, using the built-in
    /// document meta-schema.
    pub fn new(request: &Value, response: &Value) -> Result<Self, SchemaError> {
        let document: Value = serde_json::from_str(FIXTURE_DOCUMENT_SCHEMA)?;
        Self::with_document_schema(request, response, &document)
    }

    /// Compile all three schemas from caller-supplied documents.
    pub fn with_document_schema(
        request: &Value,
        response: &Value,
        document: &Value,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            request: compile("request", request)?,
            response: compile("response", response)?,
            document: compile("fixture document", document)?,
        })
    }

    /// Validate a payload against the request or response schema.
    pub fn validate_payload(&self, kind: PayloadKind, instance: &Value) -> Result<(), Vec<String>> {
        let schema = match kind {
            PayloadKind::Request => &self.request,
            PayloadKind::Response => &self.response,
        };
        collect_errors(schema, instance)
    }

    /// Validate the whole fixture document shape.
    pub fn validate_document(&self, document: &Value) -> Result<(), Vec<String>> {
        collect_errors(&self.document, document)
    }
}

fn compile(name: &'static str, schema: &Value) -> Result<JSONSchema, SchemaError> {
    JSONSchema::options()
        .with_draft(Draft::Draft4)
        .compile(schema)
        .map_err(|e| SchemaError::Compile {
            name,
            message: e.to_string(),
        })
}

fn collect_errors(schema: &JSONSchema, instance: &Value) -> Result<(), Vec<String>> {
    schema.validate(instance).map_err(|errors| {
        errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_schemas() -> SchemaSet {
        SchemaSet::new(
            &json!({"type": "object", "required": ["a"]}),
            &json!({"type": "object", "properties": {"ok": {"type": "boolean"}}}),
        )
        .unwrap()
    }

    #[test]
    fn test_payload_validation() {
        let schemas = object_schemas();
        assert!(schemas
            .validate_payload(PayloadKind::Request, &json!({"a": 1}))
            .is_ok());
        assert!(schemas
            .validate_payload(PayloadKind::Request, &json!({"b": 1}))
            .is_err());
        assert!(schemas
            .validate_payload(PayloadKind::Response, &json!({"ok": true}))
            .is_ok());
    }

    #[test]
    fn test_errors_carry_instance_path() {
        let schemas = object_schemas();
        let errors = schemas
            .validate_payload(PayloadKind::Response, &json!({"ok": "yes"}))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("/ok: "), "got {}", errors[0]);
    }

    #[test]
    fn test_document_shape() {
        let schemas = object_schemas();
        assert!(schemas
            .validate_document(&json!([{"req": {}, "res": "{}", "query": "a=1"}]))
            .is_ok());
        assert!(schemas.validate_document(&json!({"req": 1})).is_err());
        assert!(schemas.validate_document(&json!([{"req": 1}])).is_err());
        assert!(schemas
            .validate_document(&json!([{"req": 1, "res": 2, "query": 3}]))
            .is_err());
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let err = SchemaSet::new(&json!({"type": 12}), &json!({})).unwrap_err();
        assert!(matches!(err, SchemaError::Compile { name: "request", .. }));
    }
}
