//! Structural validation of incoming JSON:API documents.

use serde_json::{json, Value};

use crate::error::{DataError, Violation};

/// JSON Schema for the subset of a JSON:API document this crate reads.
///
/// Relationship members accept both the bare linkage and the standard
/// relationship object (`{"data": ..., "links": ..., "meta": ...}`).
pub fn document_schema() -> Value {
    json!({
        "type": "object",
        "required": ["data"],
        "properties": {
            "data": {
                "anyOf": [
                    { "type": "null" },
                    { "$ref": "#/$defs/resource" },
                    { "type": "array", "items": { "$ref": "#/$defs/resource" } }
                ]
            },
            "included": {
                "type": "array",
                "items": { "$ref": "#/$defs/resource" }
            }
        },
        "$defs": {
            "identifier": {
                "type": "object",
                "required": ["type", "id"],
                "properties": {
                    "type": { "type": "string", "minLength": 1 },
                    "id": { "type": "string" }
                }
            },
            "linkage": {
                "anyOf": [
                    { "type": "null" },
                    { "$ref": "#/$defs/identifier" },
                    { "type": "array", "items": { "$ref": "#/$defs/identifier" } }
                ]
            },
            "relationship": {
                "anyOf": [
                    { "$ref": "#/$defs/linkage" },
                    {
                        "type": "object",
                        "not": {
                            "anyOf": [{ "required": ["type"] }, { "required": ["id"] }]
                        },
                        "properties": { "data": { "$ref": "#/$defs/linkage" } }
                    }
                ]
            },
            "resource": {
                "type": "object",
                "required": ["type", "id"],
                "properties": {
                    "type": { "type": "string", "minLength": 1 },
                    "id": { "type": "string" },
                    "attributes": { "type": "object" },
                    "relationships": {
                        "type": "object",
                        "additionalProperties": { "$ref": "#/$defs/relationship" }
                    }
                }
            }
        }
    })
}

/// Validate a document's structure.
///
/// # Errors
///
/// Returns `DataError::MalformedDocument` listing every violation.
pub fn validate_document(document: &Value) -> Result<(), DataError> {
    let validator = jsonschema::validator_for(&document_schema()).map_err(|e| {
        DataError::MalformedDocument {
            violations: vec![Violation {
                path: String::new(),
                message: format!("document schema failed to compile: {}", e),
            }],
        }
    })?;

    let violations: Vec<Violation> = validator
        .iter_errors(document)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DataError::MalformedDocument { violations })
    }
}
