//! Registry extraction from OpenAPI documents.
//!
//! Resource types are read from `components.schemas`. Each component shaped
//! like a JSON:API resource object (a `type` property plus `attributes` and/or
//! `relationships`) becomes one registered type. The `x-default` extension
//! marks attributes rendered by default and relationships included by default:
//!
//! ```json
//! "relationships": { "properties": {
//!   "author": {
//!     "x-default": true,
//!     "properties": { "data": {
//!       "properties": { "type": { "const": "user" }, "id": { "type": "string" } }
//!     } }
//!   }
//! } }
//! ```

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::registry::SchemaRegistry;
use crate::types::{json_type_name, Cardinality, ResourceTypeSchema};

/// OpenAPI extension key carrying default flags.
pub const DEFAULT_EXTENSION: &str = "x-default";

/// Maximum `$ref` hops followed before giving up on a pointer chain.
const MAX_REF_HOPS: usize = 32;

/// Extract a schema registry from an OpenAPI document.
///
/// # Errors
///
/// Returns `SchemaError::InvalidDefinition` when `components.schemas` is missing,
/// a `$ref` cannot be followed, a default flag isn't a boolean, or a relationship's
/// target type cannot be determined. Returns `SchemaError::UnknownTargetType` when
/// a relationship targets a type not defined in the document.
pub fn registry_from_openapi(doc: &Value) -> Result<SchemaRegistry, SchemaError> {
    let components = doc
        .pointer("/components/schemas")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::InvalidDefinition {
            type_name: "<openapi>".to_string(),
            message: "missing components.schemas".to_string(),
        })?;

    let mut schemas = Vec::new();
    for (key, component) in components {
        let component = follow_ref(doc, component, key)?;
        if let Some(schema) = extract_type(doc, key, component)? {
            schemas.push(schema);
        }
    }

    SchemaRegistry::register(schemas)
}

fn extract_type(
    doc: &Value,
    key: &str,
    component: &Value,
) -> Result<Option<ResourceTypeSchema>, SchemaError> {
    let Some(props) = component.get("properties").and_then(Value::as_object) else {
        return Ok(None);
    };
    let Some(type_prop) = props.get("type") else {
        return Ok(None);
    };
    if !props.contains_key("attributes") && !props.contains_key("relationships") {
        return Ok(None);
    }

    let type_prop = follow_ref(doc, type_prop, key)?;
    let name = type_const(type_prop).unwrap_or(key).to_string();
    let mut schema = ResourceTypeSchema::new(name);

    if let Some(attributes) = member_properties(doc, props, "attributes", key)? {
        for (attr, spec) in attributes {
            let spec = follow_ref(doc, spec, key)?;
            schema = schema.attribute(attr.clone(), default_flag(spec, key, attr)?);
        }
    }

    if let Some(relationships) = member_properties(doc, props, "relationships", key)? {
        for (rel, spec) in relationships {
            let spec = follow_ref(doc, spec, key)?;
            let included = default_flag(spec, key, rel)?;
            let (cardinality, target) = linkage_shape(doc, spec, key, rel)?;
            schema = schema.relationship(rel.clone(), cardinality, target, included);
        }
    }

    Ok(Some(schema))
}

/// The `properties` map of the `attributes`/`relationships` member, if declared.
fn member_properties<'a>(
    doc: &'a Value,
    props: &'a Map<String, Value>,
    member: &str,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, SchemaError> {
    let Some(member_schema) = props.get(member) else {
        return Ok(None);
    };
    let member_schema = follow_ref(doc, member_schema, key)?;
    Ok(member_schema.get("properties").and_then(Value::as_object))
}

fn default_flag(spec: &Value, key: &str, name: &str) -> Result<bool, SchemaError> {
    match spec.get(DEFAULT_EXTENSION) {
        None => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(SchemaError::InvalidDefinition {
            type_name: key.to_string(),
            message: format!(
                "{} on '{}' must be a boolean, got {}",
                DEFAULT_EXTENSION,
                name,
                json_type_name(other)
            ),
        }),
    }
}

/// Cardinality and target type of a relationship, read from its `data` schema.
fn linkage_shape(
    doc: &Value,
    spec: &Value,
    key: &str,
    rel: &str,
) -> Result<(Cardinality, String), SchemaError> {
    let invalid = |message: &str| SchemaError::InvalidDefinition {
        type_name: key.to_string(),
        message: format!("relationship '{}': {}", rel, message),
    };

    let data = spec
        .pointer("/properties/data")
        .ok_or_else(|| invalid("missing data schema"))?;
    let data = follow_ref(doc, data, key)?;

    if data.get("type").and_then(Value::as_str) == Some("array") {
        let items = data
            .get("items")
            .ok_or_else(|| invalid("to-many data has no items schema"))?;
        let items = follow_ref(doc, items, key)?;
        let target = identifier_type(doc, items, key)?
            .ok_or_else(|| invalid("cannot determine target type of items"))?;
        return Ok((Cardinality::Many, target));
    }

    let target = identifier_type(doc, data, key)?
        .ok_or_else(|| invalid("cannot determine target type"))?;
    Ok((Cardinality::One, target))
}

/// The `type` constant of a resource identifier schema.
///
/// Nullable to-one linkage is usually written as `anyOf`/`oneOf` with a `null`
/// branch; the first branch naming a type wins.
fn identifier_type(doc: &Value, schema: &Value, key: &str) -> Result<Option<String>, SchemaError> {
    if let Some(type_prop) = schema.pointer("/properties/type") {
        let type_prop = follow_ref(doc, type_prop, key)?;
        return Ok(type_const(type_prop).map(String::from));
    }

    for composition in ["anyOf", "oneOf", "allOf"] {
        if let Some(branches) = schema.get(composition).and_then(Value::as_array) {
            for branch in branches {
                let branch = follow_ref(doc, branch, key)?;
                if let Some(target) = identifier_type(doc, branch, key)? {
                    return Ok(Some(target));
                }
            }
        }
    }

    Ok(None)
}

/// `{"const": "user"}` or a single-valued `{"enum": ["user"]}`.
fn type_const(schema: &Value) -> Option<&str> {
    if let Some(value) = schema.get("const").and_then(Value::as_str) {
        return Some(value);
    }
    match schema.get("enum").and_then(Value::as_array) {
        Some(values) if values.len() == 1 => values[0].as_str(),
        _ => None,
    }
}

/// Follow local `$ref` pointers (`#/components/...`) until a concrete schema is reached.
fn follow_ref<'a>(doc: &'a Value, schema: &'a Value, key: &str) -> Result<&'a Value, SchemaError> {
    let mut current = schema;
    for _ in 0..MAX_REF_HOPS {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return Ok(current);
        };
        let pointer = reference
            .strip_prefix('#')
            .ok_or_else(|| SchemaError::InvalidDefinition {
                type_name: key.to_string(),
                message: format!("only local $ref pointers are supported, got {}", reference),
            })?;
        current = doc
            .pointer(pointer)
            .ok_or_else(|| SchemaError::InvalidDefinition {
                type_name: key.to_string(),
                message: format!("$ref not found: {}", reference),
            })?;
    }
    Err(SchemaError::InvalidDefinition {
        type_name: key.to_string(),
        message: "$ref chain too long or cyclic".to_string(),
    })
}
