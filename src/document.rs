//! Parsing of JSON:API documents into typed resources.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{DataError, Violation};
use crate::types::{
    json_type_name, CompoundDocument, PrimaryData, RelationshipData, ResourceIdentifier,
    ResourceObject,
};

/// Top-level members copied through to the resolved output.
pub const PASSTHROUGH_MEMBERS: &[&str] = &["meta", "links", "jsonapi"];

/// Parse a document. Run `validate_document` first for complete diagnostics;
/// this reports only the first problem found.
///
/// # Errors
///
/// Returns `DataError::MalformedDocument` if the document isn't JSON:API shaped.
pub fn parse_document(document: &Value) -> Result<CompoundDocument, DataError> {
    let root = document
        .as_object()
        .ok_or_else(|| malformed("", format!("expected object, got {}", json_type_name(document))))?;

    let primary = match root.get("data") {
        None => return Err(malformed("", "missing data member".to_string())),
        Some(Value::Null) => PrimaryData::Null,
        Some(Value::Array(items)) => PrimaryData::Collection(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_resource(item, &format!("/data/{}", i)))
                .collect::<Result<_, _>>()?,
        ),
        Some(single) => PrimaryData::Single(parse_resource(single, "/data")?),
    };

    let included = match root.get("included") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_resource(item, &format!("/included/{}", i)))
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(malformed(
                "/included",
                format!("expected array, got {}", json_type_name(other)),
            ))
        }
    };

    let passthrough: Map<String, Value> = PASSTHROUGH_MEMBERS
        .iter()
        .filter_map(|key| root.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect();

    Ok(CompoundDocument {
        primary,
        included,
        passthrough,
    })
}

/// Parse one resource object.
pub fn parse_resource(value: &Value, path: &str) -> Result<ResourceObject, DataError> {
    let map = value
        .as_object()
        .ok_or_else(|| malformed(path, format!("expected object, got {}", json_type_name(value))))?;
    let identifier = parse_identifier(value, path)?;

    let attributes = match map.get("attributes") {
        None => Map::new(),
        Some(Value::Object(attrs)) => attrs.clone(),
        Some(other) => {
            return Err(malformed(
                &format!("{}/attributes", path),
                format!("expected object, got {}", json_type_name(other)),
            ))
        }
    };

    let mut relationships = BTreeMap::new();
    match map.get("relationships") {
        None => {}
        Some(Value::Object(rels)) => {
            for (name, rel) in rels {
                let rel_path = format!("{}/relationships/{}", path, name);
                if let Some(data) = parse_relationship(rel, &rel_path)? {
                    relationships.insert(name.clone(), data);
                }
            }
        }
        Some(other) => {
            return Err(malformed(
                &format!("{}/relationships", path),
                format!("expected object, got {}", json_type_name(other)),
            ))
        }
    }

    Ok(ResourceObject {
        identifier,
        attributes,
        relationships,
    })
}

/// Parse a relationship member. Returns `None` for a relationship object
/// without `data` (links-only), which carries no linkage.
fn parse_relationship(value: &Value, path: &str) -> Result<Option<RelationshipData>, DataError> {
    let linkage = match value {
        // A lone `id` is a broken identifier, not a relationship object
        Value::Object(map) if !map.contains_key("type") && map.contains_key("id") => {
            return Err(malformed(path, "missing type member".to_string()));
        }
        Value::Object(map) if !map.contains_key("type") => match map.get("data") {
            Some(data) => data,
            None => return Ok(None),
        },
        other => other,
    };

    match linkage {
        Value::Null => Ok(Some(RelationshipData::One(None))),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_identifier(item, &format!("{}/{}", path, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(|ids| Some(RelationshipData::Many(ids))),
        Value::Object(_) => Ok(Some(RelationshipData::One(Some(parse_identifier(
            linkage, path,
        )?)))),
        other => Err(malformed(
            path,
            format!("expected resource linkage, got {}", json_type_name(other)),
        )),
    }
}

fn parse_identifier(value: &Value, path: &str) -> Result<ResourceIdentifier, DataError> {
    let member = |key: &str| -> Result<String, DataError> {
        match value.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(malformed(
                &format!("{}/{}", path, key),
                format!("expected string, got {}", json_type_name(other)),
            )),
            None => Err(malformed(path, format!("missing {} member", key))),
        }
    };
    Ok(ResourceIdentifier::new(member("type")?, member("id")?))
}

fn malformed(path: &str, message: String) -> DataError {
    DataError::MalformedDocument {
        violations: vec![Violation {
            path: path.to_string(),
            message,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_reference_fixture() {
        let doc = parse_document(&json!({
            "data": {
                "type": "article",
                "id": "42",
                "attributes": { "title": "T", "body": "B" },
                "relationships": { "author": { "type": "user", "id": "1" } }
            },
            "included": [{
                "type": "user",
                "id": "1",
                "attributes": { "email": "e", "name": "n" },
                "relationships": { "articles": [] }
            }]
        }))
        .unwrap();

        let PrimaryData::Single(article) = &doc.primary else {
            panic!("expected single primary resource");
        };
        assert_eq!(article.type_name(), "article");
        assert_eq!(
            article.relationships["author"],
            RelationshipData::One(Some(ResourceIdentifier::new("user", "1")))
        );
        assert_eq!(doc.included.len(), 1);
        assert_eq!(
            doc.included[0].relationships["articles"],
            RelationshipData::Many(vec![])
        );
    }

    #[test]
    fn attribute_order_preserved() {
        let resource = parse_resource(
            &json!({ "type": "user", "id": "1", "attributes": { "z": 1, "a": 2, "m": 3 } }),
            "/data",
        )
        .unwrap();
        let keys: Vec<&str> = resource.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn unwraps_relationship_objects() {
        let resource = parse_resource(
            &json!({
                "type": "article",
                "id": "42",
                "relationships": {
                    "author": { "data": { "type": "user", "id": "1" }, "links": {} },
                    "editor": { "data": null },
                    "tags": { "links": { "related": "/tags" } }
                }
            }),
            "/data",
        )
        .unwrap();
        assert_eq!(
            resource.relationships["author"],
            RelationshipData::One(Some(ResourceIdentifier::new("user", "1")))
        );
        assert_eq!(resource.relationships["editor"], RelationshipData::One(None));
        assert!(!resource.relationships.contains_key("tags"));
    }

    #[test]
    fn passthrough_members_kept() {
        let doc = parse_document(&json!({
            "data": [],
            "meta": { "total": 0 },
            "jsonapi": { "version": "1.1" },
            "errors": []
        }))
        .unwrap();
        assert_eq!(doc.primary, PrimaryData::Collection(vec![]));
        assert_eq!(doc.passthrough["meta"], json!({ "total": 0 }));
        assert!(doc.passthrough.contains_key("jsonapi"));
        assert!(!doc.passthrough.contains_key("errors"));
    }

    #[test]
    fn numeric_id_is_malformed() {
        let result = parse_document(&json!({ "data": { "type": "user", "id": 1 } }));
        match result {
            Err(DataError::MalformedDocument { violations }) => {
                assert_eq!(violations[0].path, "/data/id");
            }
            other => panic!("expected malformed document, got {:?}", other),
        }
    }

    #[test]
    fn relationship_with_id_but_no_type_is_malformed() {
        let result = parse_resource(
            &json!({
                "type": "article",
                "id": "42",
                "relationships": { "author": { "id": "1" } }
            }),
            "/data",
        );
        match result {
            Err(DataError::MalformedDocument { violations }) => {
                assert_eq!(violations[0].path, "/data/relationships/author");
                assert_eq!(violations[0].message, "missing type member");
            }
            other => panic!("expected malformed document, got {:?}", other),
        }
    }

    #[test]
    fn missing_data_is_malformed() {
        let result = parse_document(&json!({ "included": [] }));
        assert!(matches!(result, Err(DataError::MalformedDocument { .. })));
    }
}
