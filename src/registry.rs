//! Schema registry - the resource-type graph that selections are resolved against.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use crate::error::SchemaError;
use crate::openapi::registry_from_openapi;
use crate::types::{AttributeSpec, RelationshipSpec, ResourceTypeSchema};

/// Serialized form of one type in a plain definition file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeDefinition {
    #[serde(default)]
    attributes: BTreeMap<String, AttributeSpec>,
    #[serde(default)]
    relationships: BTreeMap<String, RelationshipSpec>,
}

/// Immutable map of resource type name to schema.
///
/// Every relationship target is guaranteed to be registered. The graph may
/// contain cycles (`article -> user -> article`, or a type targeting itself).
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, ResourceTypeSchema>,
}

impl SchemaRegistry {
    /// Build a registry from a set of type schemas.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownTargetType` if a relationship targets a type
    /// outside the set, or `SchemaError::InvalidDefinition` if a type is given twice.
    pub fn register(
        schemas: impl IntoIterator<Item = ResourceTypeSchema>,
    ) -> Result<Self, SchemaError> {
        let mut types = BTreeMap::new();
        for schema in schemas {
            if types.contains_key(&schema.name) {
                return Err(SchemaError::InvalidDefinition {
                    type_name: schema.name,
                    message: "type registered more than once".to_string(),
                });
            }
            types.insert(schema.name.clone(), schema);
        }

        for schema in types.values() {
            for (name, rel) in &schema.relationships {
                if !types.contains_key(&rel.target_type) {
                    return Err(SchemaError::UnknownTargetType {
                        type_name: schema.name.clone(),
                        relationship: name.clone(),
                        target: rel.target_type.clone(),
                    });
                }
            }
        }

        Ok(Self { types })
    }

    /// Build a registry from a plain definition map.
    ///
    /// ```json
    /// { "user": {
    ///     "attributes": { "email": { "default": true } },
    ///     "relationships": {
    ///       "articles": { "cardinality": "many", "target": "article" } } } }
    /// ```
    pub fn from_definitions(value: &Value) -> Result<Self, SchemaError> {
        let defs = BTreeMap::<String, TypeDefinition>::deserialize(value).map_err(|e| {
            SchemaError::InvalidDefinition {
                type_name: "<definitions>".to_string(),
                message: e.to_string(),
            }
        })?;

        Self::register(defs.into_iter().map(|(name, def)| ResourceTypeSchema {
            name,
            attributes: def.attributes,
            relationships: def.relationships,
        }))
    }

    /// Build a registry from either a plain definition map or an OpenAPI
    /// document (detected by its top-level `openapi` member).
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        if value.get("openapi").is_some() {
            registry_from_openapi(value)
        } else {
            Self::from_definitions(value)
        }
    }

    /// Look up a type schema.
    pub fn get(&self, type_name: &str) -> Result<&ResourceTypeSchema, SchemaError> {
        self.types
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// All registered schemas, ordered by type name.
    pub fn types(&self) -> impl Iterator<Item = &ResourceTypeSchema> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Attribute names rendered when no explicit fields are given.
    pub fn default_fields(&self, type_name: &str) -> Result<BTreeSet<String>, SchemaError> {
        Ok(self
            .get(type_name)?
            .attributes
            .iter()
            .filter(|(_, spec)| spec.rendered_by_default)
            .map(|(name, _)| name.clone())
            .collect())
    }

    /// Relationship names expanded when no explicit include list is given.
    pub fn default_includes(&self, type_name: &str) -> Result<BTreeSet<String>, SchemaError> {
        Ok(self
            .get(type_name)?
            .relationships
            .iter()
            .filter(|(_, spec)| spec.included_by_default)
            .map(|(name, _)| name.clone())
            .collect())
    }
}
