//! Core types: schema specs, resource objects, and resolve options.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a relationship links to a single resource or to a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    /// Human-readable linkage shape, used in error messages.
    pub fn linkage_name(&self) -> &'static str {
        match self {
            Cardinality::One => "to-one",
            Cardinality::Many => "to-many",
        }
    }
}

/// Schema declaration for a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSpec {
    /// Rendered when the caller gives no explicit fields for the type.
    #[serde(rename = "default", default)]
    pub rendered_by_default: bool,
}

/// Schema declaration for a single relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipSpec {
    pub cardinality: Cardinality,
    #[serde(rename = "target")]
    pub target_type: String,
    /// Expanded when the caller gives no explicit include list.
    #[serde(rename = "default", default)]
    pub included_by_default: bool,
}

/// Attributes and relationships declared for one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeSchema {
    pub name: String,
    pub attributes: BTreeMap<String, AttributeSpec>,
    pub relationships: BTreeMap<String, RelationshipSpec>,
}

impl ResourceTypeSchema {
    /// Create an empty schema for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Declare an attribute.
    pub fn attribute(mut self, name: impl Into<String>, rendered_by_default: bool) -> Self {
        self.attributes.insert(
            name.into(),
            AttributeSpec {
                rendered_by_default,
            },
        );
        self
    }

    /// Declare a relationship.
    pub fn relationship(
        mut self,
        name: impl Into<String>,
        cardinality: Cardinality,
        target_type: impl Into<String>,
        included_by_default: bool,
    ) -> Self {
        self.relationships.insert(
            name.into(),
            RelationshipSpec {
                cardinality,
                target_type: target_type.into(),
                included_by_default,
            },
        );
        self
    }

    /// True if `name` is a declared attribute or relationship.
    pub fn declares(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.relationships.contains_key(name)
    }
}

/// The `(type, id)` pair naming a resource within a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// JSON form: `{"type": ..., "id": ...}`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.type_name.clone()));
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}

/// Resource linkage carried by one relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipData {
    /// To-one linkage; `None` is an empty (`null`) relationship.
    One(Option<ResourceIdentifier>),
    /// To-many linkage, in document order.
    Many(Vec<ResourceIdentifier>),
}

impl RelationshipData {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            RelationshipData::One(_) => Cardinality::One,
            RelationshipData::Many(_) => Cardinality::Many,
        }
    }

    /// The linkage as bare identifiers.
    pub fn to_value(&self) -> Value {
        match self {
            RelationshipData::One(None) => Value::Null,
            RelationshipData::One(Some(id)) => id.to_value(),
            RelationshipData::Many(ids) => {
                Value::Array(ids.iter().map(ResourceIdentifier::to_value).collect())
            }
        }
    }
}

/// A JSON:API resource object.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceObject {
    pub identifier: ResourceIdentifier,
    /// Attribute values in document order.
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl ResourceObject {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            identifier: ResourceIdentifier::new(type_name, id),
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.identifier.type_name
    }

    pub fn id(&self) -> &str {
        &self.identifier.id
    }
}

/// Primary data of a compound document.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    /// `"data": null`
    Null,
    Single(ResourceObject),
    Collection(Vec<ResourceObject>),
}

impl PrimaryData {
    /// All primary resources, in document order.
    pub fn resources(&self) -> &[ResourceObject] {
        match self {
            PrimaryData::Null => &[],
            PrimaryData::Single(resource) => std::slice::from_ref(resource),
            PrimaryData::Collection(resources) => resources,
        }
    }
}

/// A parsed JSON:API document: primary data plus the flat `included` array.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundDocument {
    pub primary: PrimaryData,
    pub included: Vec<ResourceObject>,
    /// Top-level `meta`, `links` and `jsonapi` members, copied to the output as-is.
    pub passthrough: Map<String, Value>,
}

/// What to do when an expanded relationship points at a resource
/// missing from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DanglingPolicy {
    /// Abort the resolution with `DataError::DanglingReference`.
    #[default]
    Fail,
    /// To-one becomes `null`; to-many drops the missing entries.
    Null,
    /// Leave the bare identifier in place of the missing resource.
    KeepIdentifier,
}

/// Options for document resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Handling of relationship targets absent from the document.
    pub dangling: DanglingPolicy,
}

impl ResolveOptions {
    /// Create options with the failing dangling-reference policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dangling-reference policy.
    pub fn dangling(mut self, policy: DanglingPolicy) -> Self {
        self.dangling = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_options_default_fails_on_dangling() {
        assert_eq!(ResolveOptions::new().dangling, DanglingPolicy::Fail);
        let opts = ResolveOptions::new().dangling(DanglingPolicy::Null);
        assert_eq!(opts.dangling, DanglingPolicy::Null);
    }

    #[test]
    fn relationship_spec_deserializes_with_defaults() {
        let spec: RelationshipSpec =
            serde_json::from_value(json!({ "cardinality": "many", "target": "article" }))
                .unwrap();
        assert_eq!(spec.cardinality, Cardinality::Many);
        assert_eq!(spec.target_type, "article");
        assert!(!spec.included_by_default);
    }

    #[test]
    fn attribute_spec_rejects_unknown_keys() {
        let result: Result<AttributeSpec, _> =
            serde_json::from_value(json!({ "defualt": true }));
        assert!(result.is_err());
    }

    #[test]
    fn relationship_data_bare_values() {
        let one = RelationshipData::One(Some(ResourceIdentifier::new("user", "1")));
        assert_eq!(one.to_value(), json!({ "type": "user", "id": "1" }));
        assert_eq!(RelationshipData::One(None).to_value(), Value::Null);
        assert_eq!(RelationshipData::Many(vec![]).to_value(), json!([]));
        assert_eq!(one.cardinality(), Cardinality::One);
    }

    #[test]
    fn identifier_display() {
        assert_eq!(ResourceIdentifier::new("article", "42").to_string(), "article:42");
    }
}
