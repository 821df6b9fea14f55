//! Document assembly - prunes attributes and inlines included resources.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{DataError, SchemaError, ShapeError};
use crate::index::DocumentIndex;
use crate::registry::SchemaRegistry;
use crate::selection::{EffectiveSelection, IncludeTree};
use crate::types::{
    DanglingPolicy, PrimaryData, RelationshipData, RelationshipSpec, ResolveOptions,
    ResourceIdentifier, ResourceObject,
};

/// Assemble the resolved `data` member for a document's primary data.
///
/// Collections keep their input order. `selection` must hold an include tree
/// for every primary resource type.
///
/// # Errors
///
/// Returns `DataError` for cardinality or target type mismatches and, under
/// `DanglingPolicy::Fail`, dangling references. Returns `SchemaError::UnknownType`
/// for resources of unregistered types.
pub fn assemble(
    primary: &PrimaryData,
    index: &DocumentIndex<'_>,
    selection: &EffectiveSelection,
    registry: &SchemaRegistry,
    options: &ResolveOptions,
) -> Result<Value, ShapeError> {
    let assembler = Assembler {
        registry,
        index,
        selection,
        options,
    };

    match primary {
        PrimaryData::Null => Ok(Value::Null),
        PrimaryData::Single(resource) => assembler.assemble_primary(resource),
        PrimaryData::Collection(resources) => resources
            .iter()
            .map(|resource| assembler.assemble_primary(resource))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

struct Assembler<'r, 'd> {
    registry: &'r SchemaRegistry,
    index: &'r DocumentIndex<'d>,
    selection: &'r EffectiveSelection,
    options: &'r ResolveOptions,
}

impl Assembler<'_, '_> {
    fn assemble_primary(&self, resource: &ResourceObject) -> Result<Value, ShapeError> {
        let tree = self
            .selection
            .include_tree(resource.type_name())
            .ok_or_else(|| SchemaError::UnknownType {
                type_name: resource.type_name().to_string(),
            })?;
        self.assemble_resource(resource, tree)
    }

    /// Recursion is bounded by the depth of `tree`.
    fn assemble_resource(
        &self,
        resource: &ResourceObject,
        tree: &IncludeTree,
    ) -> Result<Value, ShapeError> {
        let schema = self.registry.get(resource.type_name())?;
        let fields = self
            .selection
            .field_set(resource.type_name())
            .ok_or_else(|| SchemaError::UnknownType {
                type_name: resource.type_name().to_string(),
            })?;

        let attributes: Map<String, Value> = resource
            .attributes
            .iter()
            .filter(|(name, _)| fields.renders_attribute(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut relationships = Map::new();
        for (name, data) in &resource.relationships {
            // Undeclared relationships are never rendered
            let Some(spec) = schema.relationships.get(name) else {
                continue;
            };
            check_cardinality(resource, name, spec, data)?;
            check_target_type(resource, name, spec, data)?;

            let subtree = tree.child(name);
            if !fields.renders_relationship(name, subtree.is_some()) {
                continue;
            }

            let value = match subtree {
                None => data.to_value(),
                Some(child) => self.expand(resource, name, data, child)?,
            };
            relationships.insert(name.clone(), value);
        }

        let mut out = Map::new();
        out.insert("type".to_string(), Value::String(resource.type_name().to_string()));
        out.insert("id".to_string(), Value::String(resource.id().to_string()));
        out.insert("attributes".to_string(), Value::Object(attributes));
        out.insert("relationships".to_string(), Value::Object(relationships));
        Ok(Value::Object(out))
    }

    fn expand(
        &self,
        resource: &ResourceObject,
        relationship: &str,
        data: &RelationshipData,
        child: &IncludeTree,
    ) -> Result<Value, ShapeError> {
        match data {
            RelationshipData::One(None) => Ok(Value::Null),
            RelationshipData::One(Some(identifier)) => Ok(self
                .resolve_target(resource, relationship, identifier, child)?
                .unwrap_or(Value::Null)),
            RelationshipData::Many(identifiers) => {
                let mut items = Vec::with_capacity(identifiers.len());
                for identifier in identifiers {
                    if let Some(item) =
                        self.resolve_target(resource, relationship, identifier, child)?
                    {
                        items.push(item);
                    }
                }
                Ok(Value::Array(items))
            }
        }
    }

    /// Assemble a related resource. `Ok(None)` drops a missing target.
    fn resolve_target(
        &self,
        resource: &ResourceObject,
        relationship: &str,
        identifier: &ResourceIdentifier,
        child: &IncludeTree,
    ) -> Result<Option<Value>, ShapeError> {
        if let Some(target) = self.index.lookup(identifier) {
            return self.assemble_resource(target, child).map(Some);
        }

        match self.options.dangling {
            DanglingPolicy::Fail => Err(DataError::DanglingReference {
                resource: resource.identifier.clone(),
                relationship: relationship.to_string(),
                identifier: identifier.clone(),
            }
            .into()),
            DanglingPolicy::Null => {
                warn!(
                    resource = %resource.identifier,
                    relationship,
                    target = %identifier,
                    "dangling reference replaced with null"
                );
                Ok(None)
            }
            DanglingPolicy::KeepIdentifier => {
                warn!(
                    resource = %resource.identifier,
                    relationship,
                    target = %identifier,
                    "dangling reference left as identifier"
                );
                Ok(Some(identifier.to_value()))
            }
        }
    }
}

fn check_cardinality(
    resource: &ResourceObject,
    relationship: &str,
    spec: &RelationshipSpec,
    data: &RelationshipData,
) -> Result<(), DataError> {
    if data.cardinality() == spec.cardinality {
        return Ok(());
    }
    Err(DataError::CardinalityMismatch {
        resource: resource.identifier.clone(),
        relationship: relationship.to_string(),
        expected: spec.cardinality.linkage_name(),
        actual: data.cardinality().linkage_name(),
    })
}

fn check_target_type(
    resource: &ResourceObject,
    relationship: &str,
    spec: &RelationshipSpec,
    data: &RelationshipData,
) -> Result<(), DataError> {
    let linked: &[ResourceIdentifier] = match data {
        RelationshipData::One(None) => &[],
        RelationshipData::One(Some(identifier)) => std::slice::from_ref(identifier),
        RelationshipData::Many(identifiers) => identifiers,
    };
    match linked
        .iter()
        .find(|identifier| identifier.type_name != spec.target_type)
    {
        None => Ok(()),
        Some(identifier) => Err(DataError::TargetTypeMismatch {
            resource: resource.identifier.clone(),
            relationship: relationship.to_string(),
            expected: spec.target_type.clone(),
            identifier: identifier.clone(),
        }),
    }
}
