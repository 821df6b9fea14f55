//! Selection resolution - sparse fieldsets and include trees.
//!
//! Explicit choices always *replace* schema defaults, they are never merged:
//!
//! | Caller input | Attributes rendered | Relationships expanded |
//! |--------------|---------------------|------------------------|
//! | no `fields[T]` | `T`'s default attributes | - |
//! | `fields[T]=a,b` | exactly `a,b` (may be empty) | - |
//! | no `include` | - | default walk from the primary type |
//! | `include=p,q.r` | - | exactly the listed paths |
//!
//! A relationship *member* renders when it is listed in an explicit
//! `fields[T]`, or, without one, when it is included by default or expanded
//! at that position. Rendered but unexpanded relationships stay bare identifiers.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{SchemaError, SelectionError, ShapeError};
use crate::registry::SchemaRegistry;
use crate::types::ResourceTypeSchema;

/// Caller-supplied selection, mirroring the JSON:API `fields[T]` and
/// `include` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    fields: BTreeMap<String, BTreeSet<String>>,
    include: Option<BTreeSet<String>>,
}

impl Selection {
    /// Empty selection: defaults everywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `fields[type_name]` from a comma-delimited list.
    ///
    /// An empty list selects no fields at all for the type.
    pub fn with_fields(self, type_name: impl Into<String>, list: &str) -> Self {
        self.with_field_set(type_name, split_list(list))
    }

    /// Set `fields[type_name]` from individual names.
    pub fn with_field_set<I, S>(mut self, type_name: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .insert(type_name.into(), names.into_iter().map(Into::into).collect());
        self
    }

    /// Set `include` from a comma-delimited list of dot-paths.
    ///
    /// An empty list expands nothing, which differs from never calling this.
    pub fn with_include(self, list: &str) -> Self {
        self.with_include_paths(split_list(list))
    }

    /// Set `include` from individual dot-paths.
    pub fn with_include_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.fields
    }

    /// `None` when the caller left `include` unset.
    pub fn include(&self) -> Option<&BTreeSet<String>> {
        self.include.as_ref()
    }
}

fn split_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolved field set for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSet {
    pub attributes: BTreeSet<String>,
    pub relationships: BTreeSet<String>,
    /// True when the caller supplied `fields[T]` for this type.
    pub explicit: bool,
}

impl FieldSet {
    /// Schema defaults: default attributes and default-included relationships.
    pub fn defaults(registry: &SchemaRegistry, type_name: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            attributes: registry.default_fields(type_name)?,
            relationships: registry.default_includes(type_name)?,
            explicit: false,
        })
    }

    /// Explicit selection; names must already be validated against `schema`.
    pub fn explicit(schema: &ResourceTypeSchema, names: &BTreeSet<String>) -> Self {
        Self {
            attributes: names
                .iter()
                .filter(|n| schema.attributes.contains_key(*n))
                .cloned()
                .collect(),
            relationships: names
                .iter()
                .filter(|n| schema.relationships.contains_key(*n))
                .cloned()
                .collect(),
            explicit: true,
        }
    }

    pub fn renders_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// Whether a relationship member appears in output. `expanded` is true when
    /// the include tree expands it at the current position.
    pub fn renders_relationship(&self, name: &str, expanded: bool) -> bool {
        if self.explicit {
            self.relationships.contains(name)
        } else {
            expanded || self.relationships.contains(name)
        }
    }
}

/// Which relationships are expanded at each depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IncludeTree {
    children: BTreeMap<String, IncludeTree>,
}

impl IncludeTree {
    /// Subtree for an expanded relationship, `None` if it stays unexpanded.
    pub fn child(&self, relationship: &str) -> Option<&IncludeTree> {
        self.children.get(relationship)
    }

    pub fn expands(&self, relationship: &str) -> bool {
        self.children.contains_key(relationship)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Longest expanded chain below this node.
    pub fn depth(&self) -> usize {
        self.children
            .values()
            .map(|child| 1 + child.depth())
            .max()
            .unwrap_or(0)
    }

    /// Every expanded path in dot notation, parents before children.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, child) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };
            out.push(path.clone());
            child.collect_paths(&path, out);
        }
    }
}

/// Field sets for every registered type plus an include tree per primary type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSelection {
    fields: BTreeMap<String, FieldSet>,
    include: BTreeMap<String, IncludeTree>,
}

impl EffectiveSelection {
    pub fn field_set(&self, type_name: &str) -> Option<&FieldSet> {
        self.fields.get(type_name)
    }

    /// Include tree rooted at a primary resource type.
    pub fn include_tree(&self, primary_type: &str) -> Option<&IncludeTree> {
        self.include.get(primary_type)
    }
}

/// Compute the effective selection for the given primary types.
///
/// All `fields` entries are validated even if no primary type is given, so
/// an empty collection still rejects a bad selection.
///
/// # Errors
///
/// Returns `SchemaError::UnknownType` for an unregistered primary type and
/// `SelectionError` for unknown field types, unknown field names, or invalid
/// include paths.
pub fn resolve_selection<'a>(
    registry: &SchemaRegistry,
    primary_types: impl IntoIterator<Item = &'a str>,
    selection: &Selection,
) -> Result<EffectiveSelection, ShapeError> {
    let fields = resolve_fields(registry, selection)?;

    let mut include = BTreeMap::new();
    for primary_type in primary_types {
        if include.contains_key(primary_type) {
            continue;
        }
        let tree = resolve_include_tree(registry, primary_type, selection)?;
        debug!(
            primary_type,
            paths = ?tree.paths(),
            explicit = selection.include().is_some(),
            "resolved include tree"
        );
        include.insert(primary_type.to_string(), tree);
    }

    Ok(EffectiveSelection { fields, include })
}

/// Field set per registered type; explicit entries replace defaults.
pub fn resolve_fields(
    registry: &SchemaRegistry,
    selection: &Selection,
) -> Result<BTreeMap<String, FieldSet>, ShapeError> {
    for (type_name, names) in selection.fields() {
        let schema = registry
            .get(type_name)
            .map_err(|_| SelectionError::UnknownType {
                type_name: type_name.clone(),
            })?;
        if let Some(unknown) = names.iter().find(|n| !schema.declares(n)) {
            return Err(SelectionError::UnknownField {
                type_name: type_name.clone(),
                field: unknown.clone(),
            }
            .into());
        }
    }

    let mut fields = BTreeMap::new();
    for schema in registry.types() {
        let set = match selection.fields().get(&schema.name) {
            Some(names) => FieldSet::explicit(schema, names),
            None => FieldSet::defaults(registry, &schema.name)?,
        };
        fields.insert(schema.name.clone(), set);
    }
    Ok(fields)
}

/// Include tree for one primary type: the explicit paths if given, the
/// default walk otherwise.
pub fn resolve_include_tree(
    registry: &SchemaRegistry,
    primary_type: &str,
    selection: &Selection,
) -> Result<IncludeTree, ShapeError> {
    match selection.include() {
        Some(paths) => explicit_tree(registry, primary_type, paths),
        None => {
            let mut on_path = vec![primary_type];
            Ok(default_walk(registry, primary_type, &mut on_path)?)
        }
    }
}

/// Depth-first walk over default-included relationships. A relationship whose
/// target type is already on the current path is left unexpanded.
fn default_walk<'a>(
    registry: &'a SchemaRegistry,
    type_name: &str,
    on_path: &mut Vec<&'a str>,
) -> Result<IncludeTree, SchemaError> {
    let schema = registry.get(type_name)?;
    let mut tree = IncludeTree::default();

    for name in registry.default_includes(type_name)? {
        let Some(rel) = schema.relationships.get(&name) else {
            continue;
        };
        let target = rel.target_type.as_str();
        if on_path.contains(&target) {
            trace!(
                relationship = %name,
                target,
                path = ?on_path,
                "type already on path, not expanding"
            );
            continue;
        }
        on_path.push(target);
        let child = default_walk(registry, target, on_path)?;
        on_path.pop();
        tree.children.insert(name, child);
    }

    Ok(tree)
}

/// Build the tree from explicit dot-paths. Each path must name a relationship
/// at every segment, and every proper prefix must itself be listed.
fn explicit_tree(
    registry: &SchemaRegistry,
    primary_type: &str,
    paths: &BTreeSet<String>,
) -> Result<IncludeTree, ShapeError> {
    let root_schema = registry.get(primary_type)?;
    let mut tree = IncludeTree::default();

    for path in paths {
        let invalid = |reason: String| SelectionError::InvalidIncludePath {
            path: path.clone(),
            reason,
        };

        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty path segment".to_string()).into());
        }

        let mut schema = root_schema;
        let mut node = &mut tree;
        for (i, segment) in segments.iter().enumerate() {
            let rel = schema.relationships.get(*segment).ok_or_else(|| {
                invalid(format!(
                    "'{}' is not a relationship of '{}'",
                    segment, schema.name
                ))
            })?;

            if i + 1 < segments.len() {
                let prefix = segments[..=i].join(".");
                if !paths.contains(&prefix) {
                    return Err(invalid(format!("missing prerequisite path \"{}\"", prefix)).into());
                }
            }

            node = node.children.entry((*segment).to_string()).or_default();
            schema = registry.get(&rel.target_type)?;
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cardinality;

    fn blog() -> SchemaRegistry {
        SchemaRegistry::register([
            ResourceTypeSchema::new("article")
                .attribute("title", true)
                .attribute("body", true)
                .relationship("author", Cardinality::One, "user", true),
            ResourceTypeSchema::new("user")
                .attribute("email", true)
                .attribute("name", false)
                .relationship("articles", Cardinality::Many, "article", false),
        ])
        .unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // === Selection builder ===

    #[test]
    fn comma_lists_are_split_and_trimmed() {
        let selection = Selection::new()
            .with_fields("article", "title, body")
            .with_include("author, author.articles,");
        assert_eq!(selection.fields()["article"], set(&["title", "body"]));
        assert_eq!(
            selection.include(),
            Some(&set(&["author", "author.articles"]))
        );
    }

    #[test]
    fn empty_include_differs_from_unset() {
        assert_eq!(Selection::new().include(), None);
        assert_eq!(
            Selection::new().with_include("").include(),
            Some(&BTreeSet::new())
        );
    }

    // === Field resolution ===

    #[test]
    fn defaults_without_explicit_fields() {
        let fields = resolve_fields(&blog(), &Selection::new()).unwrap();
        assert_eq!(fields["user"].attributes, set(&["email"]));
        assert_eq!(fields["article"].attributes, set(&["title", "body"]));
        assert!(!fields["user"].explicit);
    }

    #[test]
    fn explicit_fields_replace_defaults() {
        let selection = Selection::new().with_fields("article", "title");
        let fields = resolve_fields(&blog(), &selection).unwrap();
        assert_eq!(fields["article"].attributes, set(&["title"]));
        assert!(!fields["article"].renders_attribute("body"));
        // Other types keep their defaults
        assert_eq!(fields["user"].attributes, set(&["email"]));
    }

    #[test]
    fn empty_explicit_fields_render_nothing() {
        let selection = Selection::new().with_fields("user", "");
        let fields = resolve_fields(&blog(), &selection).unwrap();
        assert!(fields["user"].attributes.is_empty());
        assert!(fields["user"].relationships.is_empty());
        assert!(fields["user"].explicit);
    }

    #[test]
    fn explicit_fields_split_attributes_and_relationships() {
        let selection = Selection::new().with_fields("user", "name,articles");
        let fields = resolve_fields(&blog(), &selection).unwrap();
        assert_eq!(fields["user"].attributes, set(&["name"]));
        assert_eq!(fields["user"].relationships, set(&["articles"]));
    }

    #[test]
    fn unknown_field_errors() {
        let selection = Selection::new().with_fields("user", "email,age");
        let result = resolve_fields(&blog(), &selection);
        assert!(matches!(
            result,
            Err(ShapeError::Selection(SelectionError::UnknownField { type_name, field }))
                if type_name == "user" && field == "age"
        ));
    }

    #[test]
    fn unknown_fields_type_errors() {
        let selection = Selection::new().with_fields("articles", "title");
        let result = resolve_fields(&blog(), &selection);
        assert!(matches!(
            result,
            Err(ShapeError::Selection(SelectionError::UnknownType { type_name }))
                if type_name == "articles"
        ));
    }

    #[test]
    fn relationship_rendering_rules() {
        let registry = blog();
        let defaults = FieldSet::defaults(&registry, "user").unwrap();
        assert_eq!(defaults.attributes, registry.default_fields("user").unwrap());
        assert_eq!(defaults.relationships, registry.default_includes("user").unwrap());
        assert!(!defaults.renders_relationship("articles", false));
        assert!(defaults.renders_relationship("articles", true));

        let explicit = FieldSet::explicit(registry.get("article").unwrap(), &set(&["title"]));
        assert!(!explicit.renders_relationship("author", true));
    }

    // === Include resolution ===

    #[test]
    fn default_walk_stops_at_non_default_relationship() {
        let tree = resolve_include_tree(&blog(), "article", &Selection::new()).unwrap();
        assert_eq!(tree.paths(), vec!["author".to_string()]);
        assert!(tree.child("author").unwrap().is_empty());
    }

    #[test]
    fn default_walk_terminates_on_cycles() {
        let registry = SchemaRegistry::register([
            ResourceTypeSchema::new("article").relationship(
                "author",
                Cardinality::One,
                "user",
                true,
            ),
            ResourceTypeSchema::new("user").relationship(
                "articles",
                Cardinality::Many,
                "article",
                true,
            ),
        ])
        .unwrap();

        let tree = resolve_include_tree(&registry, "article", &Selection::new()).unwrap();
        assert_eq!(tree.paths(), vec!["author".to_string()]);

        let tree = resolve_include_tree(&registry, "user", &Selection::new()).unwrap();
        assert_eq!(tree.paths(), vec!["articles".to_string()]);
    }

    #[test]
    fn default_walk_never_expands_self_reference() {
        let registry = SchemaRegistry::register([ResourceTypeSchema::new("comment")
            .relationship("parent", Cardinality::One, "comment", true)])
        .unwrap();
        let tree = resolve_include_tree(&registry, "comment", &Selection::new()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn default_walk_revisits_type_on_other_branch() {
        // user is reachable twice, on sibling branches; both expand
        let registry = SchemaRegistry::register([
            ResourceTypeSchema::new("article")
                .relationship("author", Cardinality::One, "user", true)
                .relationship("editor", Cardinality::One, "user", true),
            ResourceTypeSchema::new("user"),
        ])
        .unwrap();
        let tree = resolve_include_tree(&registry, "article", &Selection::new()).unwrap();
        assert_eq!(tree.paths(), vec!["author".to_string(), "editor".to_string()]);
    }

    #[test]
    fn explicit_include_replaces_default_walk() {
        let selection = Selection::new().with_include("author,author.articles");
        let tree = resolve_include_tree(&blog(), "article", &selection).unwrap();
        assert_eq!(
            tree.paths(),
            vec!["author".to_string(), "author.articles".to_string()]
        );
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn empty_explicit_include_expands_nothing() {
        let selection = Selection::new().with_include("");
        let tree = resolve_include_tree(&blog(), "article", &selection).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn explicit_include_allows_cyclic_paths() {
        let selection =
            Selection::new().with_include("author,author.articles,author.articles.author");
        let tree = resolve_include_tree(&blog(), "article", &selection).unwrap();
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn include_path_without_prerequisite_errors() {
        let selection = Selection::new().with_include("author.articles");
        let result = resolve_include_tree(&blog(), "article", &selection);
        assert!(matches!(
            result,
            Err(ShapeError::Selection(SelectionError::InvalidIncludePath { path, reason }))
                if path == "author.articles" && reason.contains("\"author\"")
        ));
    }

    #[test]
    fn include_path_unknown_segment_errors() {
        let selection = Selection::new().with_include("author,author.comments");
        let result = resolve_include_tree(&blog(), "article", &selection);
        assert!(matches!(
            result,
            Err(ShapeError::Selection(SelectionError::InvalidIncludePath { reason, .. }))
                if reason.contains("'comments'") && reason.contains("'user'")
        ));
    }

    #[test]
    fn include_path_attribute_is_not_a_relationship() {
        let selection = Selection::new().with_include("title");
        let result = resolve_include_tree(&blog(), "article", &selection);
        assert!(matches!(
            result,
            Err(ShapeError::Selection(SelectionError::InvalidIncludePath { .. }))
        ));
    }

    #[test]
    fn include_path_empty_segment_errors() {
        let selection = Selection::new().with_include("author..articles");
        let result = resolve_include_tree(&blog(), "article", &selection);
        assert!(matches!(
            result,
            Err(ShapeError::Selection(SelectionError::InvalidIncludePath { .. }))
        ));
    }

    #[test]
    fn unknown_primary_type_errors() {
        let result = resolve_selection(&blog(), ["comment"], &Selection::new());
        assert!(matches!(
            result,
            Err(ShapeError::Schema(SchemaError::UnknownType { .. }))
        ));
    }

    #[test]
    fn selection_validated_without_primary_types() {
        let selection = Selection::new().with_fields("user", "age");
        let result = resolve_selection(&blog(), std::iter::empty(), &selection);
        assert!(matches!(
            result,
            Err(ShapeError::Selection(SelectionError::UnknownField { .. }))
        ));
    }

    #[test]
    fn effective_selection_per_primary_type() {
        let plan = resolve_selection(&blog(), ["article", "user", "article"], &Selection::new())
            .unwrap();
        assert!(plan.include_tree("article").unwrap().expands("author"));
        assert!(plan.include_tree("user").unwrap().is_empty());
        assert!(plan.field_set("user").is_some());
    }
}
