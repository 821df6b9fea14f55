//! JSON:API Shape Resolver
//!
//! Runtime resolution of JSON:API sparse fieldsets and include trees.
//!
//! Given a schema registry that marks, per resource type, which attributes
//! render by default and which relationships are included by default, this
//! library turns a compound document (`data` plus a flat `included` array)
//! into a resolved tree: attributes pruned to the selected fields, included
//! relationships inlined, everything else left as bare identifiers.
//!
//! # Example
//!
//! ```
//! use jsonapi_shape::{resolve, Cardinality, ResolveOptions, ResourceTypeSchema, SchemaRegistry, Selection};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::register([
//!     ResourceTypeSchema::new("article")
//!         .attribute("title", true)
//!         .attribute("body", true)
//!         .relationship("author", Cardinality::One, "user", true),
//!     ResourceTypeSchema::new("user")
//!         .attribute("email", true)
//!         .attribute("name", false)
//!         .relationship("articles", Cardinality::Many, "article", false),
//! ])
//! .unwrap();
//!
//! let document = json!({
//!     "data": {
//!         "type": "article", "id": "42",
//!         "attributes": { "title": "T", "body": "B" },
//!         "relationships": { "author": { "type": "user", "id": "1" } }
//!     },
//!     "included": [{
//!         "type": "user", "id": "1",
//!         "attributes": { "email": "e", "name": "n" },
//!         "relationships": { "articles": [] }
//!     }]
//! });
//!
//! let resolved = resolve(&registry, &document, &Selection::new(), &ResolveOptions::new()).unwrap();
//!
//! // The author is inlined with only its default attributes
//! assert_eq!(resolved["data"]["relationships"]["author"]["attributes"], json!({ "email": "e" }));
//! ```
//!
//! # Selection Rules
//!
//! | Input | Effect |
//! |-------|--------|
//! | no `fields[T]` | `T` renders its default attributes |
//! | `fields[T]=a,b` | `T` renders exactly `a`, `b` (replaces defaults) |
//! | no `include` | default-included relationships expand, never re-entering a type already on the path |
//! | `include=a,a.b` | exactly the listed paths expand (replaces defaults) |

mod assembler;
mod document;
mod error;
mod index;
mod loader;
mod openapi;
mod registry;
mod resolver;
mod selection;
mod types;
mod validator;

pub use assembler::assemble;
pub use document::{parse_document, parse_resource};
pub use error::{DataError, LoadError, SchemaError, SelectionError, ShapeError, Violation};
pub use index::DocumentIndex;
pub use loader::{is_url, load_json, load_json_auto, load_json_str, load_registry};
pub use openapi::registry_from_openapi;
pub use registry::SchemaRegistry;
pub use resolver::{resolve, resolve_document};
pub use selection::{
    resolve_fields, resolve_include_tree, resolve_selection, EffectiveSelection, FieldSet,
    IncludeTree, Selection,
};
pub use types::{
    AttributeSpec, Cardinality, CompoundDocument, DanglingPolicy, PrimaryData, RelationshipData,
    RelationshipSpec, ResolveOptions, ResourceIdentifier, ResourceObject, ResourceTypeSchema,
};
pub use validator::{document_schema, validate_document};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
