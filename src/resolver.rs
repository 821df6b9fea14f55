//! Top-level document resolution.

use serde_json::{Map, Value};
use tracing::debug;

use crate::assembler::assemble;
use crate::document::parse_document;
use crate::error::ShapeError;
use crate::index::DocumentIndex;
use crate::registry::SchemaRegistry;
use crate::selection::{resolve_selection, Selection};
use crate::types::{CompoundDocument, ResolveOptions};
use crate::validator::validate_document;

/// Resolve a JSON:API document against the registry and a selection.
///
/// Returns `{"data": ...}` with attributes pruned to the selected fields and
/// expanded relationships inlined. There is no `included` member in the output;
/// top-level `meta`, `links` and `jsonapi` are copied through.
///
/// # Errors
///
/// Structural problems surface as `DataError::MalformedDocument`; schema and
/// selection errors are raised before any assembly starts.
pub fn resolve(
    registry: &SchemaRegistry,
    document: &Value,
    selection: &Selection,
    options: &ResolveOptions,
) -> Result<Value, ShapeError> {
    validate_document(document)?;
    let document = parse_document(document)?;
    resolve_document(registry, &document, selection, options)
}

/// Resolve an already parsed document.
pub fn resolve_document(
    registry: &SchemaRegistry,
    document: &CompoundDocument,
    selection: &Selection,
    options: &ResolveOptions,
) -> Result<Value, ShapeError> {
    let primary = document.primary.resources();

    let plan = resolve_selection(
        registry,
        primary.iter().map(|resource| resource.type_name()),
        selection,
    )?;

    let index = DocumentIndex::build(primary.iter().chain(&document.included))?;
    debug!(
        primary = primary.len(),
        included = document.included.len(),
        indexed = index.len(),
        "indexed document"
    );

    let data = assemble(&document.primary, &index, &plan, registry, options)?;

    let mut out = Map::new();
    out.insert("data".to_string(), data);
    for (key, value) in &document.passthrough {
        out.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(out))
}
