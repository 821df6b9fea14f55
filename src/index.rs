//! Lookup table of a document's resources keyed by `(type, id)`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::DataError;
use crate::types::{ResourceIdentifier, ResourceObject};

/// Borrowed index over the resources of one document.
#[derive(Debug, Default)]
pub struct DocumentIndex<'a> {
    entries: HashMap<&'a ResourceIdentifier, &'a ResourceObject>,
}

impl<'a> DocumentIndex<'a> {
    /// Index every resource by identifier.
    ///
    /// Exact duplicates are accepted once.
    ///
    /// # Errors
    ///
    /// Returns `DataError::DuplicateResource` if two resources share an
    /// identifier but differ in content.
    pub fn build(
        resources: impl IntoIterator<Item = &'a ResourceObject>,
    ) -> Result<Self, DataError> {
        let mut entries = HashMap::new();
        for resource in resources {
            match entries.entry(&resource.identifier) {
                Entry::Occupied(existing) => {
                    if *existing.get() != resource {
                        return Err(DataError::DuplicateResource {
                            identifier: resource.identifier.clone(),
                        });
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(resource);
                }
            }
        }
        Ok(Self { entries })
    }

    /// The stored resource, or `None` if the document doesn't carry it.
    pub fn lookup(&self, identifier: &ResourceIdentifier) -> Option<&'a ResourceObject> {
        self.entries.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &ResourceIdentifier) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: &str, email: &str) -> ResourceObject {
        let mut resource = ResourceObject::new("user", id);
        resource
            .attributes
            .insert("email".to_string(), json!(email));
        resource
    }

    #[test]
    fn lookup_returns_stored_resource() {
        let resources = vec![user("1", "a@example.com"), user("2", "b@example.com")];
        let index = DocumentIndex::build(&resources).unwrap();

        let found = index.lookup(&ResourceIdentifier::new("user", "2")).unwrap();
        assert!(std::ptr::eq(found, &resources[1]));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn lookup_missing_is_none() {
        let resources = vec![user("1", "a@example.com")];
        let index = DocumentIndex::build(&resources).unwrap();
        assert!(index.lookup(&ResourceIdentifier::new("user", "9")).is_none());
        // Same id, different type
        assert!(!index.contains(&ResourceIdentifier::new("article", "1")));
    }

    #[test]
    fn exact_duplicate_is_noop() {
        let resources = vec![user("1", "a@example.com"), user("1", "a@example.com")];
        let index = DocumentIndex::build(&resources).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn conflicting_duplicate_errors() {
        let resources = vec![user("1", "a@example.com"), user("1", "other@example.com")];
        let result = DocumentIndex::build(&resources);
        assert!(matches!(
            result,
            Err(DataError::DuplicateResource { identifier })
                if identifier == ResourceIdentifier::new("user", "1")
        ));
    }

    #[test]
    fn empty_index() {
        let index = DocumentIndex::build(std::iter::empty()).unwrap();
        assert!(index.is_empty());
    }
}
