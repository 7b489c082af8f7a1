//! The reference index: name -> fingerprint, tagged with its scheme.

use std::collections::BTreeMap;

use crate::error::{MatcherError, Result};
use crate::extractor::SchemeTag;
use crate::vector::FeatureVector;

/// In-memory catalog of reference fingerprints.
///
/// Entries are kept in a `BTreeMap` so iteration is ordered by name; the
/// matcher relies on this for deterministic tie-breaking. Every vector must
/// have the dimension implied by the index's [`SchemeTag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIndex {
    scheme: SchemeTag,
    entries: BTreeMap<String, FeatureVector>,
}

impl ReferenceIndex {
    /// Create an empty index for vectors of the given scheme.
    pub fn new(scheme: SchemeTag) -> Self {
        Self {
            scheme,
            entries: BTreeMap::new(),
        }
    }

    /// Rebuild an index from stored entries, validating every dimension.
    pub fn from_entries(
        scheme: SchemeTag,
        entries: impl IntoIterator<Item = (String, FeatureVector)>,
    ) -> Result<Self> {
        let mut index = Self::new(scheme);
        for (name, vector) in entries {
            index.upsert(name, vector)?;
        }
        Ok(index)
    }

    pub fn scheme(&self) -> SchemeTag {
        self.scheme
    }

    /// Vector length every entry must have.
    pub fn dimension(&self) -> usize {
        self.scheme.dimension()
    }

    /// Insert or overwrite the entry for `name`, returning the previous vector.
    pub fn upsert(
        &mut self,
        name: impl Into<String>,
        vector: FeatureVector,
    ) -> Result<Option<FeatureVector>> {
        let name = name.into();
        if name.is_empty() {
            return Err(MatcherError::Precondition(
                "reference name must not be empty".to_string(),
            ));
        }

        let expected = self.dimension();
        if vector.dimension() != expected {
            return Err(MatcherError::DimensionMismatch {
                expected,
                actual: vector.dimension(),
            });
        }

        Ok(self.entries.insert(name, vector))
    }

    /// Remove an entry by name
    pub fn remove(&mut self, name: &str) -> Result<FeatureVector> {
        self.entries
            .remove(name)
            .ok_or_else(|| MatcherError::EntryNotFound {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&FeatureVector> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(name, vector)` pairs in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureVector)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> SchemeTag {
        SchemeTag {
            version: 1,
            canonical_size: 1,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let mut index = ReferenceIndex::new(scheme());
        let previous = index.upsert("cat", FeatureVector::new(vec![1, 2, 3])).unwrap();
        assert!(previous.is_none());
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("cat").unwrap().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut index = ReferenceIndex::new(scheme());
        index.upsert("cat", FeatureVector::new(vec![1, 2, 3])).unwrap();
        let previous = index.upsert("cat", FeatureVector::new(vec![4, 5, 6])).unwrap();
        assert_eq!(previous.unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("cat").unwrap().as_slice(), &[4, 5, 6]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut index = ReferenceIndex::new(scheme());
        index.upsert("Cat", FeatureVector::new(vec![1, 2, 3])).unwrap();
        index.upsert("cat", FeatureVector::new(vec![4, 5, 6])).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["Cat", "cat"]);
    }

    #[test]
    fn test_dimension_enforced() {
        let mut index = ReferenceIndex::new(scheme());
        let result = index.upsert("cat", FeatureVector::new(vec![1, 2]));
        assert!(matches!(
            result,
            Err(MatcherError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut index = ReferenceIndex::new(scheme());
        let result = index.upsert("", FeatureVector::new(vec![1, 2, 3]));
        assert!(matches!(result, Err(MatcherError::Precondition(_))));
    }

    #[test]
    fn test_remove() {
        let mut index = ReferenceIndex::new(scheme());
        index.upsert("cat", FeatureVector::new(vec![1, 2, 3])).unwrap();
        index.remove("cat").unwrap();
        assert!(index.is_empty());
        assert!(matches!(
            index.remove("cat"),
            Err(MatcherError::EntryNotFound { .. })
        ));
    }
}
