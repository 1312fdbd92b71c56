use std::sync::Arc;

use crate::index::IndexDefinition;

/// An index to search: a registered definition or a raw index name.
///
/// Two references are equal when they resolve to the same index name, no
/// matter how they were given.
#[derive(Debug, Clone)]
pub enum IndexRef {
    Definition(Arc<IndexDefinition>),
    Name(String),
}

impl IndexRef {
    /// The index name sent over the wire.
    pub fn name(&self) -> String {
        match self {
            Self::Definition(definition) => definition.index_name(),
            Self::Name(name) => name.clone(),
        }
    }

    pub fn definition(&self) -> Option<&Arc<IndexDefinition>> {
        match self {
            Self::Definition(definition) => Some(definition),
            Self::Name(_) => None,
        }
    }
}

impl PartialEq for IndexRef {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl From<Arc<IndexDefinition>> for IndexRef {
    fn from(definition: Arc<IndexDefinition>) -> Self {
        Self::Definition(definition)
    }
}

impl From<&Arc<IndexDefinition>> for IndexRef {
    fn from(definition: &Arc<IndexDefinition>) -> Self {
        Self::Definition(definition.clone())
    }
}

impl From<&str> for IndexRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for IndexRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Union two reference lists, keeping the first reference seen per name.
pub(crate) fn union(current: &[IndexRef], new: Vec<IndexRef>) -> Vec<IndexRef> {
    let mut result = current.to_vec();
    for index in new {
        if !index.name().trim().is_empty() && !result.contains(&index) {
            result.push(index);
        }
    }
    result
}

/// Resolved names, deduplicated and lexically sorted.
pub(crate) fn names(indices: &[IndexRef]) -> Vec<String> {
    let mut names: Vec<String> = indices
        .iter()
        .map(IndexRef::name)
        .filter(|name| !name.trim().is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_and_names_compare_by_resolved_name() {
        let cities = IndexDefinition::builder("cities").build().unwrap();
        assert_eq!(IndexRef::from(&cities), IndexRef::from("cities"));
        assert_ne!(IndexRef::from(&cities), IndexRef::from("countries"));
    }

    #[test]
    fn union_skips_known_and_blank_names() {
        let cities = IndexDefinition::builder("cities").build().unwrap();
        let merged = union(
            &[IndexRef::from(&cities)],
            vec!["cities".into(), "".into(), "countries".into()],
        );
        assert_eq!(merged.len(), 2);
        assert!(merged[0].definition().is_some());
    }

    #[test]
    fn names_are_sorted_and_deduplicated() {
        let refs: Vec<IndexRef> = vec!["places".into(), "cities".into(), "places".into()];
        assert_eq!(names(&refs), vec!["cities", "places"]);
    }
}
