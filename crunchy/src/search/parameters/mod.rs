//! Request parameters: one typed [`Storage`] per parameter name.

mod indices;
mod order;
mod storage;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

pub use indices::IndexRef;
pub use order::SortClause;
pub use storage::{deep_merge, Storage};

pub(crate) use order::parse as parse_order;

use crate::search::query::QueryNode;

/// Every parameter a request can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamName {
    Query,
    Limit,
    Offset,
    Order,
    Indices,
    Aggs,
    Highlight,
    Suggest,
    ScriptFields,
    Collapse,
    DocvalueFields,
    None,
    Profile,
    Timeout,
    TerminateAfter,
    TrackScores,
    Version,
}

impl ParamName {
    pub const ALL: [ParamName; 17] = [
        ParamName::Query,
        ParamName::Limit,
        ParamName::Offset,
        ParamName::Order,
        ParamName::Indices,
        ParamName::Aggs,
        ParamName::Highlight,
        ParamName::Suggest,
        ParamName::ScriptFields,
        ParamName::Collapse,
        ParamName::DocvalueFields,
        ParamName::None,
        ParamName::Profile,
        ParamName::Timeout,
        ParamName::TerminateAfter,
        ParamName::TrackScores,
        ParamName::Version,
    ];

    /// Key of the parameter in the rendered request.
    pub fn wire_key(self) -> &'static str {
        match self {
            ParamName::Query => "query",
            ParamName::Limit => "size",
            ParamName::Offset => "from",
            ParamName::Order => "sort",
            ParamName::Indices => "index",
            ParamName::Aggs => "aggs",
            ParamName::Highlight => "highlight",
            ParamName::Suggest => "suggest",
            ParamName::ScriptFields => "script_fields",
            ParamName::Collapse => "collapse",
            ParamName::DocvalueFields => "docvalue_fields",
            ParamName::None => "query",
            ParamName::Profile => "profile",
            ParamName::Timeout => "timeout",
            ParamName::TerminateAfter => "terminate_after",
            ParamName::TrackScores => "track_scores",
            ParamName::Version => "version",
        }
    }
}

/// The parameter set of a request.
///
/// Updating returns a new set; storages that did not change are shared with
/// the original through `Arc`, so cloning a set is cheap.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    storages: BTreeMap<ParamName, Arc<Storage>>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: ParamName) -> Option<&Storage> {
        self.storages.get(&name).map(Arc::as_ref)
    }

    /// Merge `storage` into the existing storage for `name`, if any.
    pub fn update(&self, name: ParamName, storage: Storage) -> Self {
        let merged = match self.get(name) {
            Some(current) => current.update(storage),
            None => storage,
        };
        self.replace(name, merged)
    }

    /// Swap the storage for `name` without merging.
    pub fn replace(&self, name: ParamName, storage: Storage) -> Self {
        let mut storages = self.storages.clone();
        storages.insert(name, Arc::new(storage));
        Self { storages }
    }

    /// Merge every storage of `other` on top of this set using each
    /// storage's own policy.
    pub fn merge(&self, other: &Parameters) -> Self {
        other
            .storages
            .iter()
            .fold(self.clone(), |acc, (name, storage)| {
                acc.update(*name, storage.as_ref().clone())
            })
    }

    /// Keep the named storages. Explicit indices always survive, so
    /// narrowing a request never widens the set of indices it searches.
    pub fn only(&self, names: &[ParamName]) -> Self {
        Self {
            storages: self
                .storages
                .iter()
                .filter(|(name, _)| **name == ParamName::Indices || names.contains(name))
                .map(|(name, storage)| (*name, storage.clone()))
                .collect(),
        }
    }

    pub fn except(&self, names: &[ParamName]) -> Self {
        Self {
            storages: self
                .storages
                .iter()
                .filter(|(name, _)| !names.contains(name))
                .map(|(name, storage)| (*name, storage.clone()))
                .collect(),
        }
    }

    pub fn query(&self) -> Option<&QueryNode> {
        match self.get(ParamName::Query)? {
            Storage::Query(tree) => tree.as_ref(),
            _ => None,
        }
    }

    pub fn integer(&self, name: ParamName) -> Option<u64> {
        match self.get(name)? {
            Storage::Integer(value) => *value,
            _ => None,
        }
    }

    /// Whether the match-none marker is set.
    pub fn is_none(&self) -> bool {
        matches!(self.get(ParamName::None), Some(Storage::Bool(true)))
    }

    pub fn indices(&self) -> &[IndexRef] {
        match self.get(ParamName::Indices) {
            Some(Storage::Indices(refs)) => refs,
            _ => &[],
        }
    }

    /// Explicitly requested index names, sorted and deduplicated.
    pub fn index_names(&self) -> Vec<String> {
        indices::names(self.indices())
    }

    /// Render the request body.
    ///
    /// When the match-none marker is set, the body is always
    /// `{"query": {"match_none": {}}}` regardless of the other parameters.
    pub fn render_body(&self) -> Map<String, Value> {
        if self.is_none() {
            let mut body = Map::new();
            body.insert("query".to_string(), json!({"match_none": {}}));
            return body;
        }

        self.storages
            .iter()
            .filter(|(name, _)| !matches!(name, ParamName::Indices | ParamName::None))
            .flat_map(|(name, storage)| storage.render(name.wire_key()))
            .collect()
    }
}

impl PartialEq for Parameters {
    fn eq(&self, other: &Self) -> bool {
        self.render_body() == other.render_body() && self.index_names() == other.index_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(fragment: Value) -> Storage {
        Storage::Query(QueryNode::from_fragment(fragment))
    }

    #[test]
    fn update_leaves_the_original_untouched() {
        let base = Parameters::new().update(ParamName::Limit, Storage::Integer(Some(10)));
        let changed = base.update(ParamName::Limit, Storage::Integer(Some(20)));

        assert_eq!(base.integer(ParamName::Limit), Some(10));
        assert_eq!(changed.integer(ParamName::Limit), Some(20));
    }

    #[test]
    fn unchanged_storages_are_shared() {
        let base = Parameters::new().update(ParamName::Query, query(json!({"match_all": {}})));
        let changed = base.update(ParamName::Limit, Storage::Integer(Some(5)));

        assert!(Arc::ptr_eq(
            &base.storages[&ParamName::Query],
            &changed.storages[&ParamName::Query]
        ));
    }

    #[test]
    fn render_uses_wire_keys_and_skips_blanks() {
        let params = Parameters::new()
            .update(ParamName::Limit, Storage::Integer(Some(5)))
            .update(ParamName::Offset, Storage::Integer(Some(10)))
            .update(ParamName::Profile, Storage::Bool(false))
            .update(ParamName::Highlight, Storage::Hash(Map::new()));

        assert_eq!(Value::Object(params.render_body()), json!({"size": 5, "from": 10}));
    }

    #[test]
    fn none_short_circuits_the_body() {
        let params = Parameters::new()
            .update(ParamName::Query, query(json!({"match": {"name": "Moscow"}})))
            .update(ParamName::Limit, Storage::Integer(Some(5)))
            .update(ParamName::None, Storage::Bool(true));

        assert_eq!(
            Value::Object(params.render_body()),
            json!({"query": {"match_none": {}}})
        );
    }

    #[test]
    fn merge_follows_each_storage_policy() {
        let left = Parameters::new()
            .update(ParamName::Limit, Storage::Integer(Some(10)))
            .update(ParamName::Query, query(json!({"a": 1})));
        let right = Parameters::new()
            .update(ParamName::Limit, Storage::Integer(Some(20)))
            .update(ParamName::Query, query(json!({"b": 2})));

        let merged = left.merge(&right);
        assert_eq!(merged.integer(ParamName::Limit), Some(20));
        assert_eq!(
            merged.render_body()["query"],
            json!({"bool": {"must": [{"a": 1}, {"b": 2}]}})
        );
    }

    #[test]
    fn only_and_except_filter_by_name() {
        let params = Parameters::new()
            .update(ParamName::Limit, Storage::Integer(Some(10)))
            .update(ParamName::Offset, Storage::Integer(Some(20)));

        assert_eq!(
            Value::Object(params.only(&[ParamName::Limit]).render_body()),
            json!({"size": 10})
        );
        assert_eq!(
            Value::Object(params.except(&[ParamName::Limit]).render_body()),
            json!({"from": 20})
        );
    }

    #[test]
    fn only_keeps_explicit_indices() {
        let params = Parameters::new()
            .update(
                ParamName::Indices,
                Storage::Indices(vec![IndexRef::Name("places".to_string())]),
            )
            .update(ParamName::Limit, Storage::Integer(Some(10)));

        let narrowed = params.only(&[ParamName::Query]);
        assert_eq!(narrowed.index_names(), vec!["places"]);
        assert!(narrowed.render_body().is_empty());
        assert!(params.except(&[ParamName::Indices]).index_names().is_empty());
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = Parameters::new()
            .update(ParamName::Limit, Storage::Integer(Some(10)))
            .update(ParamName::Timeout, Storage::String(Some("1s".to_string())));
        let b = Parameters::new()
            .update(ParamName::Timeout, Storage::String(Some("1s".to_string())))
            .update(ParamName::Limit, Storage::Integer(Some(10)));
        assert_eq!(a, b);
    }
}
