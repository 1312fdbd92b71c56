use serde_json::{Map, Value};

use super::indices::{self, IndexRef};
use super::order::{self, SortClause};
use crate::search::query::{and_optional, QueryNode};

/// Value holder for a single request parameter.
///
/// Storages are never changed in place: [`Storage::update`] computes the
/// merged storage and the owning [`Parameters`](super::Parameters) swaps it in.
#[derive(Debug, Clone)]
pub enum Storage {
    Bool(bool),
    Integer(Option<u64>),
    String(Option<String>),
    Hash(Map<String, Value>),
    StringArray(Vec<String>),
    Order(Vec<SortClause>),
    Query(Option<QueryNode>),
    Indices(Vec<IndexRef>),
}

impl Storage {
    /// Merge `new` on top of this storage according to the variant's policy.
    ///
    /// * scalars: last write wins
    /// * hashes: deep merge, new leaves win
    /// * string arrays and indices: union
    /// * order: same field replaced in place, new fields appended
    /// * query: AND-combined
    pub fn update(&self, new: Storage) -> Storage {
        match (self, new) {
            (Self::Hash(current), Self::Hash(new)) => Self::Hash(deep_merge(current.clone(), new)),
            (Self::StringArray(current), Self::StringArray(new)) => {
                let mut values = current.clone();
                values.extend(new);
                Self::StringArray(values)
            }
            (Self::Order(current), Self::Order(new)) => Self::Order(order::merge(current, new)),
            (Self::Query(current), Self::Query(new)) => match new {
                Some(node) => Self::Query(Some(and_optional(current.clone(), node))),
                None => self.clone(),
            },
            (Self::Indices(current), Self::Indices(new)) => {
                Self::Indices(indices::union(current, new))
            }
            (_, new) => new,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Bool(value) => !value,
            Self::Integer(value) => value.is_none(),
            Self::String(value) => value.as_deref().map_or(true, |s| s.trim().is_empty()),
            Self::Hash(map) => map.is_empty(),
            Self::StringArray(values) => values.iter().all(|v| v.trim().is_empty()),
            Self::Order(clauses) => clauses.is_empty(),
            Self::Query(tree) => tree.is_none(),
            Self::Indices(refs) => indices::names(refs).is_empty(),
        }
    }

    /// The rendered value, or `None` when blank.
    pub fn render_value(&self) -> Option<Value> {
        if self.is_blank() {
            return None;
        }

        let value = match self {
            Self::Bool(value) => Value::Bool(*value),
            Self::Integer(value) => Value::from((*value)?),
            Self::String(value) => Value::String(value.clone()?),
            Self::Hash(map) => Value::Object(map.clone()),
            Self::StringArray(values) => Value::from(dedup(values)),
            Self::Order(clauses) => Value::Array(clauses.iter().map(SortClause::render).collect()),
            Self::Query(tree) => tree.as_ref()?.render(),
            Self::Indices(refs) => Value::from(indices::names(refs)),
        };
        Some(value)
    }

    /// Render as a `{key: value}` fragment; empty when the storage is blank.
    pub fn render(&self, key: &str) -> Map<String, Value> {
        let mut fragment = Map::new();
        if let Some(value) = self.render_value() {
            fragment.insert(key.to_string(), value);
        }
        fragment
    }
}

impl PartialEq for Storage {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Hash(a), Self::Hash(b)) => a == b,
            (Self::StringArray(a), Self::StringArray(b)) => dedup(a) == dedup(b),
            (Self::Order(a), Self::Order(b)) => a == b,
            (Self::Query(a), Self::Query(b)) => a == b,
            (Self::Indices(a), Self::Indices(b)) => indices::names(a) == indices::names(b),
            _ => false,
        }
    }
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        if !value.trim().is_empty() && !seen.contains(value) {
            seen.push(value.clone());
        }
    }
    seen
}

/// Recursively merge `new` into `current`: nested objects under the same key
/// merge, any other conflicting value is replaced by the new one.
pub fn deep_merge(mut current: Map<String, Value>, new: Map<String, Value>) -> Map<String, Value> {
    for (key, new_value) in new {
        let Some(slot) = current.get_mut(&key) else {
            current.insert(key, new_value);
            continue;
        };
        *slot = match (std::mem::take(slot), new_value) {
            (Value::Object(existing), Value::Object(incoming)) => {
                Value::Object(deep_merge(existing, incoming))
            }
            (_, incoming) => incoming,
        };
    }
    current
}
