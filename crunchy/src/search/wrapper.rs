use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use super::loader::SourceObject;
use crate::index::IndexDefinition;

/// A read-only view of a single hit, built without touching the source of
/// truth.
#[derive(Debug, Clone)]
pub struct Wrapper {
    index_name: String,
    index: Option<Arc<IndexDefinition>>,
    hit: Value,
}

impl Wrapper {
    pub fn from_hit(hit: Value, index: Option<Arc<IndexDefinition>>) -> Self {
        let index_name = hit
            .get("_index")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            index_name,
            index,
            hit,
        }
    }

    pub fn id(&self) -> Option<String> {
        hit_id(&self.hit)
    }

    /// Name of the physical index the hit came from.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The registered index the hit was resolved to, if any.
    pub fn index(&self) -> Option<&Arc<IndexDefinition>> {
        self.index.as_ref()
    }

    pub fn score(&self) -> Option<f64> {
        self.hit.get("_score").and_then(Value::as_f64)
    }

    pub fn source(&self) -> Option<&Value> {
        self.hit.get("_source")
    }

    /// A field of `_source`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.source()?.get(field)
    }

    pub fn highlight(&self) -> Option<&Value> {
        self.hit.get("highlight")
    }

    pub fn explanation(&self) -> Option<&Value> {
        self.hit.get("_explanation")
    }

    pub fn hit(&self) -> &Value {
        &self.hit
    }
}

impl PartialEq for Wrapper {
    fn eq(&self, other: &Self) -> bool {
        self.index_name == other.index_name && self.hit == other.hit
    }
}

impl SourceObject for Wrapper {
    fn object_id(&self) -> Option<String> {
        self.id()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The `_id` of a hit as a string.
pub(crate) fn hit_id(hit: &Value) -> Option<String> {
    match hit.get("_id")? {
        Value::String(id) => Some(id.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
