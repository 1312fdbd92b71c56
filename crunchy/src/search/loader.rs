//! Materialization of hits into source objects.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use super::wrapper::{hit_id, Wrapper};
use crate::error::Result;
use crate::index::IndexDefinition;

/// An object a hit materializes into.
pub trait SourceObject: fmt::Debug + Send + Sync + 'static {
    /// Identifier matching the `_id` of the hit the object belongs to.
    fn object_id(&self) -> Option<String>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn SourceObject {
    pub fn downcast_ref<T: SourceObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

pub type Object = Arc<dyn SourceObject>;

/// Fetches source objects by id, typically from the primary database.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Fetch the objects for `ids` of `index`, narrowed by `scope` when given.
    ///
    /// Ids with no object are skipped.
    async fn fetch_batch(&self, index: &str, ids: &[String], scope: Option<&Value>)
        -> Result<Vec<Object>>;

    /// Whether `fetch_batch` returns objects in the order of `ids`.
    ///
    /// Ordered results are paired with hits positionally; otherwise they are
    /// matched by [`SourceObject::object_id`].
    fn preserves_order(&self) -> bool {
        true
    }
}

/// How a response materializes its hits, set through
/// [`Request::load`](super::Request::load).
#[derive(Clone, Default)]
pub struct LoadOptions {
    scope: Option<Value>,
    index_scopes: HashMap<String, Value>,
    sources: HashMap<String, Arc<dyn ObjectSource>>,
    concurrent: Option<bool>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope applied to every index without its own.
    pub fn scope(mut self, scope: Value) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Scope for one index, by base or derivable name.
    pub fn index_scope(mut self, index: impl Into<String>, scope: Value) -> Self {
        self.index_scopes.insert(index.into(), scope);
        self
    }

    /// Override the object source of one index, by base or derivable name.
    pub fn source(mut self, index: impl Into<String>, source: Arc<dyn ObjectSource>) -> Self {
        self.sources.insert(index.into(), source);
        self
    }

    /// Fetch index groups concurrently instead of one after another.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = Some(concurrent);
        self
    }

    /// Combine with `other`, whose entries win.
    pub fn merge(&self, other: &LoadOptions) -> Self {
        let mut merged = self.clone();
        if other.scope.is_some() {
            merged.scope = other.scope.clone();
        }
        merged.index_scopes.extend(other.index_scopes.clone());
        merged.sources.extend(other.sources.clone());
        if other.concurrent.is_some() {
            merged.concurrent = other.concurrent;
        }
        merged
    }

    fn scope_for(&self, index: Option<&IndexDefinition>) -> Option<&Value> {
        index
            .and_then(|index| lookup(&self.index_scopes, index))
            .or(self.scope.as_ref())
    }

    fn source_for<'a>(&'a self, index: &'a IndexDefinition) -> Option<&'a Arc<dyn ObjectSource>> {
        lookup(&self.sources, index).or(index.source())
    }
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, index: &IndexDefinition) -> Option<&'a T> {
    map.get(index.derivable_name())
        .or_else(|| map.get(index.base_name()))
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<&String> = self.sources.keys().collect();
        sources.sort();
        f.debug_struct("LoadOptions")
            .field("scope", &self.scope)
            .field("index_scopes", &self.index_scopes)
            .field("sources", &sources)
            .field("concurrent", &self.concurrent)
            .finish()
    }
}

/// Hits of one physical index, with their positions in the reply.
struct Group<'a> {
    index_name: &'a str,
    index: Option<Arc<IndexDefinition>>,
    hits: Vec<(usize, &'a Value)>,
}

/// Resolves hits to their registered index and loads their objects.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    indices: Vec<Arc<IndexDefinition>>,
    options: LoadOptions,
}

impl Loader {
    pub fn new(indices: Vec<Arc<IndexDefinition>>, options: LoadOptions) -> Self {
        Self { indices, options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// The index a hit's `_index` belongs to: an exact name match, else the
    /// longest known name followed by `_<digits>` (a timestamped physical
    /// index behind an alias).
    pub fn derive_index(&self, index_name: &str) -> Option<&Arc<IndexDefinition>> {
        if let Some(exact) = self
            .indices
            .iter()
            .find(|index| index.index_name() == index_name)
        {
            return Some(exact);
        }

        self.indices
            .iter()
            .filter(|index| is_versioned_name(index_name, &index.index_name()))
            .max_by_key(|index| index.index_name().len())
    }

    pub fn wrap(&self, hit: &Value) -> Wrapper {
        let index = hit
            .get("_index")
            .and_then(Value::as_str)
            .and_then(|name| self.derive_index(name))
            .cloned();
        Wrapper::from_hit(hit.clone(), index)
    }

    /// Materialize `hits`, in hit order.
    ///
    /// Hits whose objects are missing upstream are dropped, so the result can
    /// be shorter than `hits`.
    pub async fn load(&self, hits: &[Value]) -> Result<Vec<Object>> {
        let groups = self.group(hits);

        let loaded = if self.options.concurrent.unwrap_or(false) {
            try_join_all(groups.iter().map(|group| self.load_group(group))).await?
        } else {
            let mut loaded = Vec::with_capacity(groups.len());
            for group in &groups {
                loaded.push(self.load_group(group).await?);
            }
            loaded
        };

        let mut positioned: Vec<(usize, Object)> = loaded.into_iter().flatten().collect();
        positioned.sort_by_key(|(position, _)| *position);
        Ok(positioned.into_iter().map(|(_, object)| object).collect())
    }

    fn group<'a>(&self, hits: &'a [Value]) -> Vec<Group<'a>> {
        let mut groups: Vec<Group<'a>> = Vec::new();
        for (position, hit) in hits.iter().enumerate() {
            let index_name = hit.get("_index").and_then(Value::as_str).unwrap_or_default();
            match groups.iter_mut().find(|g| g.index_name == index_name) {
                Some(group) => group.hits.push((position, hit)),
                None => groups.push(Group {
                    index_name,
                    index: self.derive_index(index_name).cloned(),
                    hits: vec![(position, hit)],
                }),
            }
        }
        groups
    }

    async fn load_group(&self, group: &Group<'_>) -> Result<Vec<(usize, Object)>> {
        let source = group
            .index
            .as_deref()
            .and_then(|index| self.options.source_for(index));

        let Some(source) = source else {
            return Ok(group
                .hits
                .iter()
                .map(|(position, hit)| {
                    let wrapper = Wrapper::from_hit((*hit).clone(), group.index.clone());
                    (*position, Arc::new(wrapper) as Object)
                })
                .collect());
        };

        let (positions, ids): (Vec<usize>, Vec<String>) = group
            .hits
            .iter()
            .filter_map(|(position, hit)| Some((*position, hit_id(hit)?)))
            .unzip();
        let scope = self.options.scope_for(group.index.as_deref());
        let objects = source.fetch_batch(group.index_name, &ids, scope).await?;

        if objects.len() < ids.len() {
            debug!(
                index = group.index_name,
                requested = ids.len(),
                loaded = objects.len(),
                "Some hits have no source object"
            );
        }

        if source.preserves_order() {
            return Ok(positions.into_iter().zip(objects).collect());
        }

        let mut by_id: HashMap<String, Object> = objects
            .into_iter()
            .filter_map(|object| Some((object.object_id()?, object)))
            .collect();
        Ok(group
            .hits
            .iter()
            .filter_map(|(position, hit)| Some((*position, by_id.remove(&hit_id(hit)?)?)))
            .collect())
    }
}

fn is_versioned_name(index_name: &str, base: &str) -> bool {
    index_name
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
}
