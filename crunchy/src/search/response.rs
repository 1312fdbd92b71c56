use std::sync::OnceLock;

use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use super::loader::{Loader, Object};
use super::pagination::{Page, Pagination};
use super::wrapper::Wrapper;
use crate::error::Result;

/// Decoded view over a raw search reply.
///
/// Accessors never fail: missing keys read as empty, zero, `None` or
/// `false`. Wrappers and objects are built on first access and memoized.
#[derive(Debug)]
pub struct Response {
    body: Value,
    loader: Loader,
    pagination: Option<Pagination>,
    wrappers: OnceLock<Vec<Wrapper>>,
    objects: OnceCell<Vec<Object>>,
}

impl Response {
    pub fn new(body: Value, loader: Loader, pagination: Option<Pagination>) -> Self {
        Self {
            body,
            loader,
            pagination,
            wrappers: OnceLock::new(),
            objects: OnceCell::new(),
        }
    }

    /// A response with no hits, for requests that never reach the engine.
    pub fn empty(pagination: Option<Pagination>) -> Self {
        Self::new(Value::Object(Map::new()), Loader::default(), pagination)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    fn hits_root(&self) -> Option<&Value> {
        self.body.get("hits")
    }

    pub fn hits(&self) -> &[Value] {
        self.hits_root()
            .and_then(|root| root.get("hits"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total hit count. Reads `hits.total.value`, or a bare number from older
    /// engines.
    pub fn total(&self) -> u64 {
        match self.hits_root().and_then(|root| root.get("total")) {
            Some(Value::Number(total)) => total.as_u64().unwrap_or(0),
            Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
            None => 0,
        }
    }

    pub fn max_score(&self) -> Option<f64> {
        self.hits_root()?.get("max_score")?.as_f64()
    }

    /// Engine-side duration in milliseconds.
    pub fn took(&self) -> Option<u64> {
        self.body.get("took")?.as_u64()
    }

    /// Whether the engine stopped collecting hits at `terminate_after`.
    pub fn terminated_early(&self) -> bool {
        self.body
            .get("terminated_early")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn timed_out(&self) -> bool {
        self.body
            .get("timed_out")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn suggest(&self) -> Map<String, Value> {
        object_at(&self.body, "suggest")
    }

    pub fn aggs(&self) -> Map<String, Value> {
        object_at(&self.body, "aggregations")
    }

    pub fn scroll_id(&self) -> Option<&str> {
        self.body.get("_scroll_id")?.as_str()
    }

    /// One [`Wrapper`] per hit.
    pub fn wrappers(&self) -> &[Wrapper] {
        self.wrappers
            .get_or_init(|| self.hits().iter().map(|hit| self.loader.wrap(hit)).collect())
    }

    /// Hits materialized through the loader, in hit order.
    pub async fn objects(&self) -> Result<&[Object]> {
        let objects = self
            .objects
            .get_or_try_init(|| self.loader.load(self.hits()))
            .await?;
        Ok(objects.as_slice())
    }

    /// Wrappers zipped with their objects.
    ///
    /// Pairing is positional, so when objects are missing upstream the
    /// shorter side wins and later hits are dropped.
    pub async fn object_pairs(&self) -> Result<Vec<(Wrapper, Object)>> {
        let wrappers = self.wrappers();
        let objects = self.objects().await?;
        if wrappers.len() != objects.len() {
            debug!(
                hits = wrappers.len(),
                objects = objects.len(),
                "Pairing hits with fewer objects"
            );
        }
        Ok(wrappers.iter().cloned().zip(objects.iter().cloned()).collect())
    }

    fn pagination(&self) -> Pagination {
        self.pagination
            .unwrap_or_else(|| Pagination::new(None, None, self.hits().len() as u64))
    }

    pub fn current_page(&self) -> u64 {
        self.pagination().current_page()
    }

    pub fn total_pages(&self) -> u64 {
        self.pagination().total_pages(self.total())
    }

    pub fn limit_value(&self) -> u64 {
        self.pagination().limit_value()
    }

    pub fn offset_value(&self) -> u64 {
        self.pagination().offset_value()
    }

    /// Materialized objects together with the page they belong to.
    pub async fn objects_page(&self) -> Result<Page<Object>> {
        let items = self.objects().await?.to_vec();
        Ok(Page {
            items,
            current_page: self.current_page(),
            total_pages: self.total_pages(),
            limit_value: self.limit_value(),
            total: self.total(),
        })
    }
}

fn object_at(body: &Value, key: &str) -> Map<String, Value> {
    body.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
