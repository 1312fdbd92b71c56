//! The boundary between request composition and the document-search engine.
//!
//! Everything this crate needs from the engine goes through [`SearchEngine`]:
//! a search call, a scroll continuation and a scroll release.

mod http;
#[cfg(test)]
mod mock;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EngineError;

pub use http::HttpEngine;
#[cfg(test)]
pub use mock::{reply_with_hits, MockSearchEngine};

/// A request rendered to the engine's wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedRequest {
    /// Target index names, deduplicated and sorted.
    pub index: Vec<String>,
    /// The search body: query, aggs, size and friends.
    pub body: Map<String, Value>,
    /// URI query-string search (`q=`), sent instead of a body query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Keep-alive for a scroll cursor opened by this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<String>,
}

impl RenderedRequest {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Operations this crate requires from a document-search engine client.
///
/// Implementations return the raw reply body; decoding is left to
/// [`Response`](crate::search::Response).
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Run a search and return the raw reply.
    async fn search(&self, request: &RenderedRequest) -> Result<Value, EngineError>;

    /// Fetch the next batch of an open scroll cursor.
    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, EngineError>;

    /// Release a scroll cursor held by the engine.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), EngineError>;
}
