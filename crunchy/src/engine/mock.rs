//! Mock engine implementation for testing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use super::{RenderedRequest, SearchEngine};
use crate::error::EngineError;

/// In-memory engine replaying scripted replies and recording every call.
///
/// Search replies are consumed in order; once exhausted, the last configured
/// reply (or an empty reply) is repeated.
#[derive(Clone, Default)]
pub struct MockSearchEngine {
    search_replies: Arc<RwLock<VecDeque<Result<Value, EngineError>>>>,
    scroll_replies: Arc<RwLock<VecDeque<Result<Value, EngineError>>>>,
    searches: Arc<RwLock<Vec<RenderedRequest>>>,
    scrolls: Arc<RwLock<Vec<(String, String)>>>,
    cleared: Arc<RwLock<Vec<String>>>,
}

#[allow(dead_code)]
impl MockSearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next search call.
    pub fn with_search_reply(self, reply: Value) -> Self {
        self.search_replies.write().unwrap().push_back(Ok(reply));
        self
    }

    /// Queue a failure for the next search call.
    pub fn with_search_error(self, error: EngineError) -> Self {
        self.search_replies.write().unwrap().push_back(Err(error));
        self
    }

    /// Queue replies for subsequent scroll calls.
    pub fn with_scroll_replies(self, replies: Vec<Value>) -> Self {
        self.scroll_replies
            .write()
            .unwrap()
            .extend(replies.into_iter().map(Ok));
        self
    }

    pub fn searches(&self) -> Vec<RenderedRequest> {
        self.searches.read().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.searches.read().unwrap().len()
    }

    pub fn scrolls(&self) -> Vec<(String, String)> {
        self.scrolls.read().unwrap().clone()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.cleared.read().unwrap().clone()
    }
}

/// Build a raw reply body out of `(index, id, source)` triples.
pub fn reply_with_hits(hits: &[(&str, &str, Value)]) -> Value {
    let hits: Vec<Value> = hits
        .iter()
        .map(|(index, id, source)| {
            json!({"_index": index, "_id": id, "_score": 1.0, "_source": source})
        })
        .collect();
    json!({
        "took": 3,
        "timed_out": false,
        "hits": {"total": {"value": hits.len()}, "max_score": 1.0, "hits": hits}
    })
}

#[async_trait]
impl SearchEngine for MockSearchEngine {
    async fn search(&self, request: &RenderedRequest) -> Result<Value, EngineError> {
        self.searches.write().unwrap().push(request.clone());

        let mut replies = self.search_replies.write().unwrap();
        if replies.len() > 1 {
            return replies.pop_front().unwrap_or_else(|| Ok(json!({})));
        }
        replies.front().cloned().unwrap_or_else(|| Ok(json!({})))
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, EngineError> {
        self.scrolls
            .write()
            .unwrap()
            .push((scroll_id.to_string(), keep_alive.to_string()));

        self.scroll_replies
            .write()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"_scroll_id": scroll_id, "hits": {"hits": []}})))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), EngineError> {
        self.cleared.write().unwrap().push(scroll_id.to_string());
        Ok(())
    }
}
