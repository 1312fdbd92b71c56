use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde_json::{json, Value};
use tracing::debug;

use super::{RenderedRequest, SearchEngine};
use crate::{config::Settings, error::EngineError};

/// [`SearchEngine`] speaking the Elasticsearch REST API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    base_url: Url,
}

impl HttpEngine {
    pub fn new(base_url: &str) -> Result<Self, EngineError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| EngineError::Transport(format!("Invalid engine URL {}: {}", base_url, e)))?;
        let client = Client::builder()
            .build()
            .map_err(|e| EngineError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        Self::new(&settings.url)
    }

    /// Append the given path segments to the base URL, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, EngineError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn search_url(&self, index: &[String]) -> Result<Url, EngineError> {
        let target = if index.is_empty() {
            "_all".to_string()
        } else {
            index.join(",")
        };
        self.endpoint(&[&target, "_search"])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, EngineError> {
        let resp = request
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Value>().await.map_err(|e| {
            EngineError::Parsing(format!("Failed to parse response as JSON: {}", e))
        })
    }
}

#[async_trait]
impl SearchEngine for HttpEngine {
    async fn search(&self, request: &RenderedRequest) -> Result<Value, EngineError> {
        let url = self.search_url(&request.index)?;
        debug!(%url, "POST search");

        let mut builder = self.client.post(url).json(&request.body);
        if let Some(q) = &request.q {
            builder = builder.query(&[("q", q)]);
        }
        if let Some(scroll) = &request.scroll {
            builder = builder.query(&[("scroll", scroll)]);
        }

        self.send(builder).await
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<Value, EngineError> {
        let url = self.endpoint(&["_search", "scroll"])?;
        let body = json!({"scroll": keep_alive, "scroll_id": scroll_id});

        self.send(self.client.post(url).json(&body)).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), EngineError> {
        let url = self.endpoint(&["_search", "scroll"])?;
        let body = json!({"scroll_id": [scroll_id]});

        self.send(self.client.delete(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_joins_indices() {
        let engine = HttpEngine::new("http://localhost:9200/").unwrap();
        let url = engine
            .search_url(&["cities".to_string(), "countries".to_string()])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/cities,countries/_search");
    }

    #[test]
    fn search_url_keeps_base_path() {
        let engine = HttpEngine::new("http://proxy.local/es").unwrap();
        let url = engine.search_url(&["cities".to_string()]).unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/es/cities/_search");
    }

    #[test]
    fn search_url_without_indices_targets_all() {
        let engine = HttpEngine::new("http://localhost:9200").unwrap();
        let url = engine.search_url(&[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/_all/_search");
    }

    #[test]
    fn invalid_base_url_is_a_transport_error() {
        assert!(matches!(
            HttpEngine::new("not a url"),
            Err(EngineError::Transport(_))
        ));
    }
}
