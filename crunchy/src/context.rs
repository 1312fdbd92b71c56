use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, warn};

use crate::config::Settings;
use crate::engine::{HttpEngine, SearchEngine};
use crate::error::{EngineError, Result};
use crate::index::{IndexDefinition, IndexDefinitionBuilder, IndexRegistry};
use crate::search::{IndexRef, Request};

/// Everything a request needs to execute: the engine client, the registered
/// indices and the settings. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    engine: Arc<dyn SearchEngine>,
    registry: RwLock<IndexRegistry>,
    settings: Settings,
}

impl Context {
    pub fn new(engine: Arc<dyn SearchEngine>, settings: Settings) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                engine,
                registry: RwLock::new(IndexRegistry::new()),
                settings,
            }),
        }
    }

    /// Build a context talking to the engine at `settings.url` over HTTP.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let engine = HttpEngine::from_settings(&settings)?;
        Ok(Self::new(Arc::new(engine), settings))
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.inner.engine
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Register an index, applying the configured prefix unless the builder
    /// set its own.
    pub fn define(&self, builder: IndexDefinitionBuilder) -> Result<Arc<IndexDefinition>> {
        let definition = builder.default_prefix(self.settings().prefix()).build()?;
        debug!(
            index = %definition.index_name(),
            name = definition.derivable_name(),
            "Registered index"
        );
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(definition.clone());
        Ok(definition)
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, IndexRegistry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a registered index, see [`IndexRegistry::derive`].
    pub fn index(&self, name: &str) -> Result<Arc<IndexDefinition>> {
        self.registry().derive(name)
    }

    /// Start a request over every document of the named index.
    pub fn all(&self, name: &str) -> Result<Request> {
        Ok(Request::new(self.clone(), Some(self.index(name)?)))
    }

    /// Start a request with no owning index, over raw index names.
    pub fn search<I, R>(&self, indices: I) -> Request
    where
        I: IntoIterator<Item = R>,
        R: Into<IndexRef>,
    {
        Request::new(self.clone(), None).indices(indices)
    }

    /// Run an engine call, bounded by `request_timeout` when one is configured.
    pub(crate) async fn call<T, F>(&self, call: F) -> std::result::Result<T, EngineError>
    where
        F: Future<Output = std::result::Result<T, EngineError>>,
    {
        match self.settings().request_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?limit, "Engine call timed out");
                    Err(EngineError::Timeout(limit))
                }
            },
            None => call.await,
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.inner.settings)
            .field("registry", &*self.registry())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockSearchEngine;
    use crate::error::Error;
    use std::time::Duration;

    fn context(settings: Settings) -> Context {
        Context::new(Arc::new(MockSearchEngine::new()), settings)
    }

    #[test]
    fn define_applies_the_configured_prefix() {
        let ctx = context(Settings {
            prefix: Some("test".to_string()),
            ..Settings::default()
        });
        let cities = ctx.define(IndexDefinition::builder("cities")).unwrap();
        let users = ctx
            .define(IndexDefinition::builder("users").prefix("other"))
            .unwrap();

        assert_eq!(cities.index_name(), "test_cities");
        assert_eq!(users.index_name(), "other_users");
        assert!(ctx.registry().find_by_index_name("test_cities").is_some());
    }

    #[test]
    fn all_requires_a_registered_index() {
        let ctx = context(Settings::default());
        ctx.define(IndexDefinition::builder("cities")).unwrap();

        assert!(ctx.all("cities").is_ok());
        assert!(ctx.all("cities_index").is_ok());
        assert!(matches!(ctx.all("borogoves"), Err(Error::UndefinedIndex(_))));
    }

    #[tokio::test]
    async fn call_times_out_with_a_configured_limit() {
        let ctx = context(Settings {
            request_timeout: Some(Duration::from_millis(10)),
            ..Settings::default()
        });
        let result: std::result::Result<(), EngineError> = ctx
            .call(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(EngineError::Timeout(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn call_without_a_limit_passes_through() {
        let ctx = context(Settings::default());
        let result = ctx.call(async { Ok::<_, EngineError>(42) }).await;
        assert_eq!(result, Ok(42));
    }
}
