//! Update strategies: when and how changed records reach their index.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Writes the current state of records to an index.
#[async_trait]
pub trait Importer: Send + Sync {
    async fn import(&self, index: &str, ids: &[String]) -> Result<()>;
}

/// Policy applied whenever records of an index change.
#[async_trait]
pub trait UpdateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called with the ids of changed records of `index`.
    async fn update(&mut self, index: &str, ids: &[String]) -> Result<()>;

    /// Called when the strategy is popped off the stack.
    async fn leave(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Refuses every update, forcing callers to pick a strategy explicitly.
#[derive(Debug, Default)]
pub struct Base;

#[async_trait]
impl UpdateStrategy for Base {
    fn name(&self) -> &'static str {
        "base"
    }

    async fn update(&mut self, index: &str, _ids: &[String]) -> Result<()> {
        Err(Error::UndefinedUpdateStrategy(index.to_string()))
    }
}

/// Ignores updates.
#[derive(Debug, Default)]
pub struct Bypass;

#[async_trait]
impl UpdateStrategy for Bypass {
    fn name(&self) -> &'static str {
        "bypass"
    }

    async fn update(&mut self, _index: &str, _ids: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Imports every update right away.
pub struct Urgent {
    importer: Arc<dyn Importer>,
}

impl Urgent {
    pub fn new(importer: Arc<dyn Importer>) -> Self {
        Self { importer }
    }
}

#[async_trait]
impl UpdateStrategy for Urgent {
    fn name(&self) -> &'static str {
        "urgent"
    }

    async fn update(&mut self, index: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.importer.import(index, ids).await
    }
}

/// Collects ids per index and imports each index once, on leave.
pub struct Atomic {
    importer: Arc<dyn Importer>,
    stash: BTreeMap<String, Vec<String>>,
}

impl Atomic {
    pub fn new(importer: Arc<dyn Importer>) -> Self {
        Self {
            importer,
            stash: BTreeMap::new(),
        }
    }
}

#[async_trait]
impl UpdateStrategy for Atomic {
    fn name(&self) -> &'static str {
        "atomic"
    }

    async fn update(&mut self, index: &str, ids: &[String]) -> Result<()> {
        let stashed = self.stash.entry(index.to_string()).or_default();
        for id in ids {
            if !stashed.contains(id) {
                stashed.push(id.clone());
            }
        }
        Ok(())
    }

    async fn leave(&mut self) -> Result<()> {
        for (index, ids) in std::mem::take(&mut self.stash) {
            if !ids.is_empty() {
                self.importer.import(&index, &ids).await?;
            }
        }
        Ok(())
    }
}

/// Strategies in effect for one task. The root strategy stays at the bottom
/// for the stack's whole life.
pub struct StrategyStack {
    importer: Arc<dyn Importer>,
    root: Box<dyn UpdateStrategy>,
    pushed: Vec<Box<dyn UpdateStrategy>>,
}

impl StrategyStack {
    pub fn new(root: &str, importer: Arc<dyn Importer>) -> Result<Self> {
        let root = resolve(root, &importer)?;
        Ok(Self {
            importer,
            root,
            pushed: Vec::new(),
        })
    }

    pub fn from_settings(settings: &Settings, importer: Arc<dyn Importer>) -> Result<Self> {
        Self::new(&settings.root_strategy, importer)
    }

    pub fn current(&self) -> &dyn UpdateStrategy {
        self.pushed.last().unwrap_or(&self.root).as_ref()
    }

    fn current_mut(&mut self) -> &mut dyn UpdateStrategy {
        self.pushed.last_mut().unwrap_or(&mut self.root).as_mut()
    }

    pub fn depth(&self) -> usize {
        self.pushed.len() + 1
    }

    pub fn push(&mut self, name: &str) -> Result<()> {
        let strategy = resolve(name, &self.importer)?;
        self.pushed.push(strategy);
        debug!(depth = self.pushed.len(), strategy = name, "Pushed update strategy");
        Ok(())
    }

    /// Pop the top strategy, letting it flush whatever it collected.
    pub async fn pop(&mut self) -> Result<Box<dyn UpdateStrategy>> {
        let mut strategy = self.pushed.pop().ok_or(Error::RootStrategyPop)?;
        strategy.leave().await?;
        debug!(
            depth = self.pushed.len(),
            popped = strategy.name(),
            current = self.current().name(),
            "Popped update strategy"
        );
        Ok(strategy)
    }

    /// Hand changed ids to the current strategy.
    pub async fn update(&mut self, index: &str, ids: &[String]) -> Result<()> {
        self.current_mut().update(index, ids).await
    }

    /// Run `f` with `name` pushed, popping it afterwards even when `f` fails.
    pub async fn wrap<T, F>(&mut self, name: &str, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut StrategyStack) -> BoxFuture<'a, Result<T>>,
    {
        self.push(name)?;
        let result = f(self).await;
        let popped = self.pop().await;
        let value = result?;
        popped?;
        Ok(value)
    }
}

fn resolve(name: &str, importer: &Arc<dyn Importer>) -> Result<Box<dyn UpdateStrategy>> {
    match name {
        "base" => Ok(Box::new(Base)),
        "bypass" => Ok(Box::new(Bypass)),
        "urgent" => Ok(Box::new(Urgent::new(importer.clone()))),
        "atomic" => Ok(Box::new(Atomic::new(importer.clone()))),
        other => Err(Error::UnknownStrategy(other.to_string())),
    }
}
