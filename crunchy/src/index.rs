//! Index definitions and name derivation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::search::{ObjectSource, Request};

/// A named request transformation registered on an index, e.g. `"active"`.
pub type ScopeFn = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// Describes one index: its name, how hits are materialized and which named
/// scopes it offers.
pub struct IndexDefinition {
    base_name: String,
    prefix: Option<String>,
    derivable_name: String,
    source: Option<Arc<dyn ObjectSource>>,
    scopes: HashMap<String, ScopeFn>,
}

impl IndexDefinition {
    /// Start a definition from a derivable identifier such as `"users"` or
    /// `"namespace/users"`. The base name is the last path segment.
    pub fn builder(identifier: impl Into<String>) -> IndexDefinitionBuilder {
        IndexDefinitionBuilder::new(identifier.into())
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Namespaced identifier used to reference the index, e.g. `"namespace/users"`.
    pub fn derivable_name(&self) -> &str {
        &self.derivable_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Full index name: prefix, base name and suffix joined by `_`, blanks skipped.
    pub fn index_name(&self) -> String {
        self.index_name_with(None, None)
    }

    /// Like [`index_name`](Self::index_name) with an overriding prefix
    /// and/or a suffix, e.g. for timestamped physical indices behind an alias.
    pub fn index_name_with(&self, prefix: Option<&str>, suffix: Option<&str>) -> String {
        [prefix.or(self.prefix()), Some(self.base_name.as_str()), suffix]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn source(&self) -> Option<&Arc<dyn ObjectSource>> {
        self.source.as_ref()
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeFn> {
        self.scopes.get(name)
    }

    pub fn scope_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scopes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("index_name", &self.index_name())
            .field("derivable_name", &self.derivable_name)
            .field("has_source", &self.source.is_some())
            .field("scopes", &self.scope_names())
            .finish()
    }
}

pub struct IndexDefinitionBuilder {
    derivable_name: String,
    base_name: Option<String>,
    prefix: Option<String>,
    source: Option<Arc<dyn ObjectSource>>,
    scopes: HashMap<String, ScopeFn>,
}

impl IndexDefinitionBuilder {
    fn new(derivable_name: String) -> Self {
        Self {
            derivable_name,
            base_name: None,
            prefix: None,
            source: None,
            scopes: HashMap::new(),
        }
    }

    /// Override the base name derived from the identifier.
    pub fn index_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = Some(base_name.into());
        self
    }

    /// Set the prefix. An empty prefix opts out of the configured one.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Use `prefix` unless one was set explicitly.
    pub fn default_prefix(mut self, prefix: Option<&str>) -> Self {
        if self.prefix.is_none() {
            self.prefix = prefix.map(str::to_string);
        }
        self
    }

    /// Source used to materialize hits of this index into objects.
    pub fn source(mut self, source: Arc<dyn ObjectSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Register a named scope.
    pub fn scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        self.scopes.insert(name.into(), Arc::new(scope));
        self
    }

    pub fn build(self) -> Result<Arc<IndexDefinition>> {
        let derivable_name = self.derivable_name.trim().trim_matches('/').to_string();
        let base_name = self
            .base_name
            .or_else(|| derivable_name.rsplit('/').next().map(str::to_string))
            .unwrap_or_default();

        if base_name.trim().is_empty() {
            return Err(Error::UndefinedIndex(self.derivable_name));
        }

        Ok(Arc::new(IndexDefinition {
            base_name,
            prefix: self.prefix,
            derivable_name,
            source: self.source,
            scopes: self.scopes,
        }))
    }
}

/// Registered index definitions, keyed by derivable name.
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    definitions: BTreeMap<String, Arc<IndexDefinition>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: Arc<IndexDefinition>) {
        self.definitions
            .insert(definition.derivable_name().to_string(), definition);
    }

    /// Resolve an identifier to a registered definition.
    ///
    /// Accepts `"developers"`, `"developers_index"` and namespaced
    /// identifiers like `"namespace/autocomplete"`.
    pub fn derive(&self, identifier: &str) -> Result<Arc<IndexDefinition>> {
        let normalized = identifier.trim().trim_matches('/');
        let normalized = normalized.strip_suffix("_index").unwrap_or(normalized);

        self.definitions
            .get(normalized)
            .cloned()
            .ok_or_else(|| Error::UndefinedIndex(identifier.to_string()))
    }

    /// Find a definition by its full index name.
    pub fn find_by_index_name(&self, index_name: &str) -> Option<Arc<IndexDefinition>> {
        self.definitions
            .values()
            .find(|definition| definition.index_name() == index_name)
            .cloned()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<IndexDefinition>> {
        self.definitions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> IndexRegistry {
        let mut registry = IndexRegistry::new();
        registry.register(IndexDefinition::builder("developers").build().unwrap());
        registry.register(IndexDefinition::builder("namespace/autocomplete").build().unwrap());
        registry
    }

    #[test]
    fn derive_accepts_known_spellings() {
        let registry = registry();
        assert_eq!(registry.derive("developers").unwrap().base_name(), "developers");
        assert_eq!(registry.derive("developers_index").unwrap().base_name(), "developers");
        assert_eq!(
            registry.derive("namespace/autocomplete").unwrap().base_name(),
            "autocomplete"
        );
    }

    #[test]
    fn derive_fails_for_unknown_names() {
        let err = registry().derive("borogoves").unwrap_err();
        assert!(matches!(err, Error::UndefinedIndex(_)));
        assert!(err.to_string().contains("borogoves"));
    }

    #[test]
    fn index_name_joins_prefix_and_suffix() {
        let users = IndexDefinition::builder("users").prefix("test").build().unwrap();
        assert_eq!(users.index_name(), "test_users");
        assert_eq!(users.index_name_with(Some("foobar"), None), "foobar_users");
        assert_eq!(users.index_name_with(None, Some("2017")), "test_users_2017");
        assert_eq!(users.index_name_with(Some(""), Some("2017")), "users_2017");
    }

    #[test]
    fn base_name_can_be_overridden() {
        let users = IndexDefinition::builder("users")
            .index_name("legacy_users")
            .build()
            .unwrap();
        assert_eq!(users.index_name(), "legacy_users");
        assert_eq!(users.derivable_name(), "users");
    }

    #[test]
    fn blank_name_is_undefined() {
        assert!(matches!(
            IndexDefinition::builder("  ").build(),
            Err(Error::UndefinedIndex(_))
        ));
    }

    #[test]
    fn explicit_prefix_wins_over_default() {
        let users = IndexDefinition::builder("users")
            .prefix("")
            .default_prefix(Some("test"))
            .build()
            .unwrap();
        assert_eq!(users.index_name(), "users");

        let cities = IndexDefinition::builder("cities")
            .default_prefix(Some("test"))
            .build()
            .unwrap();
        assert_eq!(cities.index_name(), "test_cities");
    }

    #[test]
    fn find_by_index_name_uses_the_full_name() {
        let mut registry = IndexRegistry::new();
        registry.register(IndexDefinition::builder("cities").prefix("test").build().unwrap());
        assert!(registry.find_by_index_name("test_cities").is_some());
        assert!(registry.find_by_index_name("cities").is_none());
    }
}
