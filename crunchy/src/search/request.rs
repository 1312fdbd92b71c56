//! The chainable request builder.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::loader::{LoadOptions, Loader};
use super::parameters::{parse_order, IndexRef, ParamName, Parameters, Storage};
use super::query::{or_optional, QueryNode};
use super::response::Response;
use super::scroll::Scroll;
use crate::context::Context;
use crate::engine::RenderedRequest;
use crate::error::{Error, Result};
use crate::index::IndexDefinition;

/// A search request over one or more indices.
///
/// Every mutator returns a new request and leaves `self` untouched; parameters
/// that did not change are shared between the two.
#[derive(Debug, Clone)]
pub struct Request {
    context: Context,
    index: Option<Arc<IndexDefinition>>,
    parameters: Parameters,
    load_options: LoadOptions,
}

impl Request {
    pub(crate) fn new(context: Context, index: Option<Arc<IndexDefinition>>) -> Self {
        Self {
            context,
            index,
            parameters: Parameters::new(),
            load_options: LoadOptions::default(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The index this request was started from.
    pub fn index(&self) -> Option<&Arc<IndexDefinition>> {
        self.index.as_ref()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn load_options(&self) -> &LoadOptions {
        &self.load_options
    }

    pub(crate) fn with_parameters(&self, parameters: Parameters) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }

    fn update(&self, name: ParamName, storage: Storage) -> Self {
        self.with_parameters(self.parameters.update(name, storage))
    }

    fn update_query(&self, node: Option<QueryNode>) -> Self {
        self.update(ParamName::Query, Storage::Query(node))
    }

    /// AND a query fragment onto the current query.
    pub fn query(&self, fragment: Value) -> Self {
        self.update_query(QueryNode::from_fragment(fragment))
    }

    /// AND a fragment in non-scoring filter context.
    pub fn filter(&self, fragment: Value) -> Self {
        self.update_query(QueryNode::from_fragment(fragment).map(QueryNode::filter))
    }

    /// AND the negation of a fragment.
    #[allow(clippy::should_implement_trait)]
    pub fn not(&self, fragment: Value) -> Self {
        self.update_query(QueryNode::from_fragment(fragment).map(QueryNode::not))
    }

    /// Replace the whole query.
    pub fn requery(&self, fragment: Value) -> Self {
        self.with_parameters(self.parameters.replace(
            ParamName::Query,
            Storage::Query(QueryNode::from_fragment(fragment)),
        ))
    }

    pub fn aggregations(&self, aggs: Value) -> Self {
        self.update(ParamName::Aggs, hash(aggs))
    }

    pub fn limit(&self, limit: u64) -> Self {
        self.update(ParamName::Limit, Storage::Integer(Some(limit)))
    }

    pub fn offset(&self, offset: u64) -> Self {
        self.update(ParamName::Offset, Storage::Integer(Some(offset)))
    }

    /// Add sort clauses: `"name"`, `{"age": "desc"}` or an array of those.
    pub fn order(&self, order: Value) -> Self {
        self.update(ParamName::Order, Storage::Order(parse_order(order)))
    }

    /// Replace the sort clauses.
    pub fn reorder(&self, order: Value) -> Self {
        self.with_parameters(
            self.parameters
                .replace(ParamName::Order, Storage::Order(parse_order(order))),
        )
    }

    pub fn indices<I, R>(&self, indices: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<IndexRef>,
    {
        let refs = indices.into_iter().map(Into::into).collect();
        self.update(ParamName::Indices, Storage::Indices(refs))
    }

    pub fn highlight(&self, highlight: Value) -> Self {
        self.update(ParamName::Highlight, hash(highlight))
    }

    pub fn suggest(&self, suggest: Value) -> Self {
        self.update(ParamName::Suggest, hash(suggest))
    }

    pub fn script_fields(&self, script_fields: Value) -> Self {
        self.update(ParamName::ScriptFields, hash(script_fields))
    }

    pub fn collapse(&self, collapse: Value) -> Self {
        self.update(ParamName::Collapse, hash(collapse))
    }

    pub fn docvalue_fields<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = fields.into_iter().map(Into::into).collect();
        self.update(ParamName::DocvalueFields, Storage::StringArray(fields))
    }

    /// Match nothing, whatever else is set.
    pub fn none(&self) -> Self {
        self.update(ParamName::None, Storage::Bool(true))
    }

    pub fn profile(&self, profile: bool) -> Self {
        self.update(ParamName::Profile, Storage::Bool(profile))
    }

    /// Engine-side search timeout, e.g. `"1s"`.
    pub fn timeout(&self, timeout: impl Into<String>) -> Self {
        self.update(ParamName::Timeout, Storage::String(Some(timeout.into())))
    }

    pub fn terminate_after(&self, count: u64) -> Self {
        self.update(ParamName::TerminateAfter, Storage::Integer(Some(count)))
    }

    pub fn track_scores(&self, track_scores: bool) -> Self {
        self.update(ParamName::TrackScores, Storage::Bool(track_scores))
    }

    pub fn version(&self, version: bool) -> Self {
        self.update(ParamName::Version, Storage::Bool(version))
    }

    /// Configure how [`Response::objects`] materializes hits. Does not change
    /// the rendered request.
    pub fn load(&self, options: LoadOptions) -> Self {
        Self {
            load_options: self.load_options.merge(&options),
            ..self.clone()
        }
    }

    /// Keep only the named parameters.
    pub fn only(&self, names: &[ParamName]) -> Self {
        self.with_parameters(self.parameters.only(names))
    }

    /// Drop the named parameters.
    pub fn except(&self, names: &[ParamName]) -> Self {
        self.with_parameters(self.parameters.except(names))
    }

    /// Combine with `other` using each parameter's merge policy; `other` wins
    /// on conflicts.
    ///
    /// When the two requests start from different indices, the result searches
    /// both.
    pub fn merge(&self, other: &Request) -> Self {
        let parameters = self.parameters.merge(&other.parameters);
        Self {
            parameters: self.union_indices(other, parameters),
            load_options: self.load_options.merge(&other.load_options),
            ..self.clone()
        }
    }

    /// OR the queries of both requests; other parameters stay as in `self`.
    ///
    /// A side without a query yields the other side's query.
    pub fn or(&self, other: &Request) -> Self {
        let query = or_optional(
            self.parameters.query().cloned(),
            other.parameters.query().cloned(),
        );
        let parameters = self
            .parameters
            .replace(ParamName::Query, Storage::Query(query));
        self.with_parameters(self.union_indices(other, parameters))
    }

    fn union_indices(&self, other: &Request, parameters: Parameters) -> Parameters {
        if self.owning_index_name() == other.owning_index_name() {
            return parameters;
        }
        let mut refs = self.effective_indices();
        refs.extend(other.effective_indices());
        parameters.update(ParamName::Indices, Storage::Indices(refs))
    }

    fn owning_index_name(&self) -> Option<String> {
        self.index.as_ref().map(|index| index.index_name())
    }

    /// Apply the named scope registered on the owning index.
    pub fn scope(&self, name: &str) -> Result<Self> {
        let index = self.index.as_ref().ok_or_else(|| Error::UnknownScope {
            index: String::new(),
            scope: name.to_string(),
        })?;
        let scope = index.scope(name).ok_or_else(|| Error::UnknownScope {
            index: index.derivable_name().to_string(),
            scope: name.to_string(),
        })?;
        Ok(scope(self.clone()))
    }

    /// Explicit indices, else the owning index.
    fn effective_indices(&self) -> Vec<IndexRef> {
        let explicit = self.parameters.indices();
        if !explicit.is_empty() {
            return explicit.to_vec();
        }
        self.index.iter().map(IndexRef::from).collect()
    }

    fn index_names(&self) -> Vec<String> {
        let explicit = self.parameters.index_names();
        if !explicit.is_empty() {
            return explicit;
        }
        self.owning_index_name().into_iter().collect()
    }

    /// Render to the engine wire format.
    pub fn render(&self) -> RenderedRequest {
        RenderedRequest {
            index: self.index_names(),
            body: self.parameters.render_body(),
            q: None,
            scroll: None,
        }
    }

    /// Index definitions hits of this request can come from.
    fn definitions(&self) -> Vec<Arc<IndexDefinition>> {
        let registry = self.context.registry();
        let mut definitions: Vec<Arc<IndexDefinition>> = Vec::new();
        let candidates = self
            .index
            .iter()
            .cloned()
            .chain(self.parameters.indices().iter().filter_map(|index| match index {
                IndexRef::Definition(definition) => Some(definition.clone()),
                IndexRef::Name(name) => registry.find_by_index_name(name),
            }));
        for definition in candidates {
            if !definitions
                .iter()
                .any(|known| known.index_name() == definition.index_name())
            {
                definitions.push(definition);
            }
        }
        definitions
    }

    pub(crate) fn loader(&self) -> Loader {
        Loader::new(self.definitions(), self.load_options.clone())
    }

    async fn execute(&self, rendered: &RenderedRequest) -> Result<Value> {
        debug!(index = ?rendered.index, "Searching");
        let engine = self.context.engine();
        let reply = self.context.call(engine.search(rendered)).await?;
        Ok(reply)
    }

    /// Run the request.
    ///
    /// A request marked [`none`](Self::none) returns an empty response without
    /// calling the engine.
    pub async fn response(&self) -> Result<Response> {
        if self.parameters.is_none() {
            debug!("Skipping search for a match-none request");
            return Ok(Response::empty(Some(self.pagination())));
        }

        let body = self.execute(&self.render()).await?;
        Ok(Response::new(body, self.loader(), Some(self.pagination())))
    }

    /// Number of documents matching the request.
    pub async fn count(&self) -> Result<u64> {
        if self.parameters.is_none() {
            return Ok(0);
        }

        let rendered = self
            .except(&[ParamName::Offset, ParamName::Order])
            .with_parameters_replaced(ParamName::Limit, Storage::Integer(Some(0)))
            .render();
        let body = self.execute(&rendered).await?;
        Ok(Response::new(body, Loader::default(), None).total())
    }

    fn with_parameters_replaced(&self, name: ParamName, storage: Storage) -> Self {
        self.with_parameters(self.parameters.replace(name, storage))
    }

    /// URI search with a query-string expression, e.g. `"name:Moscow"`,
    /// against this request's indices.
    pub async fn search_string(&self, q: &str) -> Result<Response> {
        let rendered = RenderedRequest {
            index: self.index_names(),
            body: Map::new(),
            q: Some(q.to_string()),
            scroll: None,
        };
        let body = self.execute(&rendered).await?;
        Ok(Response::new(body, self.loader(), None))
    }

    /// Iterate all matches in batches through a scroll cursor.
    ///
    /// `None` picks the configured batch size and keep-alive.
    pub fn scroll_batches(&self, batch_size: Option<u64>, keep_alive: Option<&str>) -> Scroll {
        let settings = self.context.settings();
        let batch_size = batch_size.unwrap_or(settings.scroll_batch_size);
        let keep_alive = keep_alive.unwrap_or(&settings.scroll_keep_alive).to_string();

        let mut request = self
            .except(&[ParamName::Offset])
            .with_parameters_replaced(ParamName::Limit, Storage::Integer(Some(batch_size)));
        if request.parameters.get(ParamName::Order).is_none() {
            request = request.order(Value::from("_doc"));
        }

        let mut rendered = request.render();
        rendered.scroll = Some(keep_alive.clone());
        Scroll::new(self.context.clone(), rendered, self.loader(), keep_alive)
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.owning_index_name() == other.owning_index_name() && self.render() == other.render()
    }
}

fn hash(fragment: Value) -> Storage {
    match fragment {
        Value::Object(map) => Storage::Hash(map),
        _ => Storage::Hash(Map::new()),
    }
}
