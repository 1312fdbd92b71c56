//! Composes search requests against an Elasticsearch-compatible engine,
//! decodes replies and materializes hits back into source objects.

mod config;
mod context;
pub mod engine;
mod error;
pub mod index;
pub mod search;
pub mod strategy;

pub use crate::config::{read_config, Settings};
pub use context::Context;
pub use engine::{HttpEngine, RenderedRequest, SearchEngine};
pub use error::{EngineError, Error, Result};
pub use index::{IndexDefinition, IndexRegistry};
pub use search::{LoadOptions, ObjectSource, Request, Response, Scroll, SourceObject, Wrapper};
