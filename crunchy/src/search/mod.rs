mod loader;
mod pagination;
pub mod parameters;
mod query;
mod request;
mod response;
mod scroll;
mod wrapper;

pub use loader::{LoadOptions, Loader, Object, ObjectSource, SourceObject};
pub use pagination::{Page, Pagination};
pub use parameters::{IndexRef, ParamName, SortClause};
pub use query::QueryNode;
pub use request::Request;
pub use response::Response;
pub use scroll::Scroll;
pub use wrapper::Wrapper;
