use thiserror::Error;

/// Failures reported by a [`SearchEngine`](crate::engine::SearchEngine) call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("TransportError: {0}")]
    Transport(String),
    #[error("StatusError: {status}: {body}")]
    Status { status: u16, body: String },
    #[error("ParsingError: {0}")]
    Parsing(String),
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Can not find index named `{0}`")]
    UndefinedIndex(String),

    #[error("unknown scope `{scope}` for index `{index}`")]
    UnknownScope { index: String, scope: String },

    #[error("request failed: {0}")]
    RequestFailed(#[from] EngineError),

    #[error("index update for `{0}` requires an update strategy, wrap it with one")]
    UndefinedUpdateStrategy(String),

    #[error("unknown update strategy `{0}`")]
    UnknownStrategy(String),

    #[error("can't pop the root strategy")]
    RootStrategyPop,

    #[error("failed to load objects for `{index}`: {message}")]
    LoadFailed { index: String, message: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn load_failed(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed {
            index: index.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
