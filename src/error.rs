use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("State tree exceeded the node budget of {limit} nodes")]
    NodeBudgetExceeded { limit: usize },

    #[error("Price source error: {0}")]
    PriceSource(String),

    #[error("Could not understand request: {0}")]
    Query(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Date error: {0}")]
    Date(#[from] chrono::ParseError),
}

pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SearchError::InvalidInput(msg.into())
    }
}
