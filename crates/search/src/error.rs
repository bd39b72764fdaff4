use thiserror::Error;

/// Errors surfaced by [`CandidateSearch`](crate::CandidateSearch) and the vector stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The query itself is unusable (empty or non-finite embedding, bad override).
    #[error("invalid search input: {0}")]
    Validation(String),
    /// The vector store could not be reached or the query failed to execute.
    #[error("candidate search unavailable: {0}")]
    Unavailable(String),
    /// Store configuration is unusable. Raised when building a store.
    #[error("invalid search config: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for SearchError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(format!("database error: {err}"))
    }
}
