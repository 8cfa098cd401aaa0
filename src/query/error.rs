use std::fmt;

use crate::api::ApiError;

/// Error type for cache reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The fetcher failed.
    Api(ApiError),
    /// The fetch was superseded, cancelled, or abandoned by its issuer.
    /// Its result, if any, was not committed.
    Cancelled,
    /// Cache activity is stopped until the session is re-authenticated.
    Suspended,
}

impl QueryError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, QueryError::Api(err) if err.is_unauthorized())
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Api(err) => write!(f, "fetch failed: {}", err),
            QueryError::Cancelled => write!(f, "fetch cancelled"),
            QueryError::Suspended => write!(f, "cache suspended until re-authentication"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for QueryError {
    fn from(err: ApiError) -> Self {
        QueryError::Api(err)
    }
}
