use std::fmt;

/// Failure reported by the remote catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failure or a non-2xx response unrelated to auth.
    Network(String),
    /// The server rejected the payload.
    Validation(String),
    /// The stored credential was rejected.
    Unauthorized(String),
    /// The server rejected the write against stale data.
    Conflict(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Map an HTTP-style status code to an error kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ApiError::Unauthorized(message),
            400 | 422 => ApiError::Validation(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Network(message),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "network error: {}", msg),
            ApiError::Validation(msg) => write!(f, "rejected by server: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            ApiError::Conflict(msg) => write!(f, "conflict: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
