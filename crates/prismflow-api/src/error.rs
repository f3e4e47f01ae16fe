//! API client error types

use prismflow_converge::{ConvergeError, QueryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Control plane returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("{kind} not found on {owner}: {name}")]
    NotResolved {
        kind: &'static str,
        owner: String,
        name: String,
    },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Converge(#[from] ConvergeError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound(_) | ApiError::Converge(ConvergeError::HandleNotFound { .. })
        )
    }
}

impl From<ApiError> for QueryError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(message) => QueryError::NotFound(message),
            other => QueryError::Transient(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_stays_not_found() {
        let err: QueryError = ApiError::NotFound("runlog rl-1".to_string()).into();
        assert_eq!(err, QueryError::NotFound("runlog rl-1".to_string()));
    }

    #[test]
    fn test_other_errors_are_transient() {
        let err: QueryError = ApiError::Status {
            status: 503,
            message: "service unavailable".to_string(),
        }
        .into();
        assert_eq!(
            err,
            QueryError::Transient(
                "Control plane returned HTTP 503: service unavailable".to_string()
            )
        );
    }
}
