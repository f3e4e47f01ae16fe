//! Convergence error types

use crate::outcome::FailureDetail;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a Status Query implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Network or HTTP failure; the poller does not retry it
    #[error("transient query failure: {0}")]
    Transient(String),

    /// The remote system no longer resolves the handle
    #[error("handle not found: {0}")]
    NotFound(String),
}

/// Convergence errors
#[derive(Error, Debug)]
pub enum ConvergeError {
    #[error("Invalid classification table {table}: {reason}")]
    InvalidTable { table: &'static str, reason: String },

    #[error("Unrecognized state {state:?} for {table} (missing from the classification table)")]
    UnrecognizedState { table: &'static str, state: String },

    #[error("State {state:?} matches more than one class in {table}")]
    AmbiguousState { table: &'static str, state: String },

    #[error("Status query for {handle} failed: {message}")]
    Transient { handle: String, message: String },

    #[error("Operation {handle} not found: {message}")]
    HandleNotFound { handle: String, message: String },

    #[error("{0}")]
    OperationFailed(FailureDetail),

    #[error("Timeout: operation {handle} did not converge within {}s", .timeout.as_secs())]
    TimedOut { handle: String, timeout: Duration },

    #[error("Aborted: stopped waiting for operation {handle}")]
    Aborted { handle: String },

    #[error("Unknown operation kind: {0}")]
    UnknownKind(String),
}

impl ConvergeError {
    /// True for errors where re-running the whole poll may help
    pub fn is_transient(&self) -> bool {
        matches!(self, ConvergeError::Transient { .. } | ConvergeError::TimedOut { .. })
    }

    /// True for configuration defects that no retry will fix
    pub fn is_config_defect(&self) -> bool {
        matches!(
            self,
            ConvergeError::InvalidTable { .. }
                | ConvergeError::UnrecognizedState { .. }
                | ConvergeError::AmbiguousState { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ConvergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_is_a_caller_error() {
        let err = ConvergeError::UnknownKind("vm-migration".to_string());
        assert_eq!(err.to_string(), "Unknown operation kind: vm-migration");
        assert!(!err.is_config_defect());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_table_defects_are_config_defects() {
        let err = ConvergeError::UnrecognizedState {
            table: "ndb-operation",
            state: "6".to_string(),
        };
        assert!(err.is_config_defect());
    }
}
