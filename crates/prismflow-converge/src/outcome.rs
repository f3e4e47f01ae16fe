//! Terminal results of a poll loop

use crate::error::{ConvergeError, Result};
use crate::handle::OperationHandle;
use serde::Serialize;
use std::time::Duration;

/// Why an operation was classified as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The remote system reported a failure literal
    Reported,
    /// The handle stopped resolving while the poll was running
    HandleVanished,
}

/// Structured detail of a failed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    /// Handle of the failed operation
    pub handle: OperationHandle,

    /// Classification table that judged the state
    pub table: &'static str,

    /// Literal state reported by the remote system, if any
    pub raw_state: Option<String>,

    /// Human-readable reason from the remote system
    pub error_detail: Option<String>,

    /// Entity the operation acted on (application uuid, database id)
    pub subject: Option<String>,

    pub reason: FailureReason,
}

impl FailureDetail {
    pub fn vanished(handle: OperationHandle, table: &'static str) -> Self {
        Self {
            handle,
            table,
            raw_state: None,
            error_detail: Some("invalid handle".to_string()),
            subject: None,
            reason: FailureReason::HandleVanished,
        }
    }
}

impl std::fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation {} ({}) failed", self.handle, self.table)?;
        if let Some(subject) = &self.subject {
            write!(f, " for {}", subject)?;
        }
        if let Some(state) = &self.raw_state {
            write!(f, " with state {}", state)?;
        }
        if let Some(detail) = &self.error_detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// Detail of a poll that stopped waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeoutDetail {
    pub handle: OperationHandle,
    pub timeout: Duration,
    pub elapsed: Duration,
    pub attempts: u32,

    /// Last state observed before giving up
    pub last_state: Option<String>,
}

/// Detail of a poll cancelled by its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortDetail {
    pub handle: OperationHandle,
    pub attempts: u32,
    pub last_state: Option<String>,
}

/// Terminal result of one poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The remote system reported success; carries the final payload
    Success(T),
    /// The remote system reported failure
    Failure(FailureDetail),
    /// The poller stopped waiting; the remote outcome is unknown
    TimedOut(TimeoutDetail),
    /// The caller cancelled the poll
    Aborted(AbortDetail),
}

impl<T> PollOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success(_))
    }

    /// Short class name for logs and CLI output
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Success(_) => "succeeded",
            PollOutcome::Failure(_) => "failed",
            PollOutcome::TimedOut(_) => "timed out",
            PollOutcome::Aborted(_) => "aborted",
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            PollOutcome::Success(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PollOutcome<U> {
        match self {
            PollOutcome::Success(payload) => PollOutcome::Success(f(payload)),
            PollOutcome::Failure(detail) => PollOutcome::Failure(detail),
            PollOutcome::TimedOut(detail) => PollOutcome::TimedOut(detail),
            PollOutcome::Aborted(detail) => PollOutcome::Aborted(detail),
        }
    }

    /// Convert into a `Result`, keeping each non-success class distinct
    pub fn into_result(self) -> Result<T> {
        match self {
            PollOutcome::Success(payload) => Ok(payload),
            PollOutcome::Failure(detail) => Err(ConvergeError::OperationFailed(detail)),
            PollOutcome::TimedOut(detail) => Err(ConvergeError::TimedOut {
                handle: detail.handle.into_inner(),
                timeout: detail.timeout,
            }),
            PollOutcome::Aborted(detail) => Err(ConvergeError::Aborted {
                handle: detail.handle.into_inner(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> FailureDetail {
        FailureDetail {
            handle: OperationHandle::from("op-1"),
            table: "ndb-operation",
            raw_state: Some("4".to_string()),
            error_detail: Some("disk full".to_string()),
            subject: Some("db-42".to_string()),
            reason: FailureReason::Reported,
        }
    }

    #[test]
    fn test_failure_display_carries_state_and_detail() {
        assert_eq!(
            failure().to_string(),
            "Operation op-1 (ndb-operation) failed for db-42 with state 4: disk full"
        );
    }

    #[test]
    fn test_into_result_keeps_classes_apart() {
        let failed: PollOutcome<()> = PollOutcome::Failure(failure());
        assert!(matches!(
            failed.into_result(),
            Err(ConvergeError::OperationFailed(ref d)) if d.error_detail.as_deref() == Some("disk full")
        ));

        let timed_out: PollOutcome<()> = PollOutcome::TimedOut(TimeoutDetail {
            handle: OperationHandle::from("op-1"),
            timeout: Duration::from_secs(30),
            elapsed: Duration::from_secs(31),
            attempts: 7,
            last_state: Some("1".to_string()),
        });
        let err = timed_out.into_result().unwrap_err();
        assert!(matches!(err, ConvergeError::TimedOut { .. }));
        assert!(err.is_transient());

        let aborted: PollOutcome<()> = PollOutcome::Aborted(AbortDetail {
            handle: OperationHandle::from("op-1"),
            attempts: 2,
            last_state: None,
        });
        assert!(matches!(
            aborted.into_result(),
            Err(ConvergeError::Aborted { .. })
        ));
    }

    #[test]
    fn test_vanished_handle_is_marked() {
        let detail = FailureDetail::vanished(OperationHandle::from("rl-9"), "app-runlog");
        assert_eq!(detail.reason, FailureReason::HandleVanished);
        assert_eq!(detail.to_string(), "Operation rl-9 (app-runlog) failed: invalid handle");
    }
}
