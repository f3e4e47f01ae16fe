//! Convergence poller
//!
//! One poll loop drives one in-flight operation:
//!
//! ```text
//! Starting ─► Polling ──► Converged(Success | Failure)
//!               │  ▲
//!      pending  │  │ delay
//!               ▼  │
//!             Sleeping ──► TimedOut | Aborted
//! ```
//!
//! Status queries are strictly sequential and spaced by at least the
//! configured delay. The timeout is measured from the first query and also
//! bounds each individual query, so a hung status call still ends in
//! `TimedOut`. The first query is issued and answered even when the timeout
//! is zero.

use crate::classify::{ClassificationTable, StateClass};
use crate::error::{ConvergeError, QueryError, Result};
use crate::handle::OperationHandle;
use crate::outcome::{AbortDetail, FailureDetail, FailureReason, PollOutcome, TimeoutDetail};
use crate::query::StatusQuery;
use crate::settings::{NotFoundPolicy, PollSettings};
use crate::tables::OperationKind;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Generic poll loop parameterized by a table and settings
#[derive(Debug, Clone)]
pub struct Poller {
    table: ClassificationTable,
    settings: PollSettings,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(table: ClassificationTable, settings: PollSettings) -> Self {
        Self {
            table,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Poller using the shipped table and default settings of `kind`
    pub fn for_kind(kind: OperationKind) -> Self {
        Self::new(kind.table(), kind.default_settings())
    }

    pub fn with_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Stop the loop with `Aborted` once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Poll `handle` until it converges, times out or is cancelled
    ///
    /// Errors are reserved for conditions that are not an outcome of the
    /// remote operation: an invalid table, an unrecognized state, a
    /// transient query failure, or a vanished handle under
    /// [`NotFoundPolicy::Propagate`].
    pub async fn run<Q>(&self, query: &Q, handle: OperationHandle) -> Result<PollOutcome<Q::Payload>>
    where
        Q: StatusQuery + ?Sized,
    {
        self.table.validate()?;

        let PollSettings {
            delay,
            timeout,
            not_found,
        } = self.settings;
        let table = self.table.name;
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_state: Option<String> = None;

        debug!(
            "Polling {} ({}) every {:?}, timeout {:?}",
            handle, table, delay, timeout
        );

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.aborted(handle, attempts, last_state));
            }

            // The first query is always issued, even with a zero timeout
            let remaining = timeout.saturating_sub(started.elapsed());
            if attempts > 0 && remaining.is_zero() {
                return Ok(self.timed_out(handle, started, attempts, last_state));
            }

            // With no budget left the first query is bounded by the client alone
            let bound = if remaining.is_zero() {
                std::time::Duration::MAX
            } else {
                remaining
            };

            attempts += 1;
            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Ok(self.aborted(handle, attempts, last_state));
                }
                response = tokio::time::timeout(bound, query.query(&handle)) => response,
            };

            let snapshot = match response {
                Err(_) => return Ok(self.timed_out(handle, started, attempts, last_state)),
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(QueryError::Transient(message))) => {
                    return Err(ConvergeError::Transient {
                        handle: handle.into_inner(),
                        message,
                    });
                }
                Ok(Err(QueryError::NotFound(message))) => match not_found {
                    NotFoundPolicy::Propagate => {
                        return Err(ConvergeError::HandleNotFound {
                            handle: handle.into_inner(),
                            message,
                        });
                    }
                    NotFoundPolicy::Failure => {
                        warn!(
                            "Operation {} ({}) no longer resolves, treating as failed: {}",
                            handle, table, message
                        );
                        return Ok(PollOutcome::Failure(FailureDetail::vanished(handle, table)));
                    }
                },
            };

            match self.table.classify(&snapshot.raw_state)? {
                StateClass::Success => {
                    info!(
                        "Operation {} ({}) converged to {} after {} queries",
                        handle, table, snapshot.raw_state, attempts
                    );
                    return Ok(PollOutcome::Success(snapshot.payload));
                }
                StateClass::Failure => {
                    info!(
                        "Operation {} ({}) failed with state {}",
                        handle, table, snapshot.raw_state
                    );
                    return Ok(PollOutcome::Failure(FailureDetail {
                        handle,
                        table,
                        raw_state: Some(snapshot.raw_state),
                        error_detail: snapshot.error_detail,
                        subject: snapshot.subject,
                        reason: FailureReason::Reported,
                    }));
                }
                StateClass::Pending => {
                    debug!(
                        "Operation {} ({}) still {} (attempt {})",
                        handle, table, snapshot.raw_state, attempts
                    );
                    last_state = Some(snapshot.raw_state);
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Ok(self.aborted(handle, attempts, last_state));
                }
                _ = tokio::time::sleep(delay) => {}
            }

            if started.elapsed() >= timeout {
                return Ok(self.timed_out(handle, started, attempts, last_state));
            }
        }
    }

    fn timed_out<T>(
        &self,
        handle: OperationHandle,
        started: Instant,
        attempts: u32,
        last_state: Option<String>,
    ) -> PollOutcome<T> {
        let elapsed = started.elapsed();
        warn!(
            "Operation {} ({}) did not converge within {:?} (last state: {})",
            handle,
            self.table.name,
            self.settings.timeout,
            last_state.as_deref().unwrap_or("none")
        );
        PollOutcome::TimedOut(TimeoutDetail {
            handle,
            timeout: self.settings.timeout,
            elapsed,
            attempts,
            last_state,
        })
    }

    fn aborted<T>(
        &self,
        handle: OperationHandle,
        attempts: u32,
        last_state: Option<String>,
    ) -> PollOutcome<T> {
        debug!("Polling of {} ({}) cancelled", handle, self.table.name);
        PollOutcome::Aborted(AbortDetail {
            handle,
            attempts,
            last_state,
        })
    }
}

/// Poll `handle` once to convergence
pub async fn poll<Q>(
    query: &Q,
    handle: OperationHandle,
    table: ClassificationTable,
    settings: PollSettings,
    cancel: CancellationToken,
) -> Result<PollOutcome<Q::Payload>>
where
    Q: StatusQuery + ?Sized,
{
    Poller::new(table, settings)
        .with_cancellation(cancel)
        .run(query, handle)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::StatusSnapshot;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixed(&'static str);

    #[async_trait]
    impl StatusQuery for Fixed {
        type Payload = ();

        async fn query(
            &self,
            _handle: &OperationHandle,
        ) -> std::result::Result<StatusSnapshot<()>, QueryError> {
            Ok(StatusSnapshot::new(self.0, ()))
        }
    }

    fn settings() -> PollSettings {
        PollSettings::new(Duration::from_secs(1), Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_table_fails_before_querying() {
        let table = ClassificationTable::new("broken", &["RUNNING"], &["RUNNING"], &[]);
        let err = Poller::new(table, settings())
            .run(&Fixed("RUNNING"), "op".into())
            .await
            .unwrap_err();
        assert!(err.is_config_defect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_state_is_not_retried() {
        let started = Instant::now();
        let err = Poller::for_kind(OperationKind::PrismTask)
            .run(&Fixed("running"), "task-1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergeError::UnrecognizedState { table: "prism-task", .. }));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_token_issues_no_query() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = Poller::new(OperationKind::AppRunlog.table(), settings())
            .with_cancellation(token)
            .run(&Fixed("SUCCESS"), "rl".into())
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::Aborted(AbortDetail { attempts: 0, .. })));
    }
}
