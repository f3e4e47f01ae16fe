use async_trait::async_trait;
use prismflow_converge::{
    CancellationToken, ClassificationTable, ConvergeError, FailureReason, NotFoundPolicy,
    OperationHandle, OperationKind, PollOutcome, PollSettings, Poller, QueryError, StateClass,
    StatusQuery, StatusSnapshot, poll,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

const TASK: ClassificationTable = ClassificationTable::new(
    "task",
    &["RUNNING", "PENDING"],
    &["SUCCEEDED"],
    &["FAILED", "ERROR"],
);

type Step = Result<(&'static str, Option<&'static str>), QueryError>;

/// Status query replaying a fixed script; the last step repeats forever
struct Scripted {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Instant>>,
    latency: Duration,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    fn states(states: &[&'static str]) -> Self {
        Self::new(states.iter().map(|s| Ok((*s, None))).collect())
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusQuery for Scripted {
    type Payload = String;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> Result<StatusSnapshot<String>, QueryError> {
        self.calls.lock().unwrap().push(Instant::now());
        let step = {
            let mut steps = self.steps.lock().unwrap();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        }
        .expect("script must not be empty");

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let (state, detail) = step?;
        let mut snapshot = StatusSnapshot::new(state, format!("{}:{}", handle, state))
            .with_subject("app-7");
        if let Some(detail) = detail {
            snapshot = snapshot.with_error_detail(detail);
        }
        Ok(snapshot)
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn immediate_success_does_not_sleep() {
    let query = Scripted::states(&["SUCCEEDED"]);
    let started = Instant::now();

    let outcome = poll(
        &query,
        "op-1".into(),
        TASK,
        PollSettings::new(secs(1), secs(5)),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, PollOutcome::Success("op-1:SUCCEEDED".to_string()));
    assert_eq!(query.calls().len(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn converges_after_pending_states() {
    let query = Scripted::states(&["PENDING", "RUNNING", "RUNNING", "RUNNING", "SUCCEEDED"]);
    let delay = Duration::from_millis(750);

    let outcome = Poller::new(TASK, PollSettings::new(delay, secs(60)))
        .run(&query, "op-2".into())
        .await
        .unwrap();

    assert!(outcome.is_success());
    let calls = query.calls();
    assert_eq!(calls.len(), 5);
    for pair in calls.windows(2) {
        assert!(pair[1] - pair[0] >= delay);
    }
}

#[tokio::test(start_paused = true)]
async fn pending_running_succeeded_scenario() {
    let query = Scripted::states(&["PENDING", "RUNNING", "SUCCEEDED"]);
    let started = Instant::now();

    let outcome = Poller::new(TASK, PollSettings::new(secs(1), secs(5)))
        .run(&query, "op-3".into())
        .await
        .unwrap();

    assert_eq!(outcome.success().as_deref(), Some("op-3:SUCCEEDED"));
    assert_eq!(query.calls().len(), 3);
    assert!(started.elapsed() >= secs(2));
}

#[tokio::test(start_paused = true)]
async fn always_pending_times_out() {
    let query = Scripted::states(&["RUNNING"]);
    let started = Instant::now();

    let outcome = Poller::new(TASK, PollSettings::new(secs(1), secs(3)))
        .run(&query, "op-4".into())
        .await
        .unwrap();

    let PollOutcome::TimedOut(detail) = outcome else {
        panic!("expected TimedOut");
    };
    assert_eq!(detail.attempts, 3);
    assert_eq!(detail.last_state.as_deref(), Some("RUNNING"));
    assert_eq!(query.calls().len(), 3);
    assert!(started.elapsed() >= secs(3));
    assert!(started.elapsed() <= secs(3) + secs(1));

    let err = PollOutcome::<String>::TimedOut(detail).into_result().unwrap_err();
    assert!(matches!(err, ConvergeError::TimedOut { .. }));
}

#[tokio::test(start_paused = true)]
async fn failure_detail_is_verbatim() {
    let query = Scripted::new(vec![
        Ok(("RUNNING", None)),
        Ok(("FAILED", Some("disk full"))),
    ]);

    let outcome = Poller::new(TASK, PollSettings::new(secs(1), secs(30)))
        .run(&query, "op-5".into())
        .await
        .unwrap();

    let PollOutcome::Failure(detail) = outcome else {
        panic!("expected Failure");
    };
    assert_eq!(detail.error_detail.as_deref(), Some("disk full"));
    assert_eq!(detail.raw_state.as_deref(), Some("FAILED"));
    assert_eq!(detail.subject.as_deref(), Some("app-7"));
    assert_eq!(detail.handle.as_str(), "op-5");
    assert_eq!(detail.reason, FailureReason::Reported);
    assert_eq!(query.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_sleep_aborts() {
    let query = Scripted::states(&["RUNNING"]);
    let token = CancellationToken::new();
    let poller = Poller::new(TASK, PollSettings::new(secs(5), secs(600)))
        .with_cancellation(token.clone());

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(secs(7)).await;
            token.cancel();
        })
    };

    let started = Instant::now();
    let outcome = poller.run(&query, "op-6".into()).await.unwrap();
    canceller.await.unwrap();

    assert!(matches!(outcome, PollOutcome::Aborted(_)));
    // queries at t=0 and t=5, cancelled during the second sleep
    assert_eq!(query.calls().len(), 2);
    assert!(started.elapsed() < secs(10));
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_query_aborts() {
    let query = Scripted::states(&["SUCCEEDED"]).with_latency(secs(60));
    let token = CancellationToken::new();
    let poller = Poller::new(TASK, PollSettings::new(secs(1), secs(600)))
        .with_cancellation(token.clone());

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(secs(2)).await;
            token.cancel();
        })
    };

    let started = Instant::now();
    let outcome = poller.run(&query, "op-6b".into()).await.unwrap();
    canceller.await.unwrap();

    let PollOutcome::Aborted(detail) = outcome else {
        panic!("expected Aborted");
    };
    assert_eq!(detail.attempts, 1);
    assert_eq!(detail.last_state, None);
    assert_eq!(query.calls().len(), 1);
    assert!(started.elapsed() >= secs(2));
    assert!(started.elapsed() < secs(3));
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_still_issues_first_query() {
    let settings = PollSettings::new(secs(1), Duration::ZERO);

    let query = Scripted::states(&["SUCCEEDED"]);
    let outcome = Poller::new(TASK, settings)
        .run(&query, "op-z1".into())
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::Success("op-z1:SUCCEEDED".to_string()));
    assert_eq!(query.calls().len(), 1);

    let query = Scripted::states(&["RUNNING"]);
    let outcome = Poller::new(TASK, settings)
        .run(&query, "op-z2".into())
        .await
        .unwrap();
    let PollOutcome::TimedOut(detail) = outcome else {
        panic!("expected TimedOut");
    };
    assert_eq!(detail.attempts, 1);
    assert_eq!(detail.last_state.as_deref(), Some("RUNNING"));
    assert_eq!(query.calls().len(), 1);

    // A slow first answer is still waited for
    let query = Scripted::states(&["SUCCEEDED"]).with_latency(secs(2));
    let outcome = Poller::new(TASK, settings)
        .run(&query, "op-z3".into())
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::Success("op-z3:SUCCEEDED".to_string()));
}

#[tokio::test(start_paused = true)]
async fn slow_query_cannot_outlive_timeout() {
    let query = Scripted::states(&["RUNNING"]).with_latency(secs(3600));
    let started = Instant::now();

    let outcome = Poller::new(TASK, PollSettings::new(secs(1), secs(10)))
        .run(&query, "op-7".into())
        .await
        .unwrap();

    assert!(matches!(outcome, PollOutcome::TimedOut(_)));
    assert!(started.elapsed() >= secs(10));
    assert!(started.elapsed() < secs(11));
    assert_eq!(query.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_error_propagates_without_retry() {
    let query = Scripted::new(vec![
        Ok(("RUNNING", None)),
        Err(QueryError::Transient("connection reset".to_string())),
        Ok(("SUCCEEDED", None)),
    ]);

    let err = Poller::new(TASK, PollSettings::new(secs(1), secs(30)))
        .run(&query, "op-8".into())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConvergeError::Transient { ref handle, ref message }
            if handle == "op-8" && message == "connection reset"
    ));
    assert!(err.is_transient());
    assert_eq!(query.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn not_found_follows_policy() {
    let vanished = || Scripted::new(vec![Err(QueryError::NotFound("gone".to_string()))]);
    let base = PollSettings::new(secs(1), secs(30));

    let err = Poller::new(TASK, base.with_not_found(NotFoundPolicy::Propagate))
        .run(&vanished(), "op-9".into())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvergeError::HandleNotFound { .. }));

    let outcome = Poller::new(TASK, base.with_not_found(NotFoundPolicy::Failure))
        .run(&vanished(), "op-9".into())
        .await
        .unwrap();
    let PollOutcome::Failure(detail) = outcome else {
        panic!("expected Failure");
    };
    assert_eq!(detail.reason, FailureReason::HandleVanished);
    assert_eq!(detail.error_detail.as_deref(), Some("invalid handle"));
    assert_eq!(detail.raw_state, None);
}

#[tokio::test(start_paused = true)]
async fn independent_pollers_run_concurrently() {
    let fast = Scripted::states(&["PENDING", "SUCCEEDED"]);
    let slow = Scripted::states(&["PENDING", "PENDING", "PENDING", "FAILED"]);
    let poller = Poller::new(TASK, PollSettings::new(secs(2), secs(60)));
    let started = Instant::now();

    let (a, b) = tokio::join!(
        poller.run(&fast, "a".into()),
        poller.run(&slow, "b".into())
    );

    assert!(a.unwrap().is_success());
    assert!(matches!(b.unwrap(), PollOutcome::Failure(_)));
    assert!(started.elapsed() >= secs(6));
    assert!(started.elapsed() < secs(7));
}

#[test]
fn every_shipped_literal_classifies_to_its_own_set() {
    for kind in OperationKind::ALL {
        let table = kind.table();
        table.validate().unwrap();
        for (literal, class) in table.literals() {
            assert_eq!(
                table.classify(literal).unwrap(),
                class,
                "{} literal {:?}",
                kind,
                literal
            );
        }
        assert!(table.literals().any(|(_, class)| class == StateClass::Success));
    }
}
