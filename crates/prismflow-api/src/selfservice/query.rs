//! Status query adapters for self-service operations

use super::SelfService;
use super::types::{AppRunlog, Application, PendingLaunch, RunbookRunlog};
use async_trait::async_trait;
use prismflow_converge::{OperationHandle, QueryError, StatusQuery, StatusSnapshot};

fn missing_state(what: &str, handle: &OperationHandle) -> QueryError {
    QueryError::Transient(format!("{} {} carried no state", what, handle))
}

/// Pending launch of a blueprint; the handle is the launch request id
pub struct LaunchQuery<'a> {
    pub api: &'a SelfService,
    pub blueprint: String,
}

impl LaunchQuery<'_> {
    pub fn snapshot(
        handle: &OperationHandle,
        launch: PendingLaunch,
    ) -> Result<StatusSnapshot<PendingLaunch>, QueryError> {
        let state = launch
            .status
            .state
            .clone()
            .ok_or_else(|| missing_state("launch", handle))?;
        let app = launch.status.application_uuid.clone();

        let mut snapshot = StatusSnapshot::new(state.as_str(), launch);
        if let Some(app) = app {
            snapshot = snapshot
                .with_error_detail(format!("application {} reported {}", app, state))
                .with_subject(app);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl StatusQuery for LaunchQuery<'_> {
    type Payload = PendingLaunch;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> Result<StatusSnapshot<PendingLaunch>, QueryError> {
        let launch = self
            .api
            .pending_launch(&self.blueprint, handle.as_str())
            .await?;
        Self::snapshot(handle, launch)
    }
}

/// Lifecycle state of an application; the handle is the application uuid
pub struct AppStateQuery<'a> {
    pub api: &'a SelfService,
}

impl AppStateQuery<'_> {
    pub fn snapshot(
        handle: &OperationHandle,
        app: Application,
    ) -> Result<StatusSnapshot<Application>, QueryError> {
        let state = app
            .state()
            .map(str::to_string)
            .ok_or_else(|| missing_state("application", handle))?;
        let detail = app.status["message_list"][0]["message"]
            .as_str()
            .map(str::to_string);

        let mut snapshot = StatusSnapshot::new(state, app).with_subject(handle.as_str());
        if let Some(detail) = detail {
            snapshot = snapshot.with_error_detail(detail);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl StatusQuery for AppStateQuery<'_> {
    type Payload = Application;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> Result<StatusSnapshot<Application>, QueryError> {
        let app = self.api.get_app(handle.as_str()).await?;
        Self::snapshot(handle, app)
    }
}

/// Run-log of an application action; the handle is the run-log uuid
pub struct AppRunlogQuery<'a> {
    pub api: &'a SelfService,
    pub app: String,
}

impl AppRunlogQuery<'_> {
    pub fn snapshot(
        &self,
        handle: &OperationHandle,
        runlog: AppRunlog,
    ) -> Result<StatusSnapshot<AppRunlog>, QueryError> {
        let state = runlog
            .state()
            .map(str::to_string)
            .ok_or_else(|| missing_state("run-log", handle))?;

        let detail = match (runlog.exit_code(), runlog.last_output_line()) {
            (Some(code), Some(line)) => Some(format!("exit code {}: {}", code, line)),
            (Some(code), None) => Some(format!("exit code {}", code)),
            (None, Some(line)) => Some(line.to_string()),
            (None, None) => None,
        };

        let mut snapshot = StatusSnapshot::new(state, runlog).with_subject(self.app.as_str());
        if let Some(detail) = detail {
            snapshot = snapshot.with_error_detail(detail);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl StatusQuery for AppRunlogQuery<'_> {
    type Payload = AppRunlog;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> Result<StatusSnapshot<AppRunlog>, QueryError> {
        let runlog = self.api.app_runlog(&self.app, handle.as_str()).await?;
        self.snapshot(handle, runlog)
    }
}

/// Run-log of a runbook execution; the handle is the run-log uuid
pub struct RunbookRunlogQuery<'a> {
    pub api: &'a SelfService,
}

impl RunbookRunlogQuery<'_> {
    pub fn snapshot(
        handle: &OperationHandle,
        runlog: RunbookRunlog,
    ) -> Result<StatusSnapshot<RunbookRunlog>, QueryError> {
        let state = runlog
            .status
            .state
            .clone()
            .ok_or_else(|| missing_state("runbook run-log", handle))?;
        Ok(StatusSnapshot::new(state, runlog))
    }
}

#[async_trait]
impl StatusQuery for RunbookRunlogQuery<'_> {
    type Payload = RunbookRunlog;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> Result<StatusSnapshot<RunbookRunlog>, QueryError> {
        let runlog = self.api.runbook_runlog(handle.as_str()).await?;
        Self::snapshot(handle, runlog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_launch_snapshot_names_application() {
        let launch: PendingLaunch = serde_json::from_value(json!({
            "status": {"state": "failed", "application_uuid": "app-9", "app_name": "web"}
        }))
        .unwrap();

        let snapshot = LaunchQuery::snapshot(&"req-1".into(), launch).unwrap();
        assert_eq!(snapshot.raw_state, "failed");
        assert_eq!(snapshot.subject.as_deref(), Some("app-9"));
        assert_eq!(
            snapshot.error_detail.as_deref(),
            Some("application app-9 reported failed")
        );
    }

    #[test]
    fn test_launch_without_state_is_transient() {
        let launch: PendingLaunch = serde_json::from_value(json!({"status": {}})).unwrap();
        let err = LaunchQuery::snapshot(&"req-1".into(), launch).unwrap_err();
        assert!(matches!(err, QueryError::Transient(_)));
    }

    #[test]
    fn test_app_state_snapshot() {
        let app: Application = serde_json::from_value(json!({
            "status": {"state": "error", "message_list": [{"message": "VM create failed"}]},
            "metadata": {"uuid": "app-1"}
        }))
        .unwrap();

        let snapshot = AppStateQuery::snapshot(&"app-1".into(), app).unwrap();
        assert_eq!(snapshot.raw_state, "error");
        assert_eq!(snapshot.error_detail.as_deref(), Some("VM create failed"));
        assert_eq!(snapshot.subject.as_deref(), Some("app-1"));
    }

    #[test]
    fn test_runbook_runlog_snapshot() {
        let runlog: RunbookRunlog = serde_json::from_value(json!({
            "status": {"state": "SUCCESS",
                "output_variable_list": [{"name": "ip", "value": "10.1.1.4"}]}
        }))
        .unwrap();

        let snapshot = RunbookRunlogQuery::snapshot(&"rl-1".into(), runlog).unwrap();
        assert_eq!(snapshot.raw_state, "SUCCESS");
        assert_eq!(snapshot.payload.status.output_variable_list.len(), 1);
    }
}
