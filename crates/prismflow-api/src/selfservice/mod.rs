//! Self-service (blueprints, applications, runbooks)
//!
//! [`SelfService`] is a thin endpoint layer over [`ApiClient`]. The status
//! query adapters in [`query`] and the lifecycle callers in [`app`] build on
//! top of it.

pub mod app;
pub mod query;
pub mod types;

use crate::client::ApiClient;
use crate::error::Result;
use types::*;

const API_PREFIX: &str = "api/nutanix/v3";

/// Self-service endpoints
#[derive(Debug, Clone)]
pub struct SelfService {
    client: ApiClient,
}

impl SelfService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn get_blueprint(&self, blueprint: &str) -> Result<Blueprint> {
        self.client
            .get(&format!("{}/blueprints/{}", API_PREFIX, blueprint))
            .await
    }

    pub async fn launch_blueprint(
        &self,
        blueprint: &str,
        input: &SimpleLaunchInput,
    ) -> Result<LaunchResponse> {
        self.client
            .post(
                &format!("{}/blueprints/{}/simple_launch", API_PREFIX, blueprint),
                input,
            )
            .await
    }

    pub async fn pending_launch(&self, blueprint: &str, request_id: &str) -> Result<PendingLaunch> {
        self.client
            .get(&format!(
                "{}/blueprints/{}/pending_launches/{}",
                API_PREFIX, blueprint, request_id
            ))
            .await
    }

    pub async fn get_app(&self, app: &str) -> Result<Application> {
        self.client
            .get(&format!("{}/apps/{}", API_PREFIX, app))
            .await
    }

    pub async fn delete_app(&self, app: &str, soft: bool) -> Result<DeleteResponse> {
        let path = if soft {
            format!("{}/apps/{}?type=soft", API_PREFIX, app)
        } else {
            format!("{}/apps/{}", API_PREFIX, app)
        };
        self.client.delete(&path).await
    }

    pub async fn run_system_action(&self, app: &str, action: &str) -> Result<SystemActionResponse> {
        let input = SystemActionInput {
            name: action.to_string(),
        };
        self.client
            .post(&format!("{}/apps/{}/actions/run", API_PREFIX, app), &input)
            .await
    }

    pub async fn run_action(
        &self,
        app: &str,
        action_uuid: &str,
        input: &ActionRunInput,
    ) -> Result<ActionRunResponse> {
        self.client
            .post(
                &format!("{}/apps/{}/actions/{}/run", API_PREFIX, app, action_uuid),
                input,
            )
            .await
    }

    pub async fn run_patch(
        &self,
        app: &str,
        patch_uuid: &str,
        input: &PatchRunInput,
    ) -> Result<ActionRunResponse> {
        self.client
            .post(
                &format!("{}/apps/{}/patch/{}/run", API_PREFIX, app, patch_uuid),
                input,
            )
            .await
    }

    pub async fn app_runlog(&self, app: &str, runlog: &str) -> Result<AppRunlog> {
        self.client
            .get(&format!(
                "{}/apps/{}/app_runlogs/{}/output",
                API_PREFIX, app, runlog
            ))
            .await
    }

    pub async fn list_recovery_points(
        &self,
        app: &str,
        input: &ListInput,
    ) -> Result<RecoveryPointList> {
        self.client
            .post(
                &format!("{}/apps/{}/recovery_groups/list", API_PREFIX, app),
                input,
            )
            .await
    }

    /// Delete the recovery point group named in `input` (`snapshot_group_id` arg)
    pub async fn delete_recovery_points(
        &self,
        app: &str,
        input: &ActionRunInput,
    ) -> Result<ActionRunResponse> {
        self.client
            .post(
                &format!("{}/apps/{}/recovery_groups/delete", API_PREFIX, app),
                input,
            )
            .await
    }

    pub async fn list_apps(&self, input: &ListInput) -> Result<EntityList> {
        self.client
            .post(&format!("{}/apps/list", API_PREFIX), input)
            .await
    }

    pub async fn list_runbooks(&self, input: &ListInput) -> Result<EntityList> {
        self.client
            .post(&format!("{}/runbooks/list", API_PREFIX), input)
            .await
    }

    pub async fn execute_runbook(
        &self,
        runbook: &str,
        input: &RunbookExecuteInput,
    ) -> Result<RunbookExecuteResponse> {
        self.client
            .post(&format!("{}/runbooks/{}/execute", API_PREFIX, runbook), input)
            .await
    }

    pub async fn runbook_runlog(&self, runlog: &str) -> Result<RunbookRunlog> {
        self.client
            .get(&format!("{}/runbooks/runlogs/{}", API_PREFIX, runlog))
            .await
    }
}
