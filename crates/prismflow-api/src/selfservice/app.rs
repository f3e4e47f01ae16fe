//! Application lifecycle callers
//!
//! Each operation starts a remote side effect, hands the returned handle to
//! the convergence poller, and reads back the final state on success. A
//! failed, timed-out or aborted poll surfaces as [`ApiError::Converge`] with
//! the matching [`prismflow_converge::ConvergeError`] variant.

use super::SelfService;
use super::query::{AppRunlogQuery, AppStateQuery, LaunchQuery, RunbookRunlogQuery};
use super::types::*;
use crate::error::{ApiError, Result};
use prismflow_converge::{
    CancellationToken, ConvergeError, NotFoundPolicy, OperationHandle, OperationKind, PollProfile,
    Poller,
};
use serde_json::Value;
use tracing::{debug, info};

const TARGET_KIND: &str = "Application";
const DEFAULT_API_VERSION: &str = "3.0";
const CALL_CONFIG_TASK: &str = "CALL_CONFIG";
const RECOVERY_POINT_PAGE: u32 = 250;
const NAME_LOOKUP_LENGTH: u32 = 20;

/// Blueprint launch parameters
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub blueprint: String,
    pub app_name: String,
    pub app_description: Option<String>,

    /// Application profile name; the first profile when unset
    pub app_profile: Option<String>,
}

/// Built-in application actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    Start,
    Stop,
    Restart,
}

impl SystemAction {
    pub fn action_name(self) -> &'static str {
        match self {
            SystemAction::Start => "action_start",
            SystemAction::Stop => "action_stop",
            SystemAction::Restart => "action_restart",
        }
    }
}

impl std::str::FromStr for SystemAction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(SystemAction::Start),
            "stop" => Ok(SystemAction::Stop),
            "restart" => Ok(SystemAction::Restart),
            other => Err(ApiError::InvalidConfig(format!(
                "unknown system action: {} (expected start, stop or restart)",
                other
            ))),
        }
    }
}

/// Completed application action
#[derive(Debug, Clone)]
pub struct ActionRun {
    pub runlog_uuid: String,
    pub runlog: AppRunlog,
}

/// Completed runbook execution
#[derive(Debug, Clone)]
pub struct RunbookResult {
    pub runlog_uuid: String,
    pub state: String,
    pub outputs: Vec<OutputVariable>,
}

/// Drives application operations to completion
pub struct AppLifecycle {
    api: SelfService,
    profile: PollProfile,
    cancel: CancellationToken,
}

impl AppLifecycle {
    pub fn new(api: SelfService) -> Self {
        Self {
            api,
            profile: PollProfile::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_profile(mut self, profile: PollProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn api(&self) -> &SelfService {
        &self.api
    }

    fn poller(&self, kind: OperationKind) -> Poller {
        Poller::new(kind.table(), self.profile.settings(kind)).with_cancellation(self.cancel.clone())
    }

    /// Launch a blueprint and wait until the application is running
    pub async fn provision(&self, request: &LaunchRequest) -> Result<Application> {
        let blueprint = self.api.get_blueprint(&request.blueprint).await?;
        let profiles = blueprint.app_profiles();
        let profile = match &request.app_profile {
            Some(name) => profiles
                .into_iter()
                .find(|p| p.name.as_deref() == Some(name.as_str())),
            None => profiles.into_iter().next(),
        }
        .ok_or_else(|| ApiError::NotResolved {
            kind: "app profile",
            owner: format!("blueprint {}", request.blueprint),
            name: request
                .app_profile
                .clone()
                .unwrap_or_else(|| "<default>".to_string()),
        })?;

        let input = SimpleLaunchInput {
            spec: SimpleLaunchSpec {
                app_name: request.app_name.clone(),
                app_description: request.app_description.clone(),
                app_profile_reference: profile,
            },
        };
        let launched = self.api.launch_blueprint(&request.blueprint, &input).await?;
        info!(
            "Launched blueprint {} as {} (request {})",
            request.blueprint, request.app_name, launched.status.request_id
        );

        let launch_query = LaunchQuery {
            api: &self.api,
            blueprint: request.blueprint.clone(),
        };
        let launch = self
            .poller(OperationKind::BlueprintLaunch)
            .run(&launch_query, launched.status.request_id.into())
            .await?
            .into_result()?;

        let app_uuid = launch.status.application_uuid.ok_or_else(|| {
            ApiError::UnexpectedResponse("launch finished without an application uuid".to_string())
        })?;
        debug!("Launch of {} created application {}", request.app_name, app_uuid);

        let app = self
            .poller(OperationKind::AppProvisioning)
            .run(&AppStateQuery { api: &self.api }, app_uuid.into())
            .await?
            .into_result()?;

        Ok(app)
    }

    /// Run start, stop or restart and wait for its run-log
    pub async fn run_system_action(&self, app: &str, action: SystemAction) -> Result<ActionRun> {
        let response = self
            .api
            .run_system_action(app, action.action_name())
            .await?;
        info!("Running {} on {}", action.action_name(), app);
        self.wait_for_runlog(app, response.runlog_uuid).await
    }

    /// Run a custom action, matched by its name or by `action_<name>`
    pub async fn run_custom_action(
        &self,
        app: &str,
        action_name: &str,
        args: Vec<ActionArg>,
    ) -> Result<ActionRun> {
        let application = self.api.get_app(app).await?;
        let action = find_action(&application, action_name).ok_or_else(|| not_resolved(
            "action",
            app,
            action_name,
        ))?;
        let action_uuid = entity_uuid(action, "action", app, action_name)?;

        let input = ActionRunInput {
            spec: ActionRunSpec {
                args,
                target_uuid: app.to_string(),
                target_kind: TARGET_KIND.to_string(),
            },
            api_version: api_version(&application),
            metadata: application.metadata.clone(),
        };

        let response = self.api.run_action(app, &action_uuid, &input).await?;
        info!("Running action {} on {}", action_name, app);
        self.wait_for_runlog(app, response.status.runlog_uuid).await
    }

    /// Apply a named patch (update configuration) to an application
    pub async fn patch(&self, app: &str, patch_name: &str) -> Result<ActionRun> {
        let application = self.api.get_app(app).await?;
        let patch = application
            .patches()
            .find(|p| p["name"].as_str() == Some(patch_name))
            .ok_or_else(|| not_resolved("patch", app, patch_name))?;
        let patch_uuid = entity_uuid(patch, "patch", app, patch_name)?;

        let input = PatchRunInput {
            spec: PatchRunSpec {
                args: PatchArgs {
                    variables: Vec::new(),
                    patch: patch.clone(),
                },
                target_uuid: app.to_string(),
                target_kind: TARGET_KIND.to_string(),
            },
            api_version: api_version(&application),
            metadata: application.metadata.clone(),
        };

        let response = self.api.run_patch(app, &patch_uuid, &input).await?;
        info!("Applying patch {} to {}", patch_name, app);
        self.wait_for_runlog(app, response.status.runlog_uuid).await
    }

    /// Run a snapshot action creating a recovery point named `snapshot_name`
    pub async fn create_recovery_point(
        &self,
        app: &str,
        action_name: &str,
        snapshot_name: &str,
    ) -> Result<ActionRun> {
        self.run_config_action(app, action_name, "snapshot_name", snapshot_name)
            .await
    }

    /// Run a restore action from the given recovery point group
    pub async fn restore(
        &self,
        app: &str,
        action_name: &str,
        recovery_point_uuid: &str,
    ) -> Result<ActionRun> {
        self.run_config_action(
            app,
            action_name,
            "recovery_point_group_uuid",
            recovery_point_uuid,
        )
        .await
    }

    /// Unexpired recovery point groups of the application's substrate
    pub async fn recovery_points(&self, app: &str) -> Result<RecoveryPointList> {
        let application = self.api.get_app(app).await?;
        self.list_live_recovery_points(app, &application).await
    }

    /// Delete the recovery point group holding the recovery point `name`
    pub async fn delete_recovery_point(&self, app: &str, name: &str) -> Result<ActionRun> {
        let application = self.api.get_app(app).await?;
        let groups = self.list_live_recovery_points(app, &application).await?;
        let group = groups
            .group_containing(name)
            .ok_or_else(|| not_resolved("recovery point", app, name))?;

        let input = ActionRunInput {
            spec: ActionRunSpec {
                args: vec![ActionArg::new("snapshot_group_id", group)],
                target_uuid: app.to_string(),
                target_kind: TARGET_KIND.to_string(),
            },
            api_version: api_version(&application),
            metadata: application.metadata.clone(),
        };

        let response = self.api.delete_recovery_points(app, &input).await?;
        info!("Deleting recovery point {} (group {}) of {}", name, group, app);
        self.wait_for_runlog(app, response.status.runlog_uuid).await
    }

    /// Application uuid for a uuid or a name of a live application
    pub async fn resolve_app(&self, app: &str) -> Result<String> {
        if uuid::Uuid::parse_str(app).is_ok() {
            return Ok(app.to_string());
        }
        let input = ListInput {
            filter: Some(format!("name=={};_state!=deleted", app)),
            length: NAME_LOOKUP_LENGTH,
            offset: 0,
        };
        let apps = self.api.list_apps(&input).await?;
        let uuid = apps.first_uuid().ok_or_else(|| ApiError::NotResolved {
            kind: "application",
            owner: "self-service".to_string(),
            name: app.to_string(),
        })?;
        debug!("Resolved application {} to {}", app, uuid);
        Ok(uuid.to_string())
    }

    /// Runbook uuid for a uuid or a name of a runbook that is not deleted
    pub async fn resolve_runbook(&self, runbook: &str) -> Result<String> {
        if uuid::Uuid::parse_str(runbook).is_ok() {
            return Ok(runbook.to_string());
        }
        let input = ListInput {
            filter: Some(format!("name=={};state!=DELETED", runbook)),
            length: NAME_LOOKUP_LENGTH,
            offset: 0,
        };
        let runbooks = self.api.list_runbooks(&input).await?;
        let uuid = runbooks.first_uuid().ok_or_else(|| ApiError::NotResolved {
            kind: "runbook",
            owner: "self-service".to_string(),
            name: runbook.to_string(),
        })?;
        debug!("Resolved runbook {} to {}", runbook, uuid);
        Ok(uuid.to_string())
    }

    /// Delete an application and wait until it is gone
    ///
    /// An application that no longer resolves counts as deleted, both when
    /// issuing the delete and while polling.
    pub async fn delete(&self, app: &str, soft: bool) -> Result<()> {
        match self.api.delete_app(app, soft).await {
            Ok(response) => debug!(
                "Delete of {} accepted (runlog {:?})",
                app, response.status.runlog_uuid
            ),
            Err(ApiError::NotFound(_)) => {
                info!("Application {} already deleted", app);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        // A vanished application is the success signal here, whatever the profile says
        let kind = OperationKind::AppDeletion;
        let settings = self
            .profile
            .settings(kind)
            .with_not_found(NotFoundPolicy::Propagate);
        let outcome = Poller::new(kind.table(), settings)
            .with_cancellation(self.cancel.clone())
            .run(&AppStateQuery { api: &self.api }, app.into())
            .await;

        match outcome {
            Ok(outcome) => {
                outcome.into_result()?;
            }
            Err(ConvergeError::HandleNotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        info!("Application {} deleted", app);
        Ok(())
    }

    /// Execute a runbook and wait for its run-log
    pub async fn execute_runbook(
        &self,
        runbook: &str,
        args: Vec<RunbookArg>,
    ) -> Result<RunbookResult> {
        let input = RunbookExecuteInput {
            spec: RunbookExecuteSpec { args },
        };
        let response = self.api.execute_runbook(runbook, &input).await?;
        let runlog_uuid = response.status.runlog_uuid;
        info!("Executing runbook {} (runlog {})", runbook, runlog_uuid);

        self.poller(OperationKind::RunbookRunlog)
            .run(&RunbookRunlogQuery { api: &self.api }, runlog_uuid.as_str().into())
            .await?
            .into_result()?;

        let finished = self.api.runbook_runlog(&runlog_uuid).await?;
        Ok(RunbookResult {
            state: finished.status.state.unwrap_or_default(),
            outputs: finished.status.output_variable_list,
            runlog_uuid,
        })
    }

    async fn run_config_action(
        &self,
        app: &str,
        action_name: &str,
        arg_name: &str,
        arg_value: &str,
    ) -> Result<ActionRun> {
        let application = self.api.get_app(app).await?;
        let action = application
            .status["resources"]["action_list"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|a| a["name"].as_str() == Some(action_name))
            .ok_or_else(|| not_resolved("action", app, action_name))?;
        let action_uuid = entity_uuid(action, "action", app, action_name)?;
        let task_uuid = call_config_task(action)
            .ok_or_else(|| not_resolved("CALL_CONFIG task of action", app, action_name))?;

        let input = ActionRunInput {
            spec: ActionRunSpec {
                args: vec![ActionArg::new(arg_name, arg_value).for_task(task_uuid)],
                target_uuid: app.to_string(),
                target_kind: TARGET_KIND.to_string(),
            },
            api_version: api_version(&application),
            metadata: fresh_metadata(&application.metadata),
        };

        let response = self.api.run_action(app, &action_uuid, &input).await?;
        info!("Running {} on {} with {}={}", action_name, app, arg_name, arg_value);
        self.wait_for_runlog(app, response.status.runlog_uuid).await
    }

    async fn list_live_recovery_points(
        &self,
        app: &str,
        application: &Application,
    ) -> Result<RecoveryPointList> {
        let input = ListInput {
            filter: Some(recovery_point_filter(
                application.substrate_reference(),
                chrono::Utc::now().timestamp(),
            )),
            length: RECOVERY_POINT_PAGE,
            offset: 0,
        };
        self.api.list_recovery_points(app, &input).await
    }

    async fn wait_for_runlog(&self, app: &str, runlog_uuid: String) -> Result<ActionRun> {
        let query = AppRunlogQuery {
            api: &self.api,
            app: app.to_string(),
        };
        let runlog = self
            .poller(OperationKind::AppRunlog)
            .run(&query, OperationHandle::new(runlog_uuid.as_str()))
            .await?
            .into_result()?;

        Ok(ActionRun {
            runlog_uuid,
            runlog,
        })
    }
}

/// Recovery points of `substrate` that expire at or after `now` (unix secs)
fn recovery_point_filter(substrate: Option<&str>, now: i64) -> String {
    match substrate {
        Some(substrate) => format!("substrate_reference=={};expiration_time=ge={}", substrate, now),
        None => format!("expiration_time=ge={}", now),
    }
}

/// Action named `name` or `action_<name>`
fn find_action<'a>(app: &'a Application, name: &str) -> Option<&'a Value> {
    let prefixed = format!("action_{}", name.to_ascii_lowercase());
    app.actions().find(|a| {
        let candidate = a["name"].as_str();
        candidate == Some(name) || candidate == Some(prefixed.as_str())
    })
}

/// Uuid of the `CALL_CONFIG` task in the action's runbook
fn call_config_task(action: &Value) -> Option<String> {
    action["runbook"]["task_definition_list"]
        .as_array()?
        .iter()
        .find(|t| t["type"].as_str() == Some(CALL_CONFIG_TASK))
        .and_then(|t| t["uuid"].as_str())
        .map(str::to_string)
}

/// Application metadata with a new request uuid and no owner reference
fn fresh_metadata(metadata: &Value) -> Value {
    let mut metadata = metadata.clone();
    if let Some(map) = metadata.as_object_mut() {
        map.insert(
            "uuid".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
        map.remove("owner_reference");
    }
    metadata
}

fn api_version(app: &Application) -> String {
    app.api_version
        .clone()
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
}

fn entity_uuid(entity: &Value, kind: &'static str, app: &str, name: &str) -> Result<String> {
    entity["uuid"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| not_resolved(kind, app, name))
}

fn not_resolved(kind: &'static str, app: &str, name: &str) -> ApiError {
    ApiError::NotResolved {
        kind,
        owner: format!("application {}", app),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn application() -> Application {
        serde_json::from_value(json!({
            "spec": {"resources": {"action_list": [
                {"name": "action_scale_out", "uuid": "a-scale"},
                {"name": "Backup", "uuid": "a-backup"}
            ]}},
            "status": {"resources": {"action_list": [
                {"name": "Snapshot_App", "uuid": "a-snap", "runbook": {"task_definition_list": [
                    {"type": "DAG", "uuid": "t-dag"},
                    {"type": "CALL_CONFIG", "uuid": "t-config"}
                ]}}
            ]}},
            "metadata": {"uuid": "app-1", "kind": "app",
                "owner_reference": {"kind": "user", "uuid": "u-1"}}
        }))
        .unwrap()
    }

    #[test]
    fn test_find_action_by_name_or_prefixed_name() {
        let app = application();
        assert_eq!(find_action(&app, "Backup").unwrap()["uuid"], "a-backup");
        assert_eq!(find_action(&app, "SCALE_OUT").unwrap()["uuid"], "a-scale");
        assert!(find_action(&app, "scale").is_none());
    }

    #[test]
    fn test_call_config_task() {
        let app = application();
        let action = find_action(&app, "Snapshot_App").unwrap();
        assert_eq!(call_config_task(action).as_deref(), Some("t-config"));
        assert_eq!(call_config_task(&json!({"name": "x"})), None);
    }

    #[test]
    fn test_fresh_metadata_regenerates_uuid() {
        let app = application();
        let metadata = fresh_metadata(&app.metadata);
        assert_ne!(metadata["uuid"], "app-1");
        assert!(metadata["uuid"].as_str().unwrap().len() == 36);
        assert!(metadata.get("owner_reference").is_none());
        assert_eq!(metadata["kind"], "app");
    }

    #[test]
    fn test_recovery_point_filter() {
        assert_eq!(
            recovery_point_filter(Some("sub-1"), 1_700_000_000),
            "substrate_reference==sub-1;expiration_time=ge=1700000000"
        );
        assert_eq!(recovery_point_filter(None, 5), "expiration_time=ge=5");
    }

    #[test]
    fn test_system_action_names() {
        assert_eq!(
            "Restart".parse::<SystemAction>().unwrap().action_name(),
            "action_restart"
        );
        assert!("pause".parse::<SystemAction>().is_err());
    }
}
