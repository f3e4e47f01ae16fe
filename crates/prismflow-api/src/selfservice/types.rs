//! Self-service wire types
//!
//! Blueprints and applications are large free-form documents; only the
//! fields the lifecycle callers navigate are typed. The rest stays as
//! [`serde_json::Value`] so a read-modify-write round trip loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a named entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub uuid: String,
}

/// Blueprint document
#[derive(Debug, Clone, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub spec: Value,
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub metadata: Value,
}

impl Blueprint {
    /// Application profiles declared in `spec.resources.app_profile_list`
    pub fn app_profiles(&self) -> Vec<EntityReference> {
        self.spec["resources"]["app_profile_list"]
            .as_array()
            .map(|profiles| {
                profiles
                    .iter()
                    .filter_map(|p| {
                        Some(EntityReference {
                            kind: "app_profile".to_string(),
                            name: p["name"].as_str().map(str::to_string),
                            uuid: p["uuid"].as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimpleLaunchInput {
    pub spec: SimpleLaunchSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimpleLaunchSpec {
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_description: Option<String>,
    pub app_profile_reference: EntityReference,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchResponse {
    pub status: LaunchStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchStatus {
    pub request_id: String,
}

/// Result of polling a pending launch
#[derive(Debug, Clone, Deserialize)]
pub struct PendingLaunch {
    #[serde(default)]
    pub status: PendingLaunchStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingLaunchStatus {
    #[serde(default)]
    pub application_uuid: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub bp_uuid: Option<String>,
}

/// Application document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub spec: Value,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub api_version: Option<String>,
}

impl Application {
    pub fn state(&self) -> Option<&str> {
        self.status["state"].as_str()
    }

    pub fn uuid(&self) -> Option<&str> {
        self.metadata["uuid"].as_str()
    }

    pub fn name(&self) -> Option<&str> {
        self.status["name"]
            .as_str()
            .or_else(|| self.metadata["name"].as_str())
    }

    /// Actions listed under `spec.resources.action_list` and
    /// `status.resources.action_list`
    pub fn actions(&self) -> impl Iterator<Item = &Value> {
        let spec = self.spec["resources"]["action_list"].as_array();
        let status = self.status["resources"]["action_list"].as_array();
        spec.into_iter().chain(status).flatten()
    }

    /// Substrate configuration uuid of the first deployment
    pub fn substrate_reference(&self) -> Option<&str> {
        self.status["resources"]["deployment_list"][0]["substrate_configuration"]["uuid"].as_str()
    }

    /// Patches listed under `spec.resources.patch_list`
    pub fn patches(&self) -> impl Iterator<Item = &Value> {
        self.spec["resources"]["patch_list"]
            .as_array()
            .into_iter()
            .flatten()
    }
}

/// Argument of an action run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionArg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_uuid: Option<String>,
    pub name: String,
    pub value: String,
}

impl ActionArg {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            task_uuid: None,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn for_task(mut self, task_uuid: impl Into<String>) -> Self {
        self.task_uuid = Some(task_uuid.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemActionInput {
    pub name: String,
}

/// Response of a system action; the run-log uuid sits at the top level
#[derive(Debug, Clone, Deserialize)]
pub struct SystemActionResponse {
    pub runlog_uuid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRunInput {
    pub spec: ActionRunSpec,
    pub api_version: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRunSpec {
    pub args: Vec<ActionArg>,
    pub target_uuid: String,
    pub target_kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchRunInput {
    pub spec: PatchRunSpec,
    pub api_version: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchRunSpec {
    pub args: PatchArgs,
    pub target_uuid: String,
    pub target_kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchArgs {
    pub variables: Vec<ActionArg>,
    pub patch: Value,
}

/// Response of a custom action, patch or recovery action run
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRunResponse {
    pub status: RunlogReference,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunlogReference {
    pub runlog_uuid: String,
}

/// Output of an application run-log
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppRunlog {
    #[serde(default)]
    pub status: Option<AppRunlogStatus>,
    #[serde(default)]
    pub output_list: Vec<RunlogOutput>,
}

impl AppRunlog {
    pub fn state(&self) -> Option<&str> {
        self.status.as_ref()?.runlog_state.as_deref()
    }

    pub fn exit_code(&self) -> Option<i64> {
        self.status.as_ref()?.exit_code
    }

    /// Last non-empty output line across all tasks
    pub fn last_output_line(&self) -> Option<&str> {
        self.output_list
            .iter()
            .rev()
            .filter_map(|o| o.output.as_deref())
            .flat_map(|o| o.lines().rev())
            .map(str::trim)
            .find(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppRunlogStatus {
    #[serde(default)]
    pub runlog_state: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunlogOutput {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunbookExecuteInput {
    pub spec: RunbookExecuteSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunbookExecuteSpec {
    pub args: Vec<RunbookArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookArg {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunbookExecuteResponse {
    pub status: RunlogReference,
}

/// Runbook run-log
#[derive(Debug, Clone, Deserialize)]
pub struct RunbookRunlog {
    #[serde(default)]
    pub status: RunbookRunlogStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunbookRunlogStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub output_variable_list: Vec<OutputVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVariable {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub status: DeleteStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteStatus {
    #[serde(default)]
    pub runlog_uuid: Option<String>,
    #[serde(default)]
    pub ergon_task_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub length: u32,
    pub offset: u32,
}

/// Entities returned by a `*/list` call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityList {
    #[serde(default)]
    pub entities: Vec<Value>,
}

impl EntityList {
    /// `metadata.uuid` of the first entity
    pub fn first_uuid(&self) -> Option<&str> {
        self.entities.first()?["metadata"]["uuid"].as_str()
    }
}

/// Recovery point groups of an application
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecoveryPointList {
    #[serde(default)]
    pub entities: Vec<Value>,
}

impl RecoveryPointList {
    /// `(name, uuid)` of every recovery point group
    pub fn groups(&self) -> Vec<(String, String)> {
        self.entities
            .iter()
            .filter_map(|e| {
                let uuid = e["metadata"]["uuid"]
                    .as_str()
                    .or_else(|| e["status"]["uuid"].as_str())?;
                let name = e["status"]["name"].as_str().unwrap_or_default();
                Some((name.to_string(), uuid.to_string()))
            })
            .collect()
    }

    /// Uuid of the group holding the recovery point named `name`
    pub fn group_containing(&self, name: &str) -> Option<&str> {
        self.entities.iter().find_map(|e| {
            let status = &e["status"];
            let found = status["recovery_point_info_list"]
                .as_array()?
                .iter()
                .any(|rp| rp["name"].as_str() == Some(name));
            if found { status["uuid"].as_str() } else { None }
        })
    }
}
