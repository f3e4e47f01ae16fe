//! Prism Central tasks

use crate::client::ApiClient;
use crate::error::Result;
use async_trait::async_trait;
use prismflow_converge::{
    CancellationToken, OperationHandle, OperationKind, PollSettings, Poller, QueryError,
    StatusQuery, StatusSnapshot,
};
use serde::Deserialize;

const API_PREFIX: &str = "api/nutanix/v3";

/// Status of a Prism task
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub percentage_complete: Option<i64>,
    #[serde(default)]
    pub error_detail: Option<String>,
    #[serde(default)]
    pub progress_message: Option<String>,
    #[serde(default)]
    pub entity_reference_list: Vec<TaskEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskEntity {
    #[serde(default)]
    pub kind: Option<String>,
    pub uuid: String,
}

/// Prism task endpoints
#[derive(Debug, Clone)]
pub struct Prism {
    client: ApiClient,
}

impl Prism {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get_task(&self, task_uuid: &str) -> Result<TaskStatus> {
        self.client
            .get(&format!("{}/tasks/{}", API_PREFIX, task_uuid))
            .await
    }

    pub async fn wait_for_task(&self, task_uuid: &str, cancel: CancellationToken) -> Result<TaskStatus> {
        self.wait_for_task_with(
            task_uuid,
            OperationKind::PrismTask.default_settings(),
            cancel,
        )
        .await
    }

    pub async fn wait_for_task_with(
        &self,
        task_uuid: &str,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Result<TaskStatus> {
        let task = Poller::new(OperationKind::PrismTask.table(), settings)
            .with_cancellation(cancel)
            .run(&PrismTaskQuery { api: self }, task_uuid.into())
            .await?
            .into_result()?;
        Ok(task)
    }
}

/// Status query over Prism tasks; the handle is the task uuid
pub struct PrismTaskQuery<'a> {
    pub api: &'a Prism,
}

impl PrismTaskQuery<'_> {
    pub fn snapshot(
        handle: &OperationHandle,
        task: TaskStatus,
    ) -> std::result::Result<StatusSnapshot<TaskStatus>, QueryError> {
        let status = task
            .status
            .clone()
            .ok_or_else(|| QueryError::Transient(format!("task {} carried no status", handle)))?;

        let detail = match (task.error_detail.as_deref(), task.progress_message.as_deref()) {
            (Some(error), Some(progress)) => Some(format!("{} ({})", error, progress)),
            (Some(error), None) => Some(error.to_string()),
            (None, Some(progress)) => Some(progress.to_string()),
            (None, None) => None,
        };
        let subject = task.entity_reference_list.first().map(|e| e.uuid.clone());

        let mut snapshot = StatusSnapshot::new(status, task);
        if let Some(detail) = detail {
            snapshot = snapshot.with_error_detail(detail);
        }
        if let Some(subject) = subject {
            snapshot = snapshot.with_subject(subject);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl StatusQuery for PrismTaskQuery<'_> {
    type Payload = TaskStatus;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> std::result::Result<StatusSnapshot<TaskStatus>, QueryError> {
        let task = self.api.get_task(handle.as_str()).await?;
        Self::snapshot(handle, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_task_joins_error_and_progress() {
        let task: TaskStatus = serde_json::from_value(json!({
            "uuid": "t-1",
            "status": "FAILED",
            "error_detail": "Image not found",
            "progress_message": "create_vm_intentful",
            "entity_reference_list": [{"kind": "vm", "uuid": "vm-3"}]
        }))
        .unwrap();

        let snapshot = PrismTaskQuery::snapshot(&"t-1".into(), task).unwrap();
        assert_eq!(snapshot.raw_state, "FAILED");
        assert_eq!(
            snapshot.error_detail.as_deref(),
            Some("Image not found (create_vm_intentful)")
        );
        assert_eq!(snapshot.subject.as_deref(), Some("vm-3"));
    }
}
