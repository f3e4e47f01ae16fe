//! NDB (database service) operations
//!
//! NDB reports operation progress as numeric status codes encoded as
//! strings. `"5"` means completed and `"4"` failed; the lower codes are
//! intermediate steps.

use crate::client::ApiClient;
use crate::error::Result;
use async_trait::async_trait;
use prismflow_converge::{
    CancellationToken, OperationHandle, OperationKind, PollSettings, Poller, QueryError,
    StatusQuery, StatusSnapshot,
};
use serde::Deserialize;

const API_PREFIX: &str = "era/v0.9";

/// Status of one NDB operation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub percentage_complete: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
}

/// NDB endpoints
#[derive(Debug, Clone)]
pub struct Ndb {
    client: ApiClient,
}

impl Ndb {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get_operation(&self, operation_id: &str) -> Result<OperationStatus> {
        self.client
            .get(&format!("{}/operations/{}", API_PREFIX, operation_id))
            .await
    }

    /// Wait for an operation with the default NDB settings
    pub async fn wait_for_operation(
        &self,
        operation_id: &str,
        cancel: CancellationToken,
    ) -> Result<OperationStatus> {
        self.wait_for_operation_with(
            operation_id,
            OperationKind::NdbOperation.default_settings(),
            cancel,
        )
        .await
    }

    pub async fn wait_for_operation_with(
        &self,
        operation_id: &str,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Result<OperationStatus> {
        let status = Poller::new(OperationKind::NdbOperation.table(), settings)
            .with_cancellation(cancel)
            .run(&NdbOperationQuery { api: self }, operation_id.into())
            .await?
            .into_result()?;
        Ok(status)
    }
}

/// Status query over NDB operations; the handle is the operation id
pub struct NdbOperationQuery<'a> {
    pub api: &'a Ndb,
}

impl NdbOperationQuery<'_> {
    pub fn snapshot(
        handle: &OperationHandle,
        operation: OperationStatus,
    ) -> std::result::Result<StatusSnapshot<OperationStatus>, QueryError> {
        let status = operation.status.clone().ok_or_else(|| {
            QueryError::Transient(format!("operation {} carried no status", handle))
        })?;

        let detail = format!(
            "{}, {}% complete",
            operation.message.as_deref().unwrap_or("no message"),
            operation.percentage_complete.as_deref().unwrap_or("0")
        );
        let subject = operation.entity_id.clone();

        let mut snapshot = StatusSnapshot::new(status, operation).with_error_detail(detail);
        if let Some(subject) = subject {
            snapshot = snapshot.with_subject(subject);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl StatusQuery for NdbOperationQuery<'_> {
    type Payload = OperationStatus;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> std::result::Result<StatusSnapshot<OperationStatus>, QueryError> {
        let operation = self.api.get_operation(handle.as_str()).await?;
        Self::snapshot(handle, operation)
    }
}
