//! Status query seam
//!
//! Each remote system plugs into the poller through [`StatusQuery`]. An
//! implementation knows how to fetch one status for a handle and how to pull
//! the state literal and error text out of the response; it knows nothing
//! about delays, timeouts or classification.

use crate::error::QueryError;
use crate::handle::OperationHandle;
use async_trait::async_trait;

/// One observation of a remote operation
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot<T> {
    /// State literal exactly as reported
    pub raw_state: String,

    /// Full response, returned to the caller on success
    pub payload: T,

    /// Remote error text, meaningful when the state is a failure
    pub error_detail: Option<String>,

    /// Identifier of the entity the operation acts on
    pub subject: Option<String>,
}

impl<T> StatusSnapshot<T> {
    pub fn new(raw_state: impl Into<String>, payload: T) -> Self {
        Self {
            raw_state: raw_state.into(),
            payload,
            error_detail: None,
            subject: None,
        }
    }

    pub fn with_error_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Fetches the current status of an in-flight operation
#[async_trait]
pub trait StatusQuery: Send + Sync {
    /// Response type handed back on success
    type Payload: Send;

    async fn query(
        &self,
        handle: &OperationHandle,
    ) -> Result<StatusSnapshot<Self::Payload>, QueryError>;
}

