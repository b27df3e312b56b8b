//! Transport contract consumed by both runtimes
//!
//! The runtimes never touch HTTP directly. They call an [`SwsTransport`],
//! which is responsible for encoding, signing, sending and decoding one
//! typed request.
//!
//! - [`HttpTransport`] - reqwest-based JSON envelope transport
//! - [`InMemoryTransport`] - scripted fake for tests and local runs

mod http;
mod memory;

use async_trait::async_trait;

use crate::model::{
    ActivityTaskStatus, PollForActivityTaskRequest, PollForActivityTaskResponse,
    PollForDecisionTaskRequest, PollForDecisionTaskResponse, RecordActivityTaskHeartbeatRequest,
    RespondActivityTaskCanceledRequest, RespondActivityTaskCompletedRequest,
    RespondActivityTaskFailedRequest, RespondDecisionTaskCompletedRequest, Run,
    StartWorkflowExecutionRequest,
};

pub use http::{HttpTransport, RequestSigner};
pub use memory::{ActivityResponse, InMemoryTransport};

/// Error type for transport operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Network or protocol failure before a response was read
    #[error("http error: {0}")]
    Http(String),

    /// The service answered with an error body
    #[error("service error ({status}) {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// Request or response body could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Request signing failed
    #[error("request signing failed: {0}")]
    Signing(String),
}

impl TransportError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Service { status, code, .. } => {
                *status >= 500 || code.contains("Throttling") || code.contains("RequestLimit")
            }
            Self::Serialization(_) | Self::Signing(_) => false,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// One method per remote action the helper uses
#[async_trait]
pub trait SwsTransport: Send + Sync + 'static {
    /// Long-poll for a decision task, or fetch a further history page
    async fn poll_for_decision_task(
        &self,
        request: PollForDecisionTaskRequest,
    ) -> Result<PollForDecisionTaskResponse, TransportError>;

    /// Long-poll for an activity task
    async fn poll_for_activity_task(
        &self,
        request: PollForActivityTaskRequest,
    ) -> Result<PollForActivityTaskResponse, TransportError>;

    /// Submit a decision batch
    async fn respond_decision_task_completed(
        &self,
        request: RespondDecisionTaskCompletedRequest,
    ) -> Result<(), TransportError>;

    async fn respond_activity_task_completed(
        &self,
        request: RespondActivityTaskCompletedRequest,
    ) -> Result<(), TransportError>;

    async fn respond_activity_task_failed(
        &self,
        request: RespondActivityTaskFailedRequest,
    ) -> Result<(), TransportError>;

    async fn respond_activity_task_canceled(
        &self,
        request: RespondActivityTaskCanceledRequest,
    ) -> Result<(), TransportError>;

    /// Record liveness; the reply reports whether cancellation was requested
    async fn record_activity_task_heartbeat(
        &self,
        request: RecordActivityTaskHeartbeatRequest,
    ) -> Result<ActivityTaskStatus, TransportError>;

    /// Start a new workflow execution
    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> Result<Run, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Http("connection reset".into()).is_transient());
        assert!(TransportError::Service {
            status: 503,
            code: "ServiceUnavailable".into(),
            message: String::new(),
        }
        .is_transient());
        assert!(TransportError::Service {
            status: 400,
            code: "com.amazon.coral.availability#ThrottlingException".into(),
            message: "Rate exceeded".into(),
        }
        .is_transient());
        assert!(!TransportError::Service {
            status: 400,
            code: "UnknownResourceFault".into(),
            message: "Unknown domain".into(),
        }
        .is_transient());
        assert!(!TransportError::Serialization("eof".into()).is_transient());
    }
}
