//! Starting workflow executions

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::model::{StartWorkflowExecutionRequest, TaskList, WorkflowType};
use crate::reliability::RetryPolicy;
use crate::transport::{SwsTransport, TransportError};

/// Optional settings for a new execution
///
/// Unset values fall back to the defaults registered with the workflow type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub task_list: Option<String>,
    pub execution_start_to_close_timeout: Option<Duration>,
    pub task_start_to_close_timeout: Option<Duration>,
    pub child_policy: Option<String>,
    pub tag_list: Vec<String>,
}

impl StartOptions {
    pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.task_list = Some(task_list.into());
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_start_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_decision_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_start_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_child_policy(mut self, policy: impl Into<String>) -> Self {
        self.child_policy = Some(policy.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag_list.push(tag.into());
        self
    }
}

/// Starts workflow executions in one domain
#[derive(Clone)]
pub struct WorkflowStarter {
    transport: Arc<dyn SwsTransport>,
    domain: String,
    retry: RetryPolicy,
}

impl WorkflowStarter {
    pub fn new(transport: Arc<dyn SwsTransport>, domain: impl Into<String>) -> Self {
        Self {
            transport,
            domain: domain.into(),
            retry: RetryPolicy::no_retry(),
        }
    }

    /// Retry transient failures of the start call
    ///
    /// Off by default: a retried start whose first attempt reached the
    /// service fails with `WorkflowExecutionAlreadyStartedFault`.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start an execution and return its `runId`
    pub async fn start(
        &self,
        workflow_id: impl Into<String>,
        workflow_type: WorkflowType,
        input: Option<String>,
        options: StartOptions,
    ) -> Result<String, TransportError> {
        let secs = |timeout: Option<Duration>| timeout.map(|d| d.as_secs());

        let request = StartWorkflowExecutionRequest {
            domain: self.domain.clone(),
            workflow_id: workflow_id.into(),
            workflow_type,
            task_list: options.task_list.map(TaskList::new),
            input,
            execution_start_to_close_timeout: secs(options.execution_start_to_close_timeout),
            task_start_to_close_timeout: secs(options.task_start_to_close_timeout),
            child_policy: options.child_policy,
            tag_list: options.tag_list,
        };

        let transport = &self.transport;
        let run = self
            .retry
            .run_when(
                "StartWorkflowExecution",
                TransportError::is_transient,
                || transport.start_workflow_execution(request.clone()),
            )
            .await?;

        info!(
            workflow_id = %request.workflow_id,
            run_id = %run.run_id,
            "workflow execution started"
        );
        Ok(run.run_id)
    }
}

impl std::fmt::Debug for WorkflowStarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStarter")
            .field("domain", &self.domain)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    #[tokio::test]
    async fn test_start_returns_run_id() {
        let transport = Arc::new(InMemoryTransport::new());
        let starter = WorkflowStarter::new(transport.clone(), "prod");

        let run_id = starter
            .start(
                "order-17",
                WorkflowType::new("sum", "1"),
                Some("1,2,3".to_string()),
                StartOptions::default()
                    .with_task_list("deciders")
                    .with_execution_timeout(Duration::from_secs(3600))
                    .with_tag("orders"),
            )
            .await
            .unwrap();

        assert_eq!(run_id, "run-1");

        let started = transport.started_workflows();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].domain, "prod");
        assert_eq!(started[0].workflow_id, "order-17");
        assert_eq!(started[0].task_list, Some(TaskList::new("deciders")));
        assert_eq!(started[0].execution_start_to_close_timeout, Some(3600));
        assert_eq!(started[0].tag_list, vec!["orders".to_string()]);
    }

    #[tokio::test]
    async fn test_start_failure_is_returned() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail_next::<StartWorkflowExecutionRequest>(1);
        let starter = WorkflowStarter::new(transport, "prod");

        let result = starter
            .start("order-18", WorkflowType::new("sum", "1"), None, StartOptions::default())
            .await;
        assert!(matches!(result, Err(TransportError::Http(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_retry() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail_next::<StartWorkflowExecutionRequest>(2);
        let starter = WorkflowStarter::new(transport.clone(), "prod")
            .with_retry_policy(RetryPolicy::transport());

        let run_id = starter
            .start("order-19", WorkflowType::new("sum", "1"), None, StartOptions::default())
            .await
            .unwrap();
        assert_eq!(run_id, "run-1");
        assert_eq!(transport.call_count::<StartWorkflowExecutionRequest>(), 3);
    }
}
