//! Decision task assembly across history pages

use tracing::debug;

use crate::model::{
    HistoryEvent, PollForDecisionTaskRequest, PollForDecisionTaskResponse, WorkflowExecution,
    WorkflowType,
};
use crate::reliability::RetryPolicy;
use crate::transport::{SwsTransport, TransportError};

/// A decision task with its complete history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionTask {
    pub task_token: String,
    pub workflow_type: Option<WorkflowType>,
    pub workflow_execution: Option<WorkflowExecution>,
    pub started_event_id: i64,
    pub previous_started_event_id: i64,
    pub events: Vec<HistoryEvent>,
}

impl DecisionTask {
    pub fn new(task_token: impl Into<String>, events: Vec<HistoryEvent>) -> Self {
        Self {
            task_token: task_token.into(),
            events,
            ..Default::default()
        }
    }

    pub fn with_workflow_type(mut self, workflow_type: WorkflowType) -> Self {
        self.workflow_type = Some(workflow_type);
        self
    }

    pub fn with_workflow_execution(mut self, execution: WorkflowExecution) -> Self {
        self.workflow_execution = Some(execution);
        self
    }

    pub fn workflow_id(&self) -> &str {
        self.workflow_execution
            .as_ref()
            .map(|e| e.workflow_id.as_str())
            .unwrap_or_default()
    }

    /// Split a first page into the task and the token of the next page
    ///
    /// Returns `None` when the poll came back without a task.
    fn from_first_page(page: PollForDecisionTaskResponse) -> Option<(Self, Option<String>)> {
        let task_token = page.token()?.to_string();
        let next_page = page.next_page().map(str::to_string);

        let task = Self {
            task_token,
            workflow_type: page.workflow_type,
            workflow_execution: page.workflow_execution,
            started_event_id: page.started_event_id,
            previous_started_event_id: page.previous_started_event_id,
            events: page.events,
        };
        Some((task, next_page))
    }
}

/// Fetch every remaining history page behind `first`
///
/// Each page request is retried with `retry`: replaying a truncated history
/// would re-schedule activities that are already running.
pub(crate) async fn assemble(
    transport: &dyn SwsTransport,
    request: &PollForDecisionTaskRequest,
    first: PollForDecisionTaskResponse,
    retry: &RetryPolicy,
) -> Result<Option<DecisionTask>, TransportError> {
    let Some((mut task, mut next_page)) = DecisionTask::from_first_page(first) else {
        return Ok(None);
    };

    let mut pages = 1;
    while let Some(page_token) = next_page.take() {
        let page_request = PollForDecisionTaskRequest {
            next_page_token: Some(page_token),
            ..request.clone()
        };

        let page = retry
            .run("PollForDecisionTask", || {
                transport.poll_for_decision_task(page_request.clone())
            })
            .await?;

        next_page = page.next_page().map(str::to_string);
        task.events.extend(page.events);
        pages += 1;
    }

    debug!(
        workflow_id = task.workflow_id(),
        pages,
        events = task.events.len(),
        "history assembled"
    );
    Ok(Some(task))
}
