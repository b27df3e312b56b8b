//! In-memory implementation of SwsTransport for testing

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SwsTransport, TransportError};
use crate::model::{
    ActivityTaskStatus, PollForActivityTaskRequest, PollForActivityTaskResponse,
    PollForDecisionTaskRequest, PollForDecisionTaskResponse, RecordActivityTaskHeartbeatRequest,
    RespondActivityTaskCanceledRequest, RespondActivityTaskCompletedRequest,
    RespondActivityTaskFailedRequest, RespondDecisionTaskCompletedRequest, Run,
    StartWorkflowExecutionRequest, SwsRequest,
};

/// Terminal acknowledgement recorded for an activity task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityResponse {
    Completed(RespondActivityTaskCompletedRequest),
    Failed(RespondActivityTaskFailedRequest),
    Canceled(RespondActivityTaskCanceledRequest),
}

impl ActivityResponse {
    pub fn task_token(&self) -> &str {
        match self {
            Self::Completed(r) => &r.task_token,
            Self::Failed(r) => &r.task_token,
            Self::Canceled(r) => &r.task_token,
        }
    }
}

#[derive(Default)]
struct State {
    decision_tasks: VecDeque<PollForDecisionTaskResponse>,
    history_pages: HashMap<String, PollForDecisionTaskResponse>,
    activity_tasks: VecDeque<PollForActivityTaskResponse>,
    decision_polls: Vec<PollForDecisionTaskRequest>,
    activity_polls: Vec<PollForActivityTaskRequest>,
    decision_responses: Vec<RespondDecisionTaskCompletedRequest>,
    activity_responses: Vec<ActivityResponse>,
    heartbeats: Vec<RecordActivityTaskHeartbeatRequest>,
    cancel_requested: HashSet<String>,
    started: Vec<StartWorkflowExecutionRequest>,
    injected_failures: HashMap<&'static str, u32>,
    latency: HashMap<&'static str, Duration>,
    calls: HashMap<&'static str, u32>,
}

/// Scripted in-memory service
///
/// Tests queue decision tasks, extra history pages and activity tasks, then
/// inspect what the runtimes sent back. Failures and latency can be injected
/// per action.
/// A poll with nothing queued sleeps for the long-poll delay and returns an
/// empty response, like a real long-poll timeout.
///
/// # Example
///
/// ```
/// use sws_flow::transport::InMemoryTransport;
///
/// let transport = InMemoryTransport::new();
/// assert!(transport.decision_responses().is_empty());
/// ```
pub struct InMemoryTransport {
    state: Mutex<State>,
    long_poll: Duration,
}

impl InMemoryTransport {
    /// Create a new in-memory transport with a 1 s long-poll delay
    pub fn new() -> Self {
        Self::with_long_poll(Duration::from_secs(1))
    }

    /// Create a transport whose empty polls wait `long_poll`
    pub fn with_long_poll(long_poll: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            long_poll,
        }
    }

    /// Queue the first page of a decision task
    pub fn push_decision_task(&self, page: PollForDecisionTaskResponse) {
        self.state.lock().decision_tasks.push_back(page);
    }

    /// Register the page returned for a `nextPageToken`
    pub fn push_history_page(&self, page_token: impl Into<String>, page: PollForDecisionTaskResponse) {
        self.state.lock().history_pages.insert(page_token.into(), page);
    }

    /// Queue an activity task
    pub fn push_activity_task(&self, task: PollForActivityTaskResponse) {
        self.state.lock().activity_tasks.push_back(task);
    }

    /// Make the next `count` calls of the given action fail with a transient error
    pub fn fail_next<R: SwsRequest>(&self, count: u32) {
        self.state.lock().injected_failures.insert(R::TARGET, count);
    }

    /// Delay every call of the given action by `latency` before it is answered
    pub fn set_latency<R: SwsRequest>(&self, latency: Duration) {
        self.state.lock().latency.insert(R::TARGET, latency);
    }

    /// Report `cancelRequested` on heartbeats for this task token
    pub fn request_cancel(&self, task_token: impl Into<String>) {
        self.state.lock().cancel_requested.insert(task_token.into());
    }

    /// Decision batches received, in order
    pub fn decision_responses(&self) -> Vec<RespondDecisionTaskCompletedRequest> {
        self.state.lock().decision_responses.clone()
    }

    /// Terminal activity acknowledgements received, in order
    pub fn activity_responses(&self) -> Vec<ActivityResponse> {
        self.state.lock().activity_responses.clone()
    }

    /// Heartbeats received, in order
    pub fn heartbeats(&self) -> Vec<RecordActivityTaskHeartbeatRequest> {
        self.state.lock().heartbeats.clone()
    }

    /// Decision polls received, including history page requests
    pub fn decision_polls(&self) -> Vec<PollForDecisionTaskRequest> {
        self.state.lock().decision_polls.clone()
    }

    /// Activity polls received
    pub fn activity_polls(&self) -> Vec<PollForActivityTaskRequest> {
        self.state.lock().activity_polls.clone()
    }

    /// Workflow starts received
    pub fn started_workflows(&self) -> Vec<StartWorkflowExecutionRequest> {
        self.state.lock().started.clone()
    }

    /// Number of calls made for an action, failed ones included
    pub fn call_count<R: SwsRequest>(&self) -> u32 {
        self.state.lock().calls.get(R::TARGET).copied().unwrap_or(0)
    }

    /// Count the call, wait out any injected latency and consume one
    /// injected failure, if any
    async fn begin<R: SwsRequest>(&self) -> Result<(), TransportError> {
        let latency = {
            let mut state = self.state.lock();
            *state.calls.entry(R::TARGET).or_insert(0) += 1;
            state.latency.get(R::TARGET).copied()
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        match state.injected_failures.get_mut(R::TARGET) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(TransportError::Http(format!(
                    "injected failure for {}",
                    R::TARGET
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwsTransport for InMemoryTransport {
    async fn poll_for_decision_task(
        &self,
        request: PollForDecisionTaskRequest,
    ) -> Result<PollForDecisionTaskResponse, TransportError> {
        self.begin::<PollForDecisionTaskRequest>().await?;

        let page = {
            let mut state = self.state.lock();
            state.decision_polls.push(request.clone());
            match request.next_page_token.as_deref() {
                Some(token) => Some(state.history_pages.get(token).cloned().ok_or_else(|| {
                    TransportError::Service {
                        status: 400,
                        code: "ValidationException".to_string(),
                        message: format!("unknown page token {token}"),
                    }
                })?),
                None => state.decision_tasks.pop_front(),
            }
        };

        match page {
            Some(page) => Ok(page),
            None => {
                tokio::time::sleep(self.long_poll).await;
                Ok(PollForDecisionTaskResponse::default())
            }
        }
    }

    async fn poll_for_activity_task(
        &self,
        request: PollForActivityTaskRequest,
    ) -> Result<PollForActivityTaskResponse, TransportError> {
        self.begin::<PollForActivityTaskRequest>().await?;

        let task = {
            let mut state = self.state.lock();
            state.activity_polls.push(request);
            state.activity_tasks.pop_front()
        };

        match task {
            Some(task) => Ok(task),
            None => {
                tokio::time::sleep(self.long_poll).await;
                Ok(PollForActivityTaskResponse::default())
            }
        }
    }

    async fn respond_decision_task_completed(
        &self,
        request: RespondDecisionTaskCompletedRequest,
    ) -> Result<(), TransportError> {
        self.begin::<RespondDecisionTaskCompletedRequest>().await?;
        self.state.lock().decision_responses.push(request);
        Ok(())
    }

    async fn respond_activity_task_completed(
        &self,
        request: RespondActivityTaskCompletedRequest,
    ) -> Result<(), TransportError> {
        self.begin::<RespondActivityTaskCompletedRequest>().await?;
        self.state
            .lock()
            .activity_responses
            .push(ActivityResponse::Completed(request));
        Ok(())
    }

    async fn respond_activity_task_failed(
        &self,
        request: RespondActivityTaskFailedRequest,
    ) -> Result<(), TransportError> {
        self.begin::<RespondActivityTaskFailedRequest>().await?;
        self.state
            .lock()
            .activity_responses
            .push(ActivityResponse::Failed(request));
        Ok(())
    }

    async fn respond_activity_task_canceled(
        &self,
        request: RespondActivityTaskCanceledRequest,
    ) -> Result<(), TransportError> {
        self.begin::<RespondActivityTaskCanceledRequest>().await?;
        self.state
            .lock()
            .activity_responses
            .push(ActivityResponse::Canceled(request));
        Ok(())
    }

    async fn record_activity_task_heartbeat(
        &self,
        request: RecordActivityTaskHeartbeatRequest,
    ) -> Result<ActivityTaskStatus, TransportError> {
        self.begin::<RecordActivityTaskHeartbeatRequest>().await?;
        let mut state = self.state.lock();
        let cancel_requested = state.cancel_requested.contains(&request.task_token);
        state.heartbeats.push(request);
        Ok(ActivityTaskStatus { cancel_requested })
    }

    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> Result<Run, TransportError> {
        self.begin::<StartWorkflowExecutionRequest>().await?;
        let mut state = self.state.lock();
        let run_id = format!("run-{}", state.started.len() + 1);
        state.started.push(request);
        Ok(Run { run_id })
    }
}
