//! Typed request and response bodies for the actions the helper uses
//!
//! Each request implements [`SwsRequest`], which names the JSON-envelope
//! target (`X-Amz-Target: SimpleWorkflowService.<TARGET>`) and the reply type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::common::{timeout_seconds, ActivityType, TaskList, WorkflowExecution, WorkflowType};
use super::decision::Decision;
use super::history::HistoryEvent;

/// A request body addressed to one service action
pub trait SwsRequest: Serialize + Send + Sync {
    /// Action name used in the `X-Amz-Target` header
    const TARGET: &'static str;

    /// Response body for this action
    type Response: DeserializeOwned + Send;
}

/// Response body for actions that return nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForDecisionTaskRequest {
    pub domain: String,
    pub task_list: TaskList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_order: Option<bool>,
}

/// One page of a decision task
///
/// An empty `task_token` means the long poll timed out without work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForDecisionTaskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_token: Option<String>,
    #[serde(default)]
    pub started_event_id: i64,
    #[serde(default)]
    pub previous_started_event_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution: Option<WorkflowExecution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<WorkflowType>,
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl PollForDecisionTaskResponse {
    /// The task token, if the poll returned work
    pub fn token(&self) -> Option<&str> {
        self.task_token.as_deref().filter(|t| !t.is_empty())
    }

    /// The page token for the next history page, if any
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl SwsRequest for PollForDecisionTaskRequest {
    const TARGET: &'static str = "PollForDecisionTask";
    type Response = PollForDecisionTaskResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForActivityTaskRequest {
    pub domain: String,
    pub task_list: TaskList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

/// An activity task; an empty `activity_id` means the long poll timed out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForActivityTaskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default)]
    pub started_event_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution: Option<WorkflowExecution>,
}

impl PollForActivityTaskResponse {
    /// Whether the poll returned a real task
    pub fn has_task(&self) -> bool {
        self.activity_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

impl SwsRequest for PollForActivityTaskRequest {
    const TARGET: &'static str = "PollForActivityTask";
    type Response = PollForActivityTaskResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondDecisionTaskCompletedRequest {
    pub task_token: String,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_context: Option<String>,
}

impl SwsRequest for RespondDecisionTaskCompletedRequest {
    const TARGET: &'static str = "RespondDecisionTaskCompleted";
    type Response = EmptyResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondActivityTaskCompletedRequest {
    pub task_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl SwsRequest for RespondActivityTaskCompletedRequest {
    const TARGET: &'static str = "RespondActivityTaskCompleted";
    type Response = EmptyResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondActivityTaskFailedRequest {
    pub task_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SwsRequest for RespondActivityTaskFailedRequest {
    const TARGET: &'static str = "RespondActivityTaskFailed";
    type Response = EmptyResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondActivityTaskCanceledRequest {
    pub task_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SwsRequest for RespondActivityTaskCanceledRequest {
    const TARGET: &'static str = "RespondActivityTaskCanceled";
    type Response = EmptyResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordActivityTaskHeartbeatRequest {
    pub task_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskStatus {
    #[serde(default)]
    pub cancel_requested: bool,
}

impl SwsRequest for RecordActivityTaskHeartbeatRequest {
    const TARGET: &'static str = "RecordActivityTaskHeartbeat";
    type Response = ActivityTaskStatus;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowExecutionRequest {
    pub domain: String,
    pub workflow_id: String,
    pub workflow_type: WorkflowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_list: Option<TaskList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub execution_start_to_close_timeout: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timeout_seconds"
    )]
    pub task_start_to_close_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_list: Vec<String>,
}

/// Identifies the run created by `StartWorkflowExecution`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: String,
}

impl SwsRequest for StartWorkflowExecutionRequest {
    const TARGET: &'static str = "StartWorkflowExecution";
    type Response = Run;
}
