//! Wire model for the JSON envelope
//!
//! This module contains:
//! - [`common`] - workflow/activity types, task lists, executions
//! - [`history`] - [`HistoryEvent`] and its attribute payloads
//! - [`decision`] - [`Decision`] and its attribute payloads
//! - [`requests`] - typed request/response bodies implementing [`SwsRequest`]

pub mod common;
pub mod decision;
pub mod history;
pub mod requests;

pub use common::{ActivityType, TaskList, WorkflowExecution, WorkflowType};
pub use decision::{Decision, DecisionType, ScheduleActivityTaskDecisionAttributes};
pub use history::{EventType, HistoryEvent};
pub use requests::{
    ActivityTaskStatus, EmptyResponse, PollForActivityTaskRequest, PollForActivityTaskResponse,
    PollForDecisionTaskRequest, PollForDecisionTaskResponse, RecordActivityTaskHeartbeatRequest,
    RespondActivityTaskCanceledRequest, RespondActivityTaskCompletedRequest,
    RespondActivityTaskFailedRequest, RespondDecisionTaskCompletedRequest, Run,
    StartWorkflowExecutionRequest, SwsRequest,
};
