//! Per-call activity configuration

use std::time::Duration;

use crate::model::{ActivityType, Decision, ScheduleActivityTaskDecisionAttributes, TaskList};

/// What to schedule on a [`WorkflowContext::go`](super::WorkflowContext::go) call
///
/// Timeouts are enforced by the service and sent in whole seconds. Unset
/// timeouts and task list are omitted so the registered defaults apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTask {
    pub activity_type: ActivityType,
    pub heartbeat_timeout: Option<Duration>,
    pub schedule_to_close_timeout: Option<Duration>,
    pub schedule_to_start_timeout: Option<Duration>,
    pub start_to_close_timeout: Option<Duration>,
    pub task_list: Option<String>,
    pub control: Option<String>,
}

impl ActivityTask {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            activity_type: ActivityType::new(name, version),
            heartbeat_timeout: None,
            schedule_to_close_timeout: None,
            schedule_to_start_timeout: None,
            start_to_close_timeout: None,
            task_list: None,
            control: None,
        }
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }

    pub fn with_schedule_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_schedule_to_start_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_start_timeout = Some(timeout);
        self
    }

    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = Some(timeout);
        self
    }

    /// Route the activity to a task list other than the workflow's default
    pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.task_list = Some(task_list.into());
        self
    }

    /// Opaque data echoed back in the scheduled event
    pub fn with_control(mut self, control: impl Into<String>) -> Self {
        self.control = Some(control.into());
        self
    }

    pub(crate) fn schedule_decision(&self, activity_id: String, input: String) -> Decision {
        let secs = |timeout: Option<Duration>| timeout.map(|d| d.as_secs());

        Decision::schedule_activity_task(ScheduleActivityTaskDecisionAttributes {
            activity_id,
            activity_type: self.activity_type.clone(),
            input: Some(input),
            control: self.control.clone(),
            heartbeat_timeout: secs(self.heartbeat_timeout),
            schedule_to_close_timeout: secs(self.schedule_to_close_timeout),
            schedule_to_start_timeout: secs(self.schedule_to_start_timeout),
            start_to_close_timeout: secs(self.start_to_close_timeout),
            task_list: self.task_list.as_deref().map(TaskList::new),
        })
    }
}
