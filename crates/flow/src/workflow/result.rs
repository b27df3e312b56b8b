//! Activity outcomes as seen by a workflow handler

use tokio::sync::oneshot;

/// `failure_type` values delivered for terminal activity events
pub mod failure_type {
    pub const SCHEDULE_ACTIVITY_TASK_FAILED: &str = "ScheduleActivityTaskFailed";
    pub const ACTIVITY_TASK_CANCELED: &str = "ActivityTaskCanceled";
    pub const ACTIVITY_TASK_TIMED_OUT: &str = "ActivityTaskTimedOut";
    pub const ACTIVITY_TASK_FAILED: &str = "ActivityTaskFailed";
}

/// Outcome of one activity
///
/// Exactly one of `result` (on completion) or `failure_type` (on any other
/// terminal event) describes the outcome. `failure_cause` carries the
/// event's `details` or, for a rejected schedule, its `cause`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskResult {
    pub result: Option<String>,
    pub failure_type: Option<String>,
    pub failure_cause: Option<String>,
    /// `reason` of an `ActivityTaskFailed` event
    pub failure_reason: Option<String>,
}

impl TaskResult {
    pub fn completed(result: Option<String>) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }

    pub fn failure(failure_type: &str, cause: Option<String>) -> Self {
        Self {
            failure_type: Some(failure_type.to_string()),
            failure_cause: cause,
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.failure_reason = reason;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.failure_type.is_some()
    }
}

/// Single-shot carrier for an activity outcome
///
/// The channel holds at most one value. A channel that is closed without a
/// value means the outcome is not in history yet; the handler must return
/// from the current replay pass when it sees that.
///
/// ```
/// # use sws_flow::workflow::WorkflowContext;
/// # use sws_flow::workflow::ActivityTask;
/// fn handler(ctx: &mut WorkflowContext) {
///     let mut channel = ctx.go(&ActivityTask::new("getnum", "1"), "hello1");
///     let Some(outcome) = channel.recv() else {
///         return; // pending
///     };
///     ctx.complete(outcome.result.unwrap_or_default());
/// }
/// ```
#[derive(Debug)]
pub struct ResultChannel {
    activity_id: String,
    rx: oneshot::Receiver<TaskResult>,
}

impl ResultChannel {
    /// A channel already carrying `result`
    pub(crate) fn ready(activity_id: String, result: TaskResult) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so the send cannot fail
        let _ = tx.send(result);
        Self { activity_id, rx }
    }

    /// A channel closed without a value
    pub(crate) fn pending(activity_id: String) -> Self {
        let (_, rx) = oneshot::channel();
        Self { activity_id, rx }
    }

    /// Synthetic id of the activity this channel reports on
    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// Take the outcome; `None` if pending or already taken
    pub fn recv(&mut self) -> Option<TaskResult> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_channel_delivers_once() {
        let mut channel = ResultChannel::ready(
            "activityId-0".to_string(),
            TaskResult::completed(Some("42".to_string())),
        );

        assert_eq!(channel.activity_id(), "activityId-0");
        assert_eq!(
            channel.recv(),
            Some(TaskResult::completed(Some("42".to_string())))
        );
        assert_eq!(channel.recv(), None);
    }

    #[test]
    fn test_pending_channel_is_closed_without_value() {
        let mut channel = ResultChannel::pending("activityId-1".to_string());
        assert_eq!(channel.recv(), None);
        assert_eq!(channel.recv(), None);
    }

    #[test]
    fn test_failure_result() {
        let result = TaskResult::failure(
            failure_type::ACTIVITY_TASK_FAILED,
            Some("stack".to_string()),
        )
        .with_reason(Some("boom".to_string()));

        assert!(result.is_failure());
        assert_eq!(result.result, None);
        assert_eq!(result.failure_cause.as_deref(), Some("stack"));
        assert_eq!(result.failure_reason.as_deref(), Some("boom"));
        assert!(!TaskResult::completed(None).is_failure());
    }
}
