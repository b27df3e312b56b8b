//! Workflow context: the façade a handler replays against

use std::sync::Arc;

use tracing::{debug, error, info};

use super::replay::{ActivityState, HistoryIndex};
use super::result::ResultChannel;
use super::task::ActivityTask;
use crate::decider::DecisionTask;
use crate::model::{
    Decision, EventType, HistoryEvent, RespondDecisionTaskCompletedRequest, WorkflowExecution,
    WorkflowType,
};
use crate::reliability::{AcknowledgementExhausted, RetryPolicy};
use crate::transport::SwsTransport;

/// Per-execution replay state handed to a [`WorkflowHandler`](super::WorkflowHandler)
///
/// The handler is re-run from the top for every decision task of an
/// execution. It observes earlier progress only through the history, so it
/// must call [`go`](Self::go) in the same order on every replay and must not
/// read clocks, random numbers or external state outside activities.
///
/// Contexts are pooled: the decider creates one per pool slot and
/// [`reset`](Self::reset)s it for each decision task.
///
/// # Example
///
/// ```
/// use sws_flow::workflow::{ActivityTask, WorkflowContext};
///
/// fn fan_out(ctx: &mut WorkflowContext) {
///     let task = ActivityTask::new("getnum", "1");
///     let mut channels: Vec<_> = ["a", "b", "c"].iter().map(|i| ctx.go(&task, *i)).collect();
///
///     let mut total = 0;
///     for channel in &mut channels {
///         let Some(outcome) = channel.recv() else {
///             return;
///         };
///         total += outcome.result.and_then(|r| r.parse::<i64>().ok()).unwrap_or(0);
///     }
///     ctx.complete(total.to_string());
/// }
/// ```
pub struct WorkflowContext {
    transport: Arc<dyn SwsTransport>,
    region: String,
    retry: RetryPolicy,

    task_token: String,
    workflow_type: Option<WorkflowType>,
    workflow_execution: Option<WorkflowExecution>,
    history: Vec<HistoryEvent>,
    index: HistoryIndex,

    decisions: Vec<Decision>,
    next_activity_ordinal: u64,
    decided: bool,
}

impl WorkflowContext {
    /// Create an empty context bound to a transport
    pub fn new(transport: Arc<dyn SwsTransport>, region: impl Into<String>) -> Self {
        Self {
            transport,
            region: region.into(),
            retry: RetryPolicy::acknowledgement(),
            task_token: String::new(),
            workflow_type: None,
            workflow_execution: None,
            history: Vec::new(),
            index: HistoryIndex::default(),
            decisions: Vec::new(),
            next_activity_ordinal: 0,
            decided: false,
        }
    }

    /// Set the retry policy used by [`decide`](Self::decide)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Prepare the context for a new decision task
    pub fn reset(&mut self, task: DecisionTask) {
        self.index = HistoryIndex::build(&task.events);
        self.history = task.events;
        self.task_token = task.task_token;
        self.workflow_type = task.workflow_type;
        self.workflow_execution = task.workflow_execution;
        self.decisions.clear();
        self.next_activity_ordinal = 0;
        self.decided = false;
    }

    /// Schedule an activity, or pick up its outcome from history
    ///
    /// Each call takes the next synthetic id `activityId-{n}`. The returned
    /// channel carries the outcome if history has a terminal event for it,
    /// and is closed without a value otherwise. An activity that was never
    /// scheduled gets a `ScheduleActivityTask` decision.
    pub fn go(&mut self, task: &ActivityTask, input: impl Into<String>) -> ResultChannel {
        let activity_id = format!("activityId-{}", self.next_activity_ordinal);
        self.next_activity_ordinal += 1;

        match self.index.lookup(&self.history, &activity_id) {
            ActivityState::Unscheduled => {
                debug!(
                    activity_id = %activity_id,
                    activity_type = %task.activity_type.name,
                    "scheduling activity"
                );
                self.decisions
                    .push(task.schedule_decision(activity_id.clone(), input.into()));
                ResultChannel::pending(activity_id)
            }
            ActivityState::Pending => ResultChannel::pending(activity_id),
            ActivityState::Finished(result) => ResultChannel::ready(activity_id, result),
        }
    }

    /// Append a `CompleteWorkflowExecution` decision
    pub fn complete(&mut self, result: impl Into<String>) {
        self.decisions
            .push(Decision::complete_workflow_execution(Some(result.into())));
    }

    /// Append a `FailWorkflowExecution` decision
    pub fn fail(&mut self, reason: impl Into<String>, details: impl Into<String>) {
        self.decisions.push(Decision::fail_workflow_execution(
            Some(reason.into()),
            Some(details.into()),
        ));
    }

    /// Append a `CancelWorkflowExecution` decision
    pub fn cancel_workflow(&mut self, details: Option<String>) {
        self.decisions
            .push(Decision::cancel_workflow_execution(details));
    }

    pub fn record_marker(&mut self, marker_name: impl Into<String>, details: Option<String>) {
        self.decisions
            .push(Decision::record_marker(marker_name, details));
    }

    /// Start a timer unless history already shows it; returns whether it fired
    pub fn start_timer(&mut self, timer_id: &str, seconds: u64) -> bool {
        if self.index.timer_fired(timer_id) {
            return true;
        }
        if !self.index.timer_started(timer_id) {
            self.decisions
                .push(Decision::start_timer(timer_id, seconds, None));
        }
        false
    }

    /// Cancel a started timer that has not fired or been canceled
    pub fn cancel_timer(&mut self, timer_id: &str) {
        if self.index.timer_started(timer_id) && !self.index.timer_closed(timer_id) {
            self.decisions.push(Decision::cancel_timer(timer_id));
        }
    }

    /// Ask the service to cancel a pending activity
    ///
    /// Only emitted while the activity is scheduled without an outcome and no
    /// cancel request for it is in history yet.
    pub fn request_cancel_activity(&mut self, activity_id: &str) {
        let pending = self.index.lookup(&self.history, activity_id) == ActivityState::Pending;
        if pending && !self.index.is_cancel_requested(activity_id) {
            self.decisions
                .push(Decision::request_cancel_activity_task(activity_id));
        }
    }

    /// Whether a `WorkflowExecutionCancelRequested` event is in history
    pub fn is_cancel_requested(&self) -> bool {
        self.history
            .iter()
            .any(|e| e.event_type == EventType::WorkflowExecutionCancelRequested)
    }

    /// Input the execution was started with
    pub fn input(&self) -> Option<&str> {
        self.history
            .iter()
            .find_map(|e| e.workflow_execution_started_event_attributes.as_ref())
            .and_then(|a| a.input.as_deref())
    }

    /// `(signalName, input)` of every signal received, in history order
    pub fn signals(&self) -> Vec<(&str, Option<&str>)> {
        self.history
            .iter()
            .filter_map(|e| e.workflow_execution_signaled_event_attributes.as_ref())
            .map(|a| (a.signal_name.as_str(), a.input.as_deref()))
            .collect()
    }

    pub fn history(&self) -> &[HistoryEvent] {
        &self.history
    }

    /// Decisions produced so far in this replay pass
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn task_token(&self) -> &str {
        &self.task_token
    }

    pub fn workflow_type(&self) -> Option<&WorkflowType> {
        self.workflow_type.as_ref()
    }

    pub fn workflow_execution(&self) -> Option<&WorkflowExecution> {
        self.workflow_execution.as_ref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Whether the decision batch for this task has been posted
    pub fn is_decided(&self) -> bool {
        self.decided
    }

    /// Post the decision batch for the current task
    ///
    /// Calling it again for the same task does nothing. The decider calls it
    /// after the handler returns if the handler did not.
    ///
    /// # Panics
    ///
    /// Panics with an [`AcknowledgementExhausted`] payload when the post still
    /// fails after the retry policy is exhausted. A dropped batch would make
    /// the next replay repeat every schedule decision in it, so the decider
    /// re-raises this panic out of [`Decider::start`](crate::Decider::start).
    pub async fn decide(&mut self) {
        if self.decided {
            return;
        }
        self.decided = true;

        let request = RespondDecisionTaskCompletedRequest {
            task_token: self.task_token.clone(),
            decisions: self.decisions.clone(),
            execution_context: None,
        };
        let workflow_id = self
            .workflow_execution
            .as_ref()
            .map(|e| e.workflow_id.as_str())
            .unwrap_or_default();

        let transport = &self.transport;
        let result = self
            .retry
            .run("RespondDecisionTaskCompleted", || {
                transport.respond_decision_task_completed(request.clone())
            })
            .await;

        match result {
            Ok(()) => {
                info!(
                    workflow_id,
                    decisions = request.decisions.len(),
                    "decision batch posted"
                );
            }
            Err(e) => {
                error!(workflow_id, error = %e, "giving up on decision batch");
                AcknowledgementExhausted::new(
                    "RespondDecisionTaskCompleted",
                    self.retry.max_attempts(),
                    e,
                )
                .raise();
            }
        }
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("task_token", &self.task_token)
            .field("workflow_execution", &self.workflow_execution)
            .field("history_len", &self.history.len())
            .field("decisions", &self.decisions.len())
            .field("next_activity_ordinal", &self.next_activity_ordinal)
            .field("decided", &self.decided)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityType, DecisionType};
    use futures::FutureExt;
    use std::panic::AssertUnwindSafe;
    use crate::transport::InMemoryTransport;

    fn context(events: Vec<HistoryEvent>) -> (Arc<InMemoryTransport>, WorkflowContext) {
        let transport = Arc::new(InMemoryTransport::new());
        let mut ctx = WorkflowContext::new(transport.clone(), "us-east-1");
        ctx.reset(DecisionTask::new("token-1", events));
        (transport, ctx)
    }

    #[test]
    fn test_ordinals_restart_on_reset() {
        let (_, mut ctx) = context(vec![HistoryEvent::workflow_started(1, None)]);
        let task = ActivityTask::new("getnum", "1");

        assert_eq!(ctx.go(&task, "a").activity_id(), "activityId-0");
        assert_eq!(ctx.go(&task, "b").activity_id(), "activityId-1");

        ctx.reset(DecisionTask::new("token-2", vec![]));
        assert_eq!(ctx.go(&task, "a").activity_id(), "activityId-0");
        assert_eq!(ctx.decisions().len(), 1);
        assert_eq!(ctx.task_token(), "token-2");
    }

    #[test]
    fn test_history_accessors() {
        let (_, ctx) = context(vec![
            HistoryEvent::workflow_started(1, Some("1,2,3".into())),
            HistoryEvent::signaled(4, "pause", None),
            HistoryEvent::signaled(7, "resume", Some("now".into())),
        ]);

        assert_eq!(ctx.input(), Some("1,2,3"));
        assert_eq!(ctx.signals(), vec![("pause", None), ("resume", Some("now"))]);
        assert!(!ctx.is_cancel_requested());
        assert_eq!(ctx.region(), "us-east-1");
    }

    #[test]
    fn test_cancel_requested() {
        let (_, ctx) = context(vec![
            HistoryEvent::workflow_started(1, None),
            HistoryEvent::workflow_cancel_requested(6),
        ]);
        assert!(ctx.is_cancel_requested());
    }

    #[test]
    fn test_timer_lifecycle() {
        let (_, mut ctx) = context(vec![HistoryEvent::workflow_started(1, None)]);
        assert!(!ctx.start_timer("wait", 30));
        assert_eq!(ctx.decisions()[0].decision_type, DecisionType::StartTimer);

        let (_, mut ctx) = context(vec![HistoryEvent::timer_started(5, "wait", 30)]);
        assert!(!ctx.start_timer("wait", 30));
        assert!(ctx.decisions().is_empty());
        ctx.cancel_timer("wait");
        assert_eq!(ctx.decisions()[0].decision_type, DecisionType::CancelTimer);

        let (_, mut ctx) = context(vec![
            HistoryEvent::timer_started(5, "wait", 30),
            HistoryEvent::timer_fired(9, "wait", 5),
        ]);
        assert!(ctx.start_timer("wait", 30));
        ctx.cancel_timer("wait");
        assert!(ctx.decisions().is_empty());
    }

    #[test]
    fn test_request_cancel_activity() {
        let getnum = ActivityType::new("getnum", "1");
        let (_, mut ctx) = context(vec![
            HistoryEvent::activity_scheduled(5, "activityId-0", getnum.clone(), None),
            HistoryEvent::activity_scheduled(6, "activityId-1", getnum.clone(), None),
            HistoryEvent::activity_completed(8, 6, "done"),
            HistoryEvent::activity_scheduled(9, "activityId-2", getnum, None),
            HistoryEvent::activity_cancel_requested(10, "activityId-2"),
        ]);

        ctx.request_cancel_activity("activityId-0");
        ctx.request_cancel_activity("activityId-1");
        ctx.request_cancel_activity("activityId-2");
        ctx.request_cancel_activity("activityId-9");

        assert_eq!(
            ctx.decisions(),
            &[Decision::request_cancel_activity_task("activityId-0")]
        );
    }

    #[tokio::test]
    async fn test_decide_posts_once() {
        let (transport, mut ctx) = context(vec![HistoryEvent::workflow_started(1, None)]);
        ctx.complete("done");

        ctx.decide().await;
        ctx.decide().await;

        let responses = transport.decision_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].task_token, "token-1");
        assert_eq!(
            responses[0].decisions,
            vec![Decision::complete_workflow_execution(Some("done".into()))]
        );
        assert!(ctx.is_decided());
    }

    #[tokio::test(start_paused = true)]
    async fn test_decide_retries_transient_errors() {
        let (transport, mut ctx) = context(vec![]);
        transport.fail_next::<RespondDecisionTaskCompletedRequest>(10);

        ctx.decide().await;
        assert_eq!(transport.decision_responses().len(), 1);
        assert_eq!(
            transport.call_count::<RespondDecisionTaskCompletedRequest>(),
            11
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_decide_panics_when_exhausted() {
        let (transport, mut ctx) = context(vec![]);
        transport.fail_next::<RespondDecisionTaskCompletedRequest>(11);

        let panic = AssertUnwindSafe(ctx.decide())
            .catch_unwind()
            .await
            .unwrap_err();
        let exhausted = panic.downcast::<AcknowledgementExhausted>().unwrap();

        assert_eq!(exhausted.action, "RespondDecisionTaskCompleted");
        assert_eq!(exhausted.attempts, 11);
        assert!(exhausted
            .to_string()
            .starts_with("RespondDecisionTaskCompleted failed after 11 attempts"));
        assert!(transport.decision_responses().is_empty());
    }
}
