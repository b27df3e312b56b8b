//! Activity execution context

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::heartbeat;
use crate::model::{
    ActivityType, PollForActivityTaskResponse, RespondActivityTaskCanceledRequest,
    RespondActivityTaskCompletedRequest, RespondActivityTaskFailedRequest, WorkflowExecution,
};
use crate::reliability::{AcknowledgementExhausted, RetryPolicy};
use crate::transport::{SwsTransport, TransportError};
use crate::worker::PoolSlot;

/// Context owned by one activity invocation
///
/// The context provides:
/// - The task's input and identifiers
/// - Progress reporting picked up by the heartbeat loop
/// - Cancellation requested by the service
/// - The terminal acknowledgements, exactly one of which should be called
///
/// # Example
///
/// ```ignore
/// async fn resize(ctx: ActivityContext) {
///     for (i, image) in images(ctx.input()).enumerate() {
///         if ctx.is_cancel_requested() {
///             return ctx.successfully_cancel(format!("stopped at {i}")).await;
///         }
///         resize_one(image).await;
///         ctx.heartbeat(format!("{i} done"));
///     }
///     ctx.completed("ok").await;
/// }
/// ```
pub struct ActivityContext {
    task_token: String,
    activity_id: String,
    activity_type: Option<ActivityType>,
    input: Option<String>,
    workflow_execution: Option<WorkflowExecution>,

    progress: watch::Sender<Option<String>>,
    cancel: CancellationToken,
    heartbeat_stop: CancellationToken,

    transport: Arc<dyn SwsTransport>,
    retry: RetryPolicy,
    acknowledged: bool,
    _slot: Option<PoolSlot<()>>,
}

impl ActivityContext {
    /// Create a context for a polled task, without a heartbeat loop
    pub fn new(task: PollForActivityTaskResponse, transport: Arc<dyn SwsTransport>) -> Self {
        let (progress, _) = watch::channel(None);

        Self {
            task_token: task.task_token.unwrap_or_default(),
            activity_id: task.activity_id.unwrap_or_default(),
            activity_type: task.activity_type,
            input: task.input,
            workflow_execution: task.workflow_execution,
            progress,
            cancel: CancellationToken::new(),
            heartbeat_stop: CancellationToken::new(),
            transport,
            retry: RetryPolicy::acknowledgement(),
            acknowledged: false,
            _slot: None,
        }
    }

    /// Set the retry policy for terminal acknowledgements
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Hold a pool slot until the context is dropped
    pub(crate) fn with_slot(mut self, slot: PoolSlot<()>) -> Self {
        self._slot = Some(slot);
        self
    }

    /// Start heartbeating every `interval` until a terminal call or drop
    pub fn start_heartbeat(self, interval: Duration) -> Self {
        heartbeat::spawn(
            Arc::clone(&self.transport),
            self.task_token.clone(),
            interval,
            self.progress.subscribe(),
            self.cancel.clone(),
            self.heartbeat_stop.clone(),
        );
        self
    }

    pub fn task_token(&self) -> &str {
        &self.task_token
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    pub fn activity_type(&self) -> Option<&ActivityType> {
        self.activity_type.as_ref()
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn workflow_execution(&self) -> Option<&WorkflowExecution> {
        self.workflow_execution.as_ref()
    }

    /// Publish progress for the next heartbeat
    ///
    /// Never blocks. Only the most recent value before a tick is sent.
    pub fn heartbeat(&self, progress: impl Into<String>) {
        self.progress.send_replace(Some(progress.into()));
    }

    /// Whether the service has asked for this activity to be canceled
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the service asks for cancellation
    pub async fn cancel_requested(&self) {
        self.cancel.cancelled().await
    }

    /// Token cancelled when the service asks for cancellation
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Report success
    ///
    /// # Panics
    ///
    /// Panics with an [`AcknowledgementExhausted`] payload when the
    /// acknowledgement still fails after the retry policy is exhausted.
    pub async fn completed(mut self, result: impl Into<String>) {
        let request = RespondActivityTaskCompletedRequest {
            task_token: self.task_token.clone(),
            result: Some(result.into()),
        };
        let transport = Arc::clone(&self.transport);
        self.acknowledge("RespondActivityTaskCompleted", || {
            let transport = Arc::clone(&transport);
            let request = request.clone();
            async move { transport.respond_activity_task_completed(request).await }
        })
        .await;
    }

    /// Report failure
    ///
    /// # Panics
    ///
    /// Panics when the acknowledgement still fails after the retry policy is
    /// exhausted.
    pub async fn failed(mut self, reason: impl Into<String>, details: impl Into<String>) {
        let request = RespondActivityTaskFailedRequest {
            task_token: self.task_token.clone(),
            reason: Some(reason.into()),
            details: Some(details.into()),
        };
        let transport = Arc::clone(&self.transport);
        self.acknowledge("RespondActivityTaskFailed", || {
            let transport = Arc::clone(&transport);
            let request = request.clone();
            async move { transport.respond_activity_task_failed(request).await }
        })
        .await;
    }

    /// Report that the activity honoured a cancel request
    ///
    /// # Panics
    ///
    /// Panics when the acknowledgement still fails after the retry policy is
    /// exhausted.
    pub async fn successfully_cancel(mut self, details: impl Into<String>) {
        let request = RespondActivityTaskCanceledRequest {
            task_token: self.task_token.clone(),
            details: Some(details.into()),
        };
        let transport = Arc::clone(&self.transport);
        self.acknowledge("RespondActivityTaskCanceled", || {
            let transport = Arc::clone(&transport);
            let request = request.clone();
            async move { transport.respond_activity_task_canceled(request).await }
        })
        .await;
    }

    async fn acknowledge<F, Fut>(&mut self, action: &'static str, send: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), TransportError>>,
    {
        self.heartbeat_stop.cancel();
        self.acknowledged = true;

        if let Err(e) = self.retry.run(action, send).await {
            error!(
                activity_id = %self.activity_id,
                action,
                error = %e,
                "giving up on activity acknowledgement"
            );
            AcknowledgementExhausted::new(action, self.retry.max_attempts(), e).raise();
        }

        debug!(activity_id = %self.activity_id, action, "activity acknowledged");
    }
}

impl Drop for ActivityContext {
    fn drop(&mut self) {
        self.heartbeat_stop.cancel();
        if !self.acknowledged && !std::thread::panicking() {
            warn!(
                activity_id = %self.activity_id,
                "activity context dropped without acknowledgement, task will time out"
            );
        }
    }
}

impl std::fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityContext")
            .field("activity_id", &self.activity_id)
            .field("activity_type", &self.activity_type)
            .field("cancel_requested", &self.cancel.is_cancelled())
            .field("acknowledged", &self.acknowledged)
            .finish()
    }
}
