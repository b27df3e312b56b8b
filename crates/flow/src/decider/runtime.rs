//! Decider poll loop

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::history::assemble;
use crate::config::{ConfigError, WorkerConfig};
use crate::model::{PollForDecisionTaskRequest, TaskList, WorkflowType};
use crate::registry::{registration_key, HandlerRegistry};
use crate::reliability::{abort, escalate, ExhaustionLatch};
use crate::transport::{SwsTransport, TransportError};
use crate::worker::{PoolSlot, WorkerPool, WorkerPoolError};
use crate::workflow::{WorkflowContext, WorkflowHandler};

/// Decider errors
#[derive(Debug, thiserror::Error)]
pub enum DeciderError {
    /// Invalid configuration
    #[error("invalid decider configuration: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool was closed
    #[error("worker pool error: {0}")]
    Pool(#[from] WorkerPoolError),

    /// Poll or history page request failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Long-polls for decision tasks and replays workflow handlers against them
///
/// # Example
///
/// ```ignore
/// use sws_flow::prelude::*;
///
/// let config = WorkerConfig::from_env().with_max_workers(8);
/// let mut decider = Decider::new(config, transport)?;
/// decider.register(WorkflowType::new("sum", "1"), sum_workflow);
///
/// let decider = Arc::new(decider);
/// tokio::spawn({
///     let decider = decider.clone();
///     async move { decider.start().await }
/// });
///
/// // ... later
/// decider.shutdown();
/// ```
pub struct Decider {
    config: WorkerConfig,
    identity: String,
    transport: Arc<dyn SwsTransport>,
    handlers: HandlerRegistry<dyn WorkflowHandler>,
    pool: WorkerPool<WorkflowContext>,
    shutdown_tx: watch::Sender<bool>,
    exhausted: Arc<ExhaustionLatch>,
}

impl Decider {
    /// Create a decider; fails if the polling target is incomplete
    pub fn new(
        config: WorkerConfig,
        transport: Arc<dyn SwsTransport>,
    ) -> Result<Self, DeciderError> {
        config.validate()?;

        let identity = config.resolved_identity();
        let pool = {
            let transport = Arc::clone(&transport);
            let region = config.region.clone();
            let retry = config.retry.clone();
            WorkerPool::new(config.max_workers, move || {
                WorkflowContext::new(Arc::clone(&transport), region.clone())
                    .with_retry_policy(retry.clone())
            })
        };
        let (shutdown_tx, _) = watch::channel(false);
        let (exhausted, _) = watch::channel(None);

        Ok(Self {
            config,
            identity,
            transport,
            handlers: HandlerRegistry::new(),
            pool,
            shutdown_tx,
            exhausted: Arc::new(exhausted),
        })
    }

    /// Register the handler for a workflow type
    pub fn register(&mut self, workflow_type: WorkflowType, handler: impl WorkflowHandler) {
        info!(
            workflow_type = %registration_key(&workflow_type.name, &workflow_type.version),
            "registered workflow handler"
        );
        self.handlers
            .register(&workflow_type.name, &workflow_type.version, Arc::new(handler));
    }

    /// Identity sent with every poll
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Poll until [`shutdown`](Self::shutdown) is called
    ///
    /// Poll failures are logged and followed by `poll_error_backoff`.
    ///
    /// # Panics
    ///
    /// Re-raises the [`AcknowledgementExhausted`](crate::AcknowledgementExhausted)
    /// payload when a decision batch is given up on. Polling stops first.
    pub async fn start(&self) -> Result<(), DeciderError> {
        info!(
            domain = %self.config.domain,
            task_list = %self.config.task_list,
            identity = %self.identity,
            max_workers = self.config.max_workers,
            "starting decider"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut exhausted_rx = self.exhausted.subscribe();
        loop {
            let exhausted = exhausted_rx.borrow_and_update().clone();
            if let Some(exhausted) = exhausted {
                self.pool.close();
                abort(&self.identity, exhausted);
            }
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            let result = tokio::select! {
                result = self.poll_once() => result,
                _ = exhausted_rx.changed() => continue,
                _ = shutdown_rx.changed() => break,
            };

            match result {
                Ok(_) => {}
                Err(DeciderError::Pool(WorkerPoolError::Closed)) => break,
                Err(e) => {
                    warn!(error = %e, "decision poll failed");
                    tokio::time::sleep(self.config.poll_error_backoff).await;
                }
            }
        }

        info!(identity = %self.identity, "decider stopped");
        Ok(())
    }

    /// Run one iteration of the poll loop
    ///
    /// Waits for a pool slot, polls, assembles the history and spawns the
    /// replay. Returns `None` when the long poll timed out without a task.
    /// The replay handle resolves with a panic only when the decision batch
    /// could not be posted.
    ///
    /// # Panics
    ///
    /// Panics if the task's workflow type has no registered handler.
    #[instrument(skip(self), fields(task_list = %self.config.task_list))]
    pub async fn poll_once(&self) -> Result<Option<JoinHandle<()>>, DeciderError> {
        let mut slot = self.pool.acquire().await?;

        let request = PollForDecisionTaskRequest {
            domain: self.config.domain.clone(),
            task_list: TaskList::new(&self.config.task_list),
            identity: Some(self.identity.clone()),
            next_page_token: None,
            maximum_page_size: None,
            reverse_order: None,
        };

        let first = self.transport.poll_for_decision_task(request.clone()).await?;
        let Some(task) =
            assemble(self.transport.as_ref(), &request, first, &self.config.retry).await?
        else {
            debug!("decision poll returned no task");
            return Ok(None);
        };

        let key = task
            .workflow_type
            .as_ref()
            .map(|t| registration_key(&t.name, &t.version))
            .unwrap_or_default();
        let handler = match &task.workflow_type {
            Some(t) => self.handlers.lookup(&t.name, &t.version).ok(),
            None => None,
        };
        let Some(handler) = handler else {
            error!(workflow_type = %key, "no workflow handler registered");
            panic!("no workflow handler registered for {key}");
        };

        debug!(
            workflow_id = task.workflow_id(),
            workflow_type = %key,
            events = task.events.len(),
            "dispatching decision task"
        );

        slot.reset(task);
        Ok(Some(tokio::spawn(replay(
            handler,
            slot,
            Arc::clone(&self.exhausted),
        ))))
    }

    /// Stop polling; replays already in flight run to completion
    pub fn shutdown(&self) {
        info!(identity = %self.identity, "decider shutdown requested");
        self.shutdown_tx.send_replace(true);
        self.pool.close();
    }

    /// Decision replays currently in flight
    pub fn in_flight(&self) -> usize {
        self.pool.active()
    }
}

impl std::fmt::Debug for Decider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decider")
            .field("domain", &self.config.domain)
            .field("task_list", &self.config.task_list)
            .field("identity", &self.identity)
            .field("handlers", &self.handlers)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Replay one decision task and post its batch
///
/// A panicking handler is logged and its task left unacknowledged; the
/// service re-dispatches it after the decision task timeout. An exhausted
/// decision post is latched for `start()` and re-raised.
async fn replay(
    handler: Arc<dyn WorkflowHandler>,
    mut slot: PoolSlot<WorkflowContext>,
    exhausted: Arc<ExhaustionLatch>,
) {
    let workflow_id = slot
        .workflow_execution()
        .map(|e| e.workflow_id.clone())
        .unwrap_or_default();

    let outcome = AssertUnwindSafe(handler.run(&mut slot)).catch_unwind().await;

    match outcome {
        Ok(()) => {
            if let Err(panic) = AssertUnwindSafe(slot.decide()).catch_unwind().await {
                std::panic::resume_unwind(escalate(&exhausted, panic));
            }
        }
        Err(panic) => {
            let panic = escalate(&exhausted, panic);
            error!(
                workflow_id = %workflow_id,
                panic = panic_message(panic.as_ref()),
                "workflow handler panicked, decision task left unacknowledged"
            );
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
