//! Activity worker poll loop

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::{ActivityContext, ActivityHandler};
use crate::config::{ConfigError, WorkerConfig};
use crate::decider::panic_message;
use crate::model::{ActivityType, PollForActivityTaskRequest, TaskList};
use crate::registry::{registration_key, HandlerRegistry};
use crate::reliability::{abort, escalate, ExhaustionLatch};
use crate::transport::{SwsTransport, TransportError};
use crate::worker::{WorkerPool, WorkerPoolError};

/// Activity worker errors
#[derive(Debug, thiserror::Error)]
pub enum ActivityWorkerError {
    #[error("invalid activity worker configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("worker pool error: {0}")]
    Pool(#[from] WorkerPoolError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Long-polls for activity tasks and runs the registered handlers
///
/// The poll loop returns to polling as soon as a task is dispatched, so one
/// loop drives many concurrent activities. `max_workers` bounds how many run
/// at once (0 = unbounded).
///
/// # Example
///
/// ```ignore
/// let mut worker = ActivityWorker::new(config, transport)?;
/// worker.register(ActivityType::new("getnum", "1"), getnum);
/// worker.start().await?;
/// ```
pub struct ActivityWorker {
    config: WorkerConfig,
    identity: String,
    transport: Arc<dyn SwsTransport>,
    handlers: HandlerRegistry<dyn ActivityHandler>,
    pool: WorkerPool<()>,
    shutdown_tx: watch::Sender<bool>,
    exhausted: Arc<ExhaustionLatch>,
}

impl ActivityWorker {
    /// Create a worker; fails if the polling target is incomplete
    pub fn new(
        config: WorkerConfig,
        transport: Arc<dyn SwsTransport>,
    ) -> Result<Self, ActivityWorkerError> {
        config.validate()?;

        let identity = config.resolved_identity();
        let pool = WorkerPool::new(config.max_workers, || ());
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

    /// Register the handler for an activity type
    pub fn register(&mut self, activity_type: ActivityType, handler: impl ActivityHandler) {
        info!(
            activity_type = %registration_key(&activity_type.name, &activity_type.version),
            "registered activity handler"
        );
        self.handlers
            .register(&activity_type.name, &activity_type.version, Arc::new(handler));
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Poll until [`shutdown`](Self::shutdown) is called
    ///
    /// # Panics
    ///
    /// Re-raises the [`AcknowledgementExhausted`](crate::AcknowledgementExhausted)
    /// payload when an activity's terminal acknowledgement is given up on.
    /// Polling stops first and no further tasks are taken.
    pub async fn start(&self) -> Result<(), ActivityWorkerError> {
        info!(
            domain = %self.config.domain,
            task_list = %self.config.task_list,
            identity = %self.identity,
            max_workers = self.config.max_workers,
            "starting activity worker"
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
                Err(ActivityWorkerError::Pool(WorkerPoolError::Closed)) => break,
                Err(e) => {
                    warn!(error = %e, "activity poll failed");
                    tokio::time::sleep(self.config.poll_error_backoff).await;
                }
            }
        }

        info!(identity = %self.identity, "activity worker stopped");
        Ok(())
    }

    /// Run one iteration of the poll loop
    ///
    /// Returns the spawned invocation, or `None` when the long poll timed
    /// out without a task. A handler panic is logged and the handle resolves
    /// normally; an exhausted acknowledgement resolves it with that panic.
    ///
    /// # Panics
    ///
    /// Panics if the task's activity type has no registered handler.
    #[instrument(skip(self), fields(task_list = %self.config.task_list))]
    pub async fn poll_once(&self) -> Result<Option<JoinHandle<()>>, ActivityWorkerError> {
        let slot = self.pool.acquire().await?;

        let request = PollForActivityTaskRequest {
            domain: self.config.domain.clone(),
            task_list: TaskList::new(&self.config.task_list),
            identity: Some(self.identity.clone()),
        };
        let task = self.transport.poll_for_activity_task(request).await?;
        if !task.has_task() {
            debug!("activity poll returned no task");
            return Ok(None);
        }

        let key = task
            .activity_type
            .as_ref()
            .map(|t| registration_key(&t.name, &t.version))
            .unwrap_or_default();
        let handler = match &task.activity_type {
            Some(t) => self.handlers.lookup(&t.name, &t.version).ok(),
            None => None,
        };
        let Some(handler) = handler else {
            error!(activity_type = %key, "no activity handler registered");
            panic!("no activity handler registered for {key}");
        };

        let ctx = ActivityContext::new(task, Arc::clone(&self.transport))
            .with_retry_policy(self.config.retry.clone())
            .with_slot(slot)
            .start_heartbeat(self.config.heartbeat_interval);

        debug!(
            activity_id = ctx.activity_id(),
            activity_type = %key,
            "dispatching activity task"
        );

        Ok(Some(tokio::spawn(invoke(
            handler,
            ctx,
            Arc::clone(&self.exhausted),
        ))))
    }

    /// Stop polling; running activities are not interrupted
    pub fn shutdown(&self) {
        info!(identity = %self.identity, "activity worker shutdown requested");
        self.shutdown_tx.send_replace(true);
        self.pool.close();
    }

    /// Activity invocations currently holding a pool slot
    pub fn in_flight(&self) -> usize {
        self.pool.active()
    }
}

impl std::fmt::Debug for ActivityWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityWorker")
            .field("domain", &self.config.domain)
            .field("task_list", &self.config.task_list)
            .field("identity", &self.identity)
            .field("handlers", &self.handlers)
            .field("pool", &self.pool)
            .finish()
    }
}

async fn invoke(
    handler: Arc<dyn ActivityHandler>,
    ctx: ActivityContext,
    exhausted: Arc<ExhaustionLatch>,
) {
    let activity_id = ctx.activity_id().to_string();

    if let Err(panic) = AssertUnwindSafe(handler.execute(ctx)).catch_unwind().await {
        let panic = escalate(&exhausted, panic);
        error!(
            activity_id = %activity_id,
            panic = panic_message(panic.as_ref()),
            "activity handler panicked"
        );
    }
}
