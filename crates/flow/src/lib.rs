//! # SWS Flow
//!
//! Client-side workflow coordination for Simple Workflow Service (SWS).
//! Long-running, fault-tolerant workflows are written as ordinary code while
//! the durable state machine lives on the service.
//!
//! ## Features
//!
//! - **Deterministic replay**: workflow handlers are re-run against the full
//!   event history of each decision task
//! - **Activity fan-out**: every `go` call returns a single-shot result channel
//! - **Admission control**: a worker pool couples polling to capacity
//! - **Heartbeats and cancellation**: latest-wins progress and service-side
//!   cancel requests for long activities
//! - **Retries**: quadratic backoff for history pages and acknowledgements
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────┐
//! │         Decider          │        │      ActivityWorker      │
//! │ poll ─► history pages ─► │        │ poll ─► handler ─► ack   │
//! │ replay ─► decisions      │        │      └─► heartbeat loop  │
//! └────────────┬─────────────┘        └────────────┬─────────────┘
//!              │          WorkerPool / RetryPolicy │
//!              ▼                                   ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SwsTransport                          │
//! │        (HttpTransport: JSON 1.0 envelope over reqwest)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use sws_flow::prelude::*;
//!
//! fn sum(ctx: &mut WorkflowContext) {
//!     let task = ActivityTask::new("getnum", "1");
//!     let mut channels: Vec<_> = ctx
//!         .input()
//!         .unwrap_or_default()
//!         .split(',')
//!         .map(str::to_string)
//!         .collect::<Vec<_>>()
//!         .into_iter()
//!         .map(|item| ctx.go(&task, item))
//!         .collect();
//!
//!     let mut total = 0;
//!     for channel in &mut channels {
//!         let Some(outcome) = channel.recv() else { return };
//!         total += outcome.result.and_then(|r| r.parse::<i64>().ok()).unwrap_or(0);
//!     }
//!     ctx.complete(total.to_string());
//! }
//!
//! let transport = Arc::new(HttpTransport::new("us-east-1")?);
//! let mut decider = Decider::new(WorkerConfig::from_env(), transport)?;
//! decider.register(WorkflowType::new("sum", "1"), sum);
//! decider.start().await?;
//! ```

pub mod activity;
pub mod client;
pub mod config;
pub mod decider;
pub mod identity;
pub mod model;
pub mod registry;
pub mod reliability;
pub mod transport;
pub mod worker;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activity::{ActivityContext, ActivityHandler, ActivityWorker};
    pub use crate::client::{StartOptions, WorkflowStarter};
    pub use crate::config::WorkerConfig;
    pub use crate::decider::Decider;
    pub use crate::model::{ActivityType, WorkflowType};
    pub use crate::reliability::{AcknowledgementExhausted, RetryPolicy};
    pub use crate::transport::{HttpTransport, InMemoryTransport, SwsTransport};
    pub use crate::workflow::{ActivityTask, TaskResult, WorkflowContext, WorkflowHandler};
}

// Re-export key types at crate root
pub use activity::{ActivityContext, ActivityHandler, ActivityWorker, ActivityWorkerError};
pub use client::{StartOptions, WorkflowStarter};
pub use config::{ConfigError, WorkerConfig};
pub use decider::{Decider, DeciderError, DecisionTask};
pub use model::{ActivityType, WorkflowType};
pub use registry::RegistryError;
pub use reliability::{AcknowledgementExhausted, RetryPolicy};
pub use transport::{HttpTransport, InMemoryTransport, SwsTransport, TransportError};
pub use worker::{WorkerPool, WorkerPoolError};
pub use workflow::{ActivityTask, ResultChannel, TaskResult, WorkflowContext, WorkflowHandler};
