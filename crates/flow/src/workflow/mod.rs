//! Workflow façade for deterministic replay
//!
//! This module provides:
//! - [`WorkflowContext`] - replay state and the primitives a handler calls
//! - [`WorkflowHandler`] - trait implemented by workflow code
//! - [`ActivityTask`] - per-call activity configuration
//! - [`ResultChannel`] / [`TaskResult`] - single-shot activity outcomes
//!
//! # Replay model
//!
//! ```text
//! history ──► HistoryIndex ──┐
//!                            ▼
//!   handler ── go() #0 ──► activityId-0 ──► Unscheduled ─► ScheduleActivityTask
//!           ── go() #1 ──► activityId-1 ──► Pending     ─► closed channel
//!           ── go() #2 ──► activityId-2 ──► Finished    ─► channel with outcome
//!                            │
//!                            ▼
//!                       decide() ──► RespondDecisionTaskCompleted
//! ```
//!
//! The n-th `go` call of every replay addresses `activityId-{n}`, so the
//! same history prefix always yields the same decision batch.

mod context;
mod definition;
mod replay;
mod result;
mod task;

pub use context::WorkflowContext;
pub use definition::WorkflowHandler;
pub use result::{failure_type, ResultChannel, TaskResult};
pub use task::ActivityTask;
