//! Activity runtime
//!
//! This module provides:
//! - [`ActivityWorker`] - poll loop dispatching activity tasks to handlers
//! - [`ActivityContext`] - per-invocation state, progress and cancellation
//! - [`ActivityHandler`] - trait implemented by activity code
//!
//! Each dispatched task gets its own heartbeat loop. The loop sends only the
//! most recent progress value per tick and turns a `cancelRequested` reply
//! into a cancellation visible through the context. It stops as soon as a
//! terminal acknowledgement begins or the context is dropped.

mod context;
mod definition;
mod heartbeat;
mod worker;

pub use context::ActivityContext;
pub use definition::ActivityHandler;
pub use worker::{ActivityWorker, ActivityWorkerError};
