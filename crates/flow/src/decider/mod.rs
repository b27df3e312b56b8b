//! Decider runtime
//!
//! This module provides:
//! - [`Decider`] - poll loop that replays workflow handlers
//! - [`DecisionTask`] - a decision task with its full, multi-page history
//!
//! # Flow
//!
//! 1. Acquire a pool slot (blocks while `max_workers` replays are in flight)
//! 2. `PollForDecisionTask`; an empty task token releases the slot
//! 3. Follow `nextPageToken` until the history is complete
//! 4. Reset the slot's [`WorkflowContext`](crate::workflow::WorkflowContext)
//!    and replay the registered handler on a spawned task
//! 5. Post `RespondDecisionTaskCompleted` and release the slot

mod history;
mod runtime;

pub use history::DecisionTask;
pub(crate) use runtime::panic_message;
pub use runtime::{Decider, DeciderError};
