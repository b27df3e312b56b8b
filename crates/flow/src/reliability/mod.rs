//! Reliability patterns shared by both runtimes
//!
//! This module provides:
//! - [`RetryPolicy`] - Quadratic backoff used for polls, pagination and terminal acknowledgements
//! - [`AcknowledgementExhausted`] - Fatal panic payload once a terminal acknowledgement gives up

mod exhausted;
mod retry;

pub(crate) use exhausted::{abort, escalate, ExhaustionLatch};
pub use exhausted::AcknowledgementExhausted;
pub use retry::RetryPolicy;
