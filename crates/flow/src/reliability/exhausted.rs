//! Process-fatal acknowledgement failures

use std::any::Any;
use std::fmt;

use thiserror::Error;
use tokio::sync::watch;
use tracing::error;

/// Latest exhaustion seen by a runtime's spawned tasks
pub(crate) type ExhaustionLatch = watch::Sender<Option<AcknowledgementExhausted>>;

/// Panic payload raised when a terminal acknowledgement is given up on
///
/// A decision batch or activity outcome that never reaches the service is
/// lost silently, so both runtimes treat this as fatal: the payload is let
/// through the handler panic guard and `start()` re-raises it.
///
/// # Example
///
/// ```
/// use sws_flow::reliability::AcknowledgementExhausted;
///
/// let exhausted = AcknowledgementExhausted::new("RespondActivityTaskCompleted", 11, "timeout");
/// assert_eq!(
///     exhausted.to_string(),
///     "RespondActivityTaskCompleted failed after 11 attempts: timeout"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} failed after {attempts} attempts: {error}")]
pub struct AcknowledgementExhausted {
    /// Service action that was retried
    pub action: &'static str,
    /// Calls made, the first one included
    pub attempts: u32,
    /// Last error seen
    pub error: String,
}

impl AcknowledgementExhausted {
    pub fn new(action: &'static str, attempts: u32, error: impl fmt::Display) -> Self {
        Self {
            action,
            attempts,
            error: error.to_string(),
        }
    }

    /// Panic with this payload
    pub fn raise(self) -> ! {
        std::panic::panic_any(self)
    }

    /// Recover the payload from a caught panic
    pub fn from_panic(panic: &(dyn Any + Send)) -> Option<&Self> {
        panic.downcast_ref::<Self>()
    }
}

/// Record and re-raise an exhaustion panic; any other panic is handed back
pub(crate) fn escalate(
    latch: &ExhaustionLatch,
    panic: Box<dyn Any + Send>,
) -> Box<dyn Any + Send> {
    match panic.downcast::<AcknowledgementExhausted>() {
        Ok(exhausted) => {
            latch.send_replace(Some((*exhausted).clone()));
            std::panic::resume_unwind(exhausted)
        }
        Err(other) => other,
    }
}

/// Stop a runtime's poll loop for good
pub(crate) fn abort(identity: &str, exhausted: AcknowledgementExhausted) -> ! {
    error!(
        identity,
        action = exhausted.action,
        attempts = exhausted.attempts,
        error = %exhausted.error,
        "terminal acknowledgement exhausted, stopping"
    );
    exhausted.raise()
}
