//! Admission control shared by both runtimes
//!
//! This module provides:
//! - [`WorkerPool`] - bounded pool of reusable per-task contexts
//! - [`PoolSlot`] - admission ticket that returns its context on drop
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                  poll loop                         │
//! │   acquire() ──blocks while all slots are busy──┐   │
//! │        │                                       │   │
//! │        ▼                                       │   │
//! │   long poll ──► spawn(task, slot) ──► drop ────┘   │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Blocking on `acquire()` before polling couples intake to capacity: while
//! every slot is busy the runtime stops long-polling, so the service keeps
//! the task for another worker.

mod pool;

pub use pool::{PoolSlot, WorkerPool, WorkerPoolError};
