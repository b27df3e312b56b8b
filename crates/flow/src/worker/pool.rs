//! Worker pool of reusable contexts

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Worker pool errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerPoolError {
    /// The pool was closed while waiting for a slot
    #[error("worker pool is closed")]
    Closed,
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

struct PoolInner<T> {
    /// `None` when the pool is unbounded
    permits: Option<Arc<Semaphore>>,
    idle: Mutex<Vec<T>>,
    factory: Factory<T>,
    capacity: usize,
    active: AtomicUsize,
    closed: AtomicBool,
}

/// Bounded pool of reusable contexts
///
/// At most `max_workers` slots are handed out at once; `acquire` waits for a
/// free one. A size of 0 disables admission control. Contexts are created
/// lazily by the factory and recycled when their slot is dropped, so the
/// caller is responsible for resetting a context before reuse.
///
/// # Example
///
/// ```
/// use sws_flow::worker::WorkerPool;
///
/// # tokio_test::block_on(async {
/// let pool = WorkerPool::new(2, Vec::<u8>::new);
///
/// let mut slot = pool.acquire().await.unwrap();
/// slot.push(1);
/// assert_eq!(pool.active(), 1);
///
/// drop(slot);
/// assert_eq!(pool.active(), 0);
/// # });
/// ```
pub struct WorkerPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for WorkerPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool with `max_workers` slots (0 = unbounded)
    pub fn new<F>(max_workers: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let permits = (max_workers > 0).then(|| Arc::new(Semaphore::new(max_workers)));

        Self {
            inner: Arc::new(PoolInner {
                permits,
                idle: Mutex::new(Vec::with_capacity(max_workers)),
                factory: Box::new(factory),
                capacity: max_workers,
                active: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Take a slot, waiting while the pool is exhausted
    pub async fn acquire(&self) -> Result<PoolSlot<T>, WorkerPoolError> {
        if self.is_closed() {
            return Err(WorkerPoolError::Closed);
        }

        let permit = match &self.inner.permits {
            Some(permits) => Some(
                Arc::clone(permits)
                    .acquire_owned()
                    .await
                    .map_err(|_| WorkerPoolError::Closed)?,
            ),
            None => None,
        };

        let item = self
            .inner
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| (self.inner.factory)());

        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(active, capacity = self.inner.capacity, "pool slot acquired");

        Ok(PoolSlot {
            pool: Arc::clone(&self.inner),
            item: Some(item),
            _permit: permit,
        })
    }

    /// Stop handing out slots; waiters receive [`WorkerPoolError::Closed`]
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(permits) = &self.inner.permits {
            permits.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Slots currently handed out
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Maximum slots, or `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.inner.permits.as_ref().map(|_| self.inner.capacity)
    }

    /// Slots that can be acquired without waiting, or `None` when unbounded
    pub fn available(&self) -> Option<usize> {
        self.inner.permits.as_ref().map(|p| p.available_permits())
    }
}

impl<T> fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.inner.capacity)
            .field("active", &self.inner.active.load(Ordering::SeqCst))
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

/// An admission ticket holding one pooled context
///
/// Dropping the slot returns the context to the pool and frees the permit.
pub struct PoolSlot<T> {
    pool: Arc<PoolInner<T>>,
    item: Option<T>,
    // Dropped after `Drop::drop` has put the item back
    _permit: Option<OwnedSemaphorePermit>,
}

impl<T> Deref for PoolSlot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pool slot is populated until dropped")
    }
}

impl<T> DerefMut for PoolSlot<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pool slot is populated until dropped")
    }
}

impl<T> Drop for PoolSlot<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.idle.lock().push(item);
        }
        self.pool.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<T> fmt::Debug for PoolSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolSlot")
            .field("bounded", &self._permit.is_some())
            .finish()
    }
}
