//! # Deferred Execution
//!
//! The collector never runs the final callback inside `complete()` or inside
//! a misused `append`. It hands a task to a [`Defer`] implementation, which
//! runs it on a later turn of whatever loop the host drives.
//!
//! ## Implementations
//!
//! - [`TaskQueue`]: an in-process FIFO the host drains with `turn()` or
//!   `run_until_idle()`. Deterministic; used throughout the tests.
//! - Any `Fn(Task)` closure, for plugging in an existing event loop.
//! - `LocalSpawner` (feature `tokio`): `tokio::task::spawn_local`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Run a task on a later turn of the host's scheduling loop.
///
/// Implementations must not run `task` before `defer` returns.
pub trait Defer {
    /// Queue `task` to run later.
    fn defer(&self, task: Task);
}

impl<F> Defer for F
where
    F: Fn(Task),
{
    fn defer(&self, task: Task) {
        self(task);
    }
}

// =============================================================================
// TASK QUEUE
// =============================================================================

/// Single-threaded run-later queue.
///
/// Cloning yields another handle to the same queue, so one clone can be
/// given to a collector while the host keeps another to drive it.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// True if no task is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run one turn: every task queued before this call, in FIFO order.
    ///
    /// Tasks queued while the turn runs wait for the next turn.
    /// Returns the number of tasks run.
    pub fn turn(&self) -> usize {
        let batch = std::mem::take(&mut *self.tasks.borrow_mut());
        let ran = batch.len();
        for task in batch {
            task();
        }
        ran
    }

    /// Run turns until the queue is empty. Returns the total number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0usize;
        loop {
            let ran = self.turn();
            if ran == 0 {
                return total;
            }
            total = total.saturating_add(ran);
        }
    }
}

impl Defer for TaskQueue {
    fn defer(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("queued", &self.len())
            .finish()
    }
}

// =============================================================================
// TOKIO ADAPTER
// =============================================================================

/// Defers onto the current `tokio::task::LocalSet`.
///
/// Must be used from inside a `LocalSet` (`run_until` or a task spawned on
/// it); `spawn_local` panics otherwise.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSpawner;

#[cfg(feature = "tokio")]
impl Defer for LocalSpawner {
    fn defer(&self, task: Task) {
        // Detached; the collector never awaits its own delivery.
        drop(tokio::task::spawn_local(async move { task() }));
    }
}

// =============================================================================
// TESTS
// =============================================================================
