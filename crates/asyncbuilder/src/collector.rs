//! # Collector
//!
//! The owner-facing handle: `append`, `reserve_slot`, `complete`.
//!
//! ## Delivery Rules
//!
//! - `complete()` with nothing pending defers the callback to a later turn.
//! - A resolver that fills the last pending slot of a sealed collector, or
//!   that fails, runs the callback itself, before it returns.
//! - `append`/`reserve_slot` on a sealed collector defer an
//!   `AppendAfterComplete` error to the callback.
//! - `append`/`reserve_slot` once delivery is committed return `UsageError`.

use crate::schedule::Defer;
use crate::slot::Slot;
use crate::state::{Delivery, FinalCallback, State};
use crate::types::{Outcome, Phase, Status, UsageError};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Label used in log events when none is configured.
pub const DEFAULT_LABEL: &str = "collector";

// =============================================================================
// BUILDER
// =============================================================================

/// Configuration for a [`Collector`].
///
/// ```
/// use asyncbuilder::{Collector, CollectorBuilder, TaskQueue};
///
/// let queue = TaskQueue::new();
/// let collector: Collector<u32, String> = CollectorBuilder::new()
///     .label("thumbnails")
///     .capacity(16)
///     .build(queue.clone(), |outcome| {
///         assert_eq!(outcome, Ok(vec![1]));
///     });
/// collector.append(1).expect("open");
/// collector.complete();
/// queue.run_until_idle();
/// ```
#[derive(Debug, Clone)]
pub struct CollectorBuilder {
    label: String,
    capacity: usize,
}

impl Default for CollectorBuilder {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            capacity: 0,
        }
    }
}

impl CollectorBuilder {
    /// Start from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name attached to every log event of this collector.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Pre-allocate room for this many entries. Not a limit.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Create the collector.
    ///
    /// `defer` runs deferred deliveries; `callback` receives the outcome
    /// exactly once.
    pub fn build<T, E, D, F>(self, defer: D, callback: F) -> Collector<T, E>
    where
        T: 'static,
        E: 'static,
        D: Defer + 'static,
        F: FnOnce(Outcome<T, E>) + 'static,
    {
        let label: Rc<str> = Rc::from(self.label);
        let callback: FinalCallback<T, E> = Box::new(callback);
        tracing::trace!(
            collector = %label,
            capacity = self.capacity,
            "collector created"
        );
        Collector {
            state: Rc::new(RefCell::new(State::new(label, self.capacity, callback))),
            defer: Box::new(defer),
        }
    }
}

// =============================================================================
// COLLECTOR
// =============================================================================

/// Collects synchronous and asynchronous results into one ordered list.
///
/// ```
/// use asyncbuilder::{Collector, TaskQueue};
///
/// let queue = TaskQueue::new();
/// let collector = Collector::<&str, String>::new(queue.clone(), |outcome| {
///     assert_eq!(outcome, Ok(vec!["a", "b", "c"]));
/// });
///
/// collector.append("a").expect("open");
/// let later = collector.reserve_slot().expect("open");
/// collector.append("c").expect("open");
/// collector.complete();
///
/// later.ok("b"); // last pending slot: the callback runs here
/// ```
pub struct Collector<T, E> {
    state: Rc<RefCell<State<T, E>>>,
    defer: Box<dyn Defer>,
}

impl<T, E> Collector<T, E>
where
    T: 'static,
    E: 'static,
{
    /// Create a collector with the default configuration.
    pub fn new<D, F>(defer: D, callback: F) -> Self
    where
        D: Defer + 'static,
        F: FnOnce(Outcome<T, E>) + 'static,
    {
        CollectorBuilder::new().build(defer, callback)
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Append a value now, at the next index.
    ///
    /// On a sealed collector the value is dropped and an
    /// `AppendAfterComplete` error is scheduled for the final callback.
    pub fn append(&self, value: T) -> Result<(), UsageError> {
        let rejected = {
            let mut st = self.state.borrow_mut();
            match st.phase() {
                Phase::Finished => {
                    tracing::debug!(collector = st.label(), "append after finish");
                    return Err(UsageError::AppendAfterFinish);
                }
                Phase::Sealed => {
                    tracing::warn!(collector = st.label(), "append after complete");
                    st.reject_sealed_append()
                }
                Phase::Open => {
                    let index = st.push_ready(value);
                    tracing::trace!(collector = st.label(), index, "value appended");
                    return Ok(());
                }
            }
        };
        self.schedule(rejected);
        Ok(())
    }

    /// Reserve the next index for a value that arrives later.
    ///
    /// On a sealed collector this schedules an `AppendAfterComplete` error
    /// and returns an inert slot.
    pub fn reserve_slot(&self) -> Result<Slot<T, E>, UsageError> {
        let rejected = {
            let mut st = self.state.borrow_mut();
            match st.phase() {
                Phase::Finished => {
                    tracing::debug!(collector = st.label(), "reserve_slot after finish");
                    return Err(UsageError::ReserveAfterFinish);
                }
                Phase::Sealed => {
                    tracing::warn!(collector = st.label(), "reserve_slot after complete");
                    st.reject_sealed_append()
                }
                Phase::Open => {
                    let index = st.push_pending();
                    tracing::trace!(
                        collector = st.label(),
                        index,
                        pending = st.pending(),
                        "slot reserved"
                    );
                    return Ok(Slot::bound(Rc::clone(&self.state), index));
                }
            }
        };
        self.schedule(rejected);
        Ok(Slot::inert())
    }

    /// Signal that no more appends or reservations will happen.
    ///
    /// With nothing pending, the callback is scheduled on a later turn.
    /// Otherwise the resolver of the last pending slot delivers.
    /// Calling this more than once is harmless.
    pub fn complete(&self) {
        let delivery = {
            let mut st = self.state.borrow_mut();
            if st.is_complete() || st.is_finished() {
                tracing::trace!(collector = st.label(), "complete repeated; ignored");
                return;
            }
            let delivery = st.seal();
            tracing::debug!(
                collector = st.label(),
                len = st.len(),
                pending = st.pending(),
                "collector sealed"
            );
            delivery
        };
        self.schedule(delivery);
    }

    fn schedule(&self, delivery: Option<Delivery<T, E>>) {
        if let Some(delivery) = delivery {
            self.defer.defer(Box::new(move || delivery.run()));
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Name used in log events.
    #[must_use]
    pub fn label(&self) -> String {
        self.state.borrow().label().to_owned()
    }

    /// Number of entries reserved so far, ready or pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    /// True if nothing was appended or reserved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserved slots not yet resolved.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().pending()
    }

    /// True once `complete()` was called.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.borrow().is_complete()
    }

    /// True once delivery to the final callback is committed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.borrow().is_finished()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Snapshot of phase, length and pending count.
    #[must_use]
    pub fn status(&self) -> Status {
        self.state.borrow().status()
    }
}

impl<T, E> fmt::Debug for Collector<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
