//! # Collector State Machine
//!
//! The one mutable object shared by a `Collector` and all of its `Slot`s.
//!
//! Every transition that may end the collector returns a [`Delivery`]
//! instead of calling the final callback itself. The caller releases its
//! `RefCell` borrow first and then either runs the delivery or defers it, so
//! user code never runs while the state is borrowed.

use crate::types::{CollectError, Outcome, Phase, Status};
use std::fmt;
use std::rc::Rc;

/// The final callback, boxed.
pub(crate) type FinalCallback<T, E> = Box<dyn FnOnce(Outcome<T, E>) + 'static>;

/// One position in the output list.
#[derive(Debug)]
pub(crate) enum Entry<T> {
    Ready(T),
    Pending,
}

/// A committed call of the final callback, not yet run.
///
/// Carries the values an error discarded so they are dropped here, after the
/// state borrow is released, rather than inside it.
#[must_use]
pub(crate) struct Delivery<T, E> {
    callback: FinalCallback<T, E>,
    outcome: Outcome<T, E>,
    discarded: Vec<Entry<T>>,
}

impl<T, E> Delivery<T, E> {
    pub(crate) fn run(self) {
        let Self {
            callback,
            outcome,
            discarded,
        } = self;
        callback(outcome);
        drop(discarded);
    }
}

pub(crate) struct State<T, E> {
    results: Vec<Entry<T>>,
    /// Entries reserved over the lifetime; survives `results` being emptied.
    len: usize,
    pending: usize,
    is_complete: bool,
    is_finished: bool,
    callback: Option<FinalCallback<T, E>>,
    label: Rc<str>,
}

impl<T, E> State<T, E> {
    pub(crate) fn new(label: Rc<str>, capacity: usize, callback: FinalCallback<T, E>) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            len: 0,
            pending: 0,
            is_complete: false,
            is_finished: false,
            callback: Some(callback),
            label,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub(crate) fn phase(&self) -> Phase {
        Phase::from_flags(self.is_complete, self.is_finished)
    }

    pub(crate) fn status(&self) -> Status {
        Status {
            phase: self.phase(),
            len: self.len,
            pending: self.pending,
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Push a ready value. Caller has checked the phase is `Open`.
    pub(crate) fn push_ready(&mut self, value: T) -> usize {
        self.results.push(Entry::Ready(value));
        self.bump_len()
    }

    /// Reserve a pending entry. Caller has checked the phase is `Open`.
    pub(crate) fn push_pending(&mut self) -> usize {
        self.results.push(Entry::Pending);
        self.pending = self.pending.saturating_add(1);
        self.bump_len()
    }

    fn bump_len(&mut self) -> usize {
        let index = self.len;
        self.len = self.len.saturating_add(1);
        index
    }

    /// Fill a reserved entry. Delivers the results if this was the last
    /// pending slot of a sealed collector.
    pub(crate) fn fill(&mut self, index: usize, value: T) -> Option<Delivery<T, E>> {
        if self.is_finished {
            return None;
        }
        *self.results.get_mut(index)? = Entry::Ready(value);
        self.pending = self.pending.saturating_sub(1);

        if self.is_complete && self.pending == 0 {
            self.finish_ok()
        } else {
            None
        }
    }

    /// Abandon the collector with an upstream error.
    pub(crate) fn fail(&mut self, error: E) -> Option<Delivery<T, E>> {
        self.finish(Err(CollectError::Upstream(error)))
    }

    /// Mark the collector complete. Returns the success delivery when
    /// nothing is pending; the caller is responsible for deferring it.
    pub(crate) fn seal(&mut self) -> Option<Delivery<T, E>> {
        self.is_complete = true;
        if self.pending == 0 {
            self.finish_ok()
        } else {
            None
        }
    }

    /// Abandon a sealed collector because of an append after `complete()`.
    pub(crate) fn reject_sealed_append(&mut self) -> Option<Delivery<T, E>> {
        self.finish(Err(CollectError::AppendAfterComplete))
    }

    fn finish_ok(&mut self) -> Option<Delivery<T, E>> {
        if self.is_finished {
            return None;
        }
        let values: Vec<T> = std::mem::take(&mut self.results)
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Ready(value) => Some(value),
                Entry::Pending => None,
            })
            .collect();
        debug_assert_eq!(values.len(), self.len, "delivered with a pending slot");
        self.finish(Ok(values))
    }

    /// Single exit point: check-and-set `is_finished`, take the callback and
    /// whatever values are still held.
    fn finish(&mut self, outcome: Outcome<T, E>) -> Option<Delivery<T, E>> {
        if self.is_finished {
            return None;
        }
        self.is_finished = true;
        let discarded = std::mem::take(&mut self.results);
        let callback = self.callback.take()?;
        Some(Delivery {
            callback,
            outcome,
            discarded,
        })
    }
}

impl<T, E> fmt::Debug for State<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("label", &self.label)
            .field("len", &self.len)
            .field("pending", &self.pending)
            .field("is_complete", &self.is_complete)
            .field("is_finished", &self.is_finished)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    type Seen = Rc<RefCell<Vec<Outcome<u32, &'static str>>>>;

    fn state() -> (State<u32, &'static str>, Seen) {
        let seen: Seen = Rc::default();
        let sink = Rc::clone(&seen);
        let callback: FinalCallback<u32, &'static str> =
            Box::new(move |outcome| sink.borrow_mut().push(outcome));
        (State::new(Rc::from("test"), 0, callback), seen)
    }

    #[test]
    fn seal_with_nothing_pending_delivers() {
        let (mut st, seen) = state();
        st.push_ready(1);
        st.push_ready(2);

        let delivery = st.seal().expect("delivery");
        assert!(st.is_finished());
        assert!(seen.borrow().is_empty());

        delivery.run();
        assert_eq!(*seen.borrow(), vec![Ok(vec![1, 2])]);
        // Length survives delivery.
        assert_eq!(st.len(), 2);
    }

    #[test]
    fn fill_last_pending_after_seal_delivers() {
        let (mut st, seen) = state();
        let a = st.push_pending();
        st.push_ready(2);
        let b = st.push_pending();

        assert!(st.seal().is_none());
        assert_eq!(st.phase(), Phase::Sealed);
        assert!(st.fill(b, 3).is_none());
        assert_eq!(st.pending(), 1);

        st.fill(a, 1).expect("delivery").run();
        assert_eq!(*seen.borrow(), vec![Ok(vec![1, 2, 3])]);
    }

    #[test]
    fn finish_happens_once() {
        let (mut st, _seen) = state();
        st.push_pending();

        assert!(st.fail("first").is_some());
        assert!(st.fail("second").is_none());
        assert!(st.reject_sealed_append().is_none());
        assert!(st.seal().is_none());
        assert!(st.fill(0, 9).is_none());
        // Nothing moved after finish.
        assert_eq!(st.pending(), 1);
    }

    #[test]
    fn fail_keeps_len_and_drops_values_after_callback() {
        let (mut st, seen) = state();
        st.push_ready(1);
        st.push_pending();
        st.push_ready(3);

        let delivery = st.fail("down").expect("delivery");
        assert_eq!(st.len(), 3);
        assert_eq!(st.status().phase, Phase::Finished);
        assert_eq!(delivery.discarded.len(), 3);

        delivery.run();
        assert_eq!(*seen.borrow(), vec![Err(CollectError::Upstream("down"))]);
        assert_eq!(st.len(), 3);
    }

    #[test]
    fn fill_out_of_range_is_ignored() {
        let (mut st, _seen) = state();
        st.push_pending();
        assert!(st.fill(5, 1).is_none());
        assert_eq!(st.pending(), 1);
    }

    #[test]
    fn status_tracks_transitions() {
        let (mut st, _seen) = state();
        assert_eq!(st.status(), Status::default());

        st.push_ready(1);
        st.push_pending();
        assert_eq!(
            st.status(),
            Status {
                phase: Phase::Open,
                len: 2,
                pending: 1
            }
        );

        assert!(st.seal().is_none());
        assert_eq!(st.status().phase, Phase::Sealed);
        assert!(st.is_complete());
        assert_eq!(st.label(), "test");
    }
}
