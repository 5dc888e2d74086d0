//! # Slot
//!
//! The resolver handed out by `Collector::reserve_slot`.
//!
//! A slot owns one index in the output list. Resolving it with a value fills
//! that index; resolving it with an error abandons the whole collector.
//! Only the first resolution of a slot counts, across all of its clones.

use crate::state::State;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

struct Target<T, E> {
    state: Rc<RefCell<State<T, E>>>,
    index: usize,
}

/// One-shot resolver for a reserved position in the output list.
pub struct Slot<T, E> {
    /// `None` for the inert slot returned after `complete()`.
    target: Option<Target<T, E>>,
    /// Shared by clones so a slot resolves at most once.
    spent: Rc<Cell<bool>>,
}

impl<T, E> Slot<T, E> {
    pub(crate) fn bound(state: Rc<RefCell<State<T, E>>>, index: usize) -> Self {
        Self {
            target: Some(Target { state, index }),
            spent: Rc::new(Cell::new(false)),
        }
    }

    pub(crate) fn inert() -> Self {
        Self {
            target: None,
            spent: Rc::new(Cell::new(true)),
        }
    }

    /// Index this slot fills, or `None` for an inert slot.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.target.as_ref().map(|t| t.index)
    }

    /// True for a slot that was reserved on a sealed collector.
    /// Resolving it has no effect.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.target.is_none()
    }

    /// True once this slot (or a clone of it) has been resolved.
    /// Always true for an inert slot.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.spent.get()
    }

    /// Supply the slot's outcome.
    ///
    /// - `Ok(value)` fills the slot. If the collector is sealed and this was
    ///   the last pending slot, the final callback runs before this returns.
    /// - `Err(error)` ends the collector: the final callback runs before this
    ///   returns, with `CollectError::Upstream(error)`, unless the collector
    ///   has already finished.
    ///
    /// Any call after the first is a no-op.
    pub fn resolve(&self, result: Result<T, E>) {
        if self.spent.replace(true) {
            tracing::trace!(index = ?self.index(), "slot already resolved; ignored");
            return;
        }
        let Some(target) = &self.target else {
            return;
        };

        let index = target.index;
        let delivery = {
            let mut st = target.state.borrow_mut();
            if st.is_finished() {
                tracing::trace!(
                    collector = st.label(),
                    index,
                    "slot resolved after finish; ignored"
                );
                return;
            }
            match result {
                Ok(value) => {
                    let delivery = st.fill(index, value);
                    if delivery.is_some() {
                        tracing::debug!(
                            collector = st.label(),
                            index,
                            len = st.len(),
                            "last slot filled; delivering"
                        );
                    } else {
                        tracing::trace!(
                            collector = st.label(),
                            index,
                            pending = st.pending(),
                            "slot filled"
                        );
                    }
                    delivery
                }
                Err(error) => {
                    tracing::warn!(
                        collector = st.label(),
                        index,
                        "slot failed; abandoning collector"
                    );
                    st.fail(error)
                }
            }
        };

        if let Some(delivery) = delivery {
            delivery.run();
        }
    }

    /// Shorthand for `resolve(Ok(value))`.
    pub fn ok(&self, value: T) {
        self.resolve(Ok(value));
    }

    /// Shorthand for `resolve(Err(error))`.
    pub fn fail(&self, error: E) {
        self.resolve(Err(error));
    }

    /// Turn the slot into a plain callback, for APIs that take one.
    pub fn into_callback(self) -> impl FnOnce(Result<T, E>) {
        move |result| self.resolve(result)
    }
}

impl<T, E> Clone for Slot<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.as_ref().map(|t| Target {
                state: Rc::clone(&t.state),
                index: t.index,
            }),
            spent: Rc::clone(&self.spent),
        }
    }
}

impl<T, E> fmt::Debug for Slot<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("index", &self.index())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
