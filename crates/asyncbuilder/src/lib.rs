//! # asyncbuilder
//!
//! Semi-asynchronous ordered list builder.
//!
//! A [`Collector`] gathers values that arrive two ways:
//! - synchronously, with [`Collector::append`],
//! - later, through a [`Slot`] obtained from [`Collector::reserve_slot`].
//!
//! After [`Collector::complete`], the final callback runs exactly once, with
//! every value in the order it was appended or reserved, or with the first
//! error reported by a slot.
//!
//! ## Architectural Constraints
//!
//! - Single-threaded: `Rc`/`RefCell`, no locks, no threads
//! - Never blocks; suspension is the gap between reserving and resolving a slot
//! - Deferred delivery goes through the [`Defer`] trait, so any event loop works
//! - No retry, no partial results, no cancellation of pending slots
//!
//! ```
//! use asyncbuilder::{Collector, TaskQueue};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let queue = TaskQueue::new();
//! let out = Rc::new(RefCell::new(None));
//! let sink = Rc::clone(&out);
//! let collector = Collector::<u32, String>::new(queue.clone(), move |outcome| {
//!     *sink.borrow_mut() = Some(outcome);
//! });
//!
//! collector.append(1).expect("open");
//! let two = collector.reserve_slot().expect("open");
//! collector.append(3).expect("open");
//! let four = collector.reserve_slot().expect("open");
//! collector.complete();
//!
//! four.ok(4);
//! two.ok(2);
//! assert_eq!(out.borrow_mut().take(), Some(Ok(vec![1, 2, 3, 4])));
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod collector;
pub mod schedule;
pub mod slot;
mod state;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use collector::{Collector, CollectorBuilder, DEFAULT_LABEL};
#[cfg(feature = "tokio")]
pub use schedule::LocalSpawner;
pub use schedule::{Defer, Task, TaskQueue};
pub use slot::Slot;
pub use types::{CollectError, Outcome, Phase, Status, UsageError};
