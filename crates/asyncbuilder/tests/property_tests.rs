//! # Property-Based Tests
//!
//! Ordering, at-most-once and first-error invariants under arbitrary
//! interleavings of appends, reservations and resolutions.

use asyncbuilder::{CollectError, Collector, Outcome, Slot, TaskQueue};
use proptest::collection::vec;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

type Seen = Rc<RefCell<Vec<Outcome<usize, usize>>>>;

fn recording(queue: &TaskQueue) -> (Collector<usize, usize>, Seen) {
    let seen: Seen = Rc::default();
    let sink = Rc::clone(&seen);
    let collector = Collector::new(queue.clone(), move |outcome| {
        sink.borrow_mut().push(outcome);
    });
    (collector, seen)
}

/// Apply `ops` (`true` = append, `false` = reserve); every entry's value is
/// its index. Returns the reserved slots with their indices.
fn build(collector: &Collector<usize, usize>, ops: &[bool]) -> Vec<(usize, Slot<usize, usize>)> {
    let mut slots = Vec::new();
    for (index, &sync) in ops.iter().enumerate() {
        if sync {
            collector.append(index).expect("append");
        } else {
            slots.push((index, collector.reserve_slot().expect("reserve")));
        }
    }
    slots
}

/// A sequence of ops plus a permutation of its reservations.
fn ops_and_order() -> impl Strategy<Value = (Vec<bool>, Vec<usize>)> {
    vec(any::<bool>(), 0..40).prop_flat_map(|ops| {
        let reserved = ops.iter().filter(|sync| !**sync).count();
        let order = Just((0..reserved).collect::<Vec<_>>()).prop_shuffle();
        (Just(ops), order)
    })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Delivered order equals call order, whatever the resolution order and
    /// wherever complete() falls among the resolutions.
    #[test]
    fn order_matches_reservation_order(
        (ops, order) in ops_and_order(),
        complete_after in 0usize..40
    ) {
        let queue = TaskQueue::new();
        let (collector, seen) = recording(&queue);
        let slots = build(&collector, &ops);

        let split = complete_after.min(order.len());
        for &i in &order[..split] {
            let (index, slot) = &slots[i];
            slot.ok(*index);
        }
        collector.complete();
        for &i in &order[split..] {
            let (index, slot) = &slots[i];
            slot.ok(*index);
        }
        queue.run_until_idle();

        let expected: Vec<usize> = (0..ops.len()).collect();
        prop_assert_eq!(&*seen.borrow(), &vec![Ok(expected)]);
    }

    /// However often complete() and the resolvers are called, one delivery.
    #[test]
    fn delivery_happens_at_most_once(
        (ops, order) in ops_and_order(),
        completes in 1usize..5,
        repeats in 1usize..4
    ) {
        let queue = TaskQueue::new();
        let (collector, seen) = recording(&queue);
        let slots = build(&collector, &ops);

        for _ in 0..completes {
            collector.complete();
        }
        for _ in 0..repeats {
            for &i in &order {
                let (index, slot) = &slots[i];
                slot.ok(*index);
            }
            collector.complete();
            queue.run_until_idle();
        }

        prop_assert_eq!(seen.borrow().len(), 1);
        prop_assert_eq!(collector.pending(), 0);
    }

    /// The error that reaches the callback is the first one fired.
    #[test]
    fn first_fired_error_wins(
        (ops, order) in ops_and_order(),
        failing in vec(any::<bool>(), 40)
    ) {
        let queue = TaskQueue::new();
        let (collector, seen) = recording(&queue);
        let slots = build(&collector, &ops);
        collector.complete();

        let mut first_error = None;
        for &i in &order {
            let (index, slot) = &slots[i];
            if failing[i] {
                if first_error.is_none() {
                    first_error = Some(*index);
                }
                slot.fail(*index);
            } else {
                slot.ok(*index);
            }
        }
        queue.run_until_idle();

        let expected = match first_error {
            Some(index) => Err(CollectError::Upstream(index)),
            None => Ok((0..ops.len()).collect()),
        };
        prop_assert_eq!(&*seen.borrow(), &vec![expected]);
    }

    /// Without complete(), nothing is delivered even when every slot resolves.
    #[test]
    fn no_complete_no_delivery((ops, order) in ops_and_order()) {
        let queue = TaskQueue::new();
        let (collector, seen) = recording(&queue);
        let slots = build(&collector, &ops);

        for &i in &order {
            let (index, slot) = &slots[i];
            slot.ok(*index);
        }
        queue.run_until_idle();

        prop_assert!(seen.borrow().is_empty());
        prop_assert_eq!(collector.len(), ops.len());
    }
}
