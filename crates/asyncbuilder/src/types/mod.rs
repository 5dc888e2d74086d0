//! # Core Type Definitions
//!
//! This module contains the public vocabulary of the collector:
//! - Lifecycle (`Phase`) and snapshots (`Status`)
//! - What the final callback receives (`Outcome`)
//! - Error types (`CollectError`, `UsageError`)
//!
//! ## Error Families
//!
//! Two families, never mixed:
//! - `UsageError` is returned synchronously to a caller that touches a
//!   collector whose delivery is already committed. It is a programmer bug.
//! - `CollectError` is delivered to the final callback. It replaces the
//!   result list; no partial results travel alongside it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Where a collector is in its lifecycle.
///
/// Transitions only move forward: `Open -> Sealed -> Finished`, or
/// `Open -> Finished` when a resolver fails or `complete()` finds nothing
/// pending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Accepting `append` and `reserve_slot`.
    #[default]
    Open,
    /// `complete()` was called; waiting for pending slots to resolve.
    Sealed,
    /// Delivery to the final callback is committed. Nothing changes anymore.
    Finished,
}

impl Phase {
    /// Derive the phase from the two lifecycle flags.
    #[must_use]
    pub const fn from_flags(is_complete: bool, is_finished: bool) -> Self {
        if is_finished {
            Self::Finished
        } else if is_complete {
            Self::Sealed
        } else {
            Self::Open
        }
    }

    /// Whether new appends and reservations are accepted as normal.
    #[must_use]
    pub const fn accepts_appends(self) -> bool {
        matches!(self, Self::Open)
    }
}

// =============================================================================
// STATUS SNAPSHOT
// =============================================================================

/// Point-in-time view of a collector.
///
/// Serializable so callers can attach it to structured log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Status {
    /// Lifecycle phase.
    pub phase: Phase,
    /// Number of reserved entries (appended values plus async slots).
    pub len: usize,
    /// Async slots reserved but not yet resolved.
    pub pending: usize,
}

impl Status {
    /// True once every reserved slot has a value.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.pending == 0
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// What the final callback receives: the ordered results, or the reason
/// there are none.
pub type Outcome<T, E> = Result<Vec<T>, CollectError<E>>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors delivered to the final callback in place of the result list.
///
/// `E` is the caller's own error type, passed through unchanged from the
/// first resolver that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectError<E> {
    /// `append` or `reserve_slot` was called after `complete()` while slots
    /// were still pending.
    #[error("append after complete")]
    AppendAfterComplete,

    /// A slot resolver reported an error. Only the first one is kept.
    #[error("upstream slot failed: {0}")]
    Upstream(E),
}

impl<E> CollectError<E> {
    /// Borrow the upstream error, if this is one.
    #[must_use]
    pub const fn upstream(&self) -> Option<&E> {
        match self {
            Self::Upstream(e) => Some(e),
            Self::AppendAfterComplete => None,
        }
    }

    /// Take the upstream error, if this is one.
    #[must_use]
    pub fn into_upstream(self) -> Option<E> {
        match self {
            Self::Upstream(e) => Some(e),
            Self::AppendAfterComplete => None,
        }
    }

    /// True for misuse of the collector rather than a failed operation.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::AppendAfterComplete)
    }
}

/// Synchronous misuse: the collector has already committed its delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum UsageError {
    /// `append` after the final callback was committed.
    #[error("append after completion callback")]
    AppendAfterFinish,

    /// `reserve_slot` after the final callback was committed.
    #[error("reserve_slot after completion callback")]
    ReserveAfterFinish,
}

// =============================================================================
// TESTS
// =============================================================================
