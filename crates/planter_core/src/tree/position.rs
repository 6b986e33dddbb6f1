//! Sparse sibling sort keys.
//!
//! # Responsibility
//! - Compute a position between two neighbours for insert/move.
//! - Restore even spacing once a gap is exhausted.
//!
//! # Invariants
//! - A returned position lies strictly between its bounds.
//! - `NeedsRenormalization` must never be persisted as a value; callers
//!   renormalize the sibling group atomically and retry.
//! - `renormalize` preserves relative order and is idempotent.
//!
//! Precondition: `prev <= next`. It is not checked.

use crate::model::task::{Task, TaskId};
use serde::{Deserialize, Serialize};

/// Spacing between adjacent siblings after renormalization.
pub const POSITION_STEP: f64 = 10_000.0;

/// Gaps at or below this width are considered exhausted.
pub const MIN_POSITION_GAP: f64 = 2.0;

/// Outcome of allocating a position between two neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionAllocation {
    /// Safe to persist.
    At(f64),
    /// The gap is too small; renormalize siblings first.
    NeedsRenormalization,
}

impl PositionAllocation {
    /// Returns the allocated value, if any.
    pub fn value(self) -> Option<f64> {
        match self {
            Self::At(position) => Some(position),
            Self::NeedsRenormalization => None,
        }
    }
}

/// Position patch produced by renormalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: TaskId,
    pub position: f64,
}

/// Returns the midpoint between `prev` and `next`.
///
/// `prev` defaults to `0` (insert at head). `next` defaults to
/// `prev + 2 * POSITION_STEP` (insert at tail), so appending lands exactly one
/// step after the last sibling.
pub fn calculate_position(prev: Option<f64>, next: Option<f64>) -> PositionAllocation {
    let lower = prev.unwrap_or(0.0);
    let upper = next.unwrap_or(lower + 2.0 * POSITION_STEP);

    if upper - lower <= MIN_POSITION_GAP {
        return PositionAllocation::NeedsRenormalization;
    }
    PositionAllocation::At(lower + (upper - lower) / 2.0)
}

/// Position for a new last sibling after `last`.
pub fn position_after(last: Option<f64>) -> PositionAllocation {
    calculate_position(last, None)
}

/// Reassigns `(index + 1) * POSITION_STEP` in current order.
///
/// Input is stable-sorted by position first (missing = 0), so callers may
/// pass siblings in any order; equal positions keep input order.
pub fn renormalize(siblings: &[Task]) -> Vec<Task> {
    let mut ordered: Vec<Task> = siblings.to_vec();
    ordered.sort_by(|a, b| a.sort_position().total_cmp(&b.sort_position()));

    for (index, task) in ordered.iter_mut().enumerate() {
        task.position = Some((index + 1) as f64 * POSITION_STEP);
    }
    ordered
}

/// Collects persistence patches for a renormalized sibling set.
pub fn position_updates(siblings: &[Task]) -> Vec<PositionUpdate> {
    siblings
        .iter()
        .map(|task| PositionUpdate {
            id: task.id,
            position: task.sort_position(),
        })
        .collect()
}
