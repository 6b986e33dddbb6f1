//! Pure task-tree algorithms.
//!
//! # Responsibility
//! - Build nested views from flat task lists (`builder`).
//! - Allocate sparse sibling positions (`position`).
//! - Cascade start-date shifts to descendants (`cascade`).
//!
//! # Invariants
//! - No I/O, no shared state; every function depends only on its arguments.
//! - Data-shape problems degrade gracefully and never return errors.

pub mod builder;
pub mod cascade;
pub mod position;
