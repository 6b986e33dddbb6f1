//! Domain model for project/template task trees.
//!
//! # Responsibility
//! - Define the canonical task record used by tree algorithms, storage and
//!   services.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Children are a derived view and are never stored on the record.

pub mod task;
