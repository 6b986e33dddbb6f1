//! Core domain logic for Planter project and template task trees.
//! This crate is the single source of truth for hierarchy, ordering and
//! scheduling invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Task, TaskId, TaskOrigin, TaskValidationError};
pub use repo::task_repo::{
    ParentFilter, SqliteTaskRepository, TaskListQuery, TaskRepoError, TaskRepoResult,
    TaskRepository,
};
pub use service::task_service::{NewTask, RescheduleOutcome, TaskService, TaskServiceError};
pub use tree::builder::{
    build_hierarchy, build_tree, flatten_tree, separate_by_origin, OriginForests, TaskNode,
};
pub use tree::cascade::{
    calculate_date_deltas, calculate_date_deltas_str, get_descendants, parse_calendar_date,
    DateDelta,
};
pub use tree::position::{
    calculate_position, position_after, position_updates, renormalize, PositionAllocation,
    PositionUpdate, MIN_POSITION_GAP, POSITION_STEP,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
