//! Task domain model.
//!
//! # Responsibility
//! - Define the single hierarchical record behind projects, phases,
//!   milestones and leaf tasks.
//! - Provide write-path validation used before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `root_id == id` for a root task; children inherit `root_id` from their
//!   parent at creation and never change it.
//! - A parent and its children always share the same `origin`.
//! - `due_date` should not be earlier than `start_date` when both are set.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every task.
pub type TaskId = Uuid;

/// Whether a tree is a live project or a reusable pattern.
///
/// Trees of different origins never nest together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    /// A live project and its work items.
    Instance,
    /// A reusable project template.
    Template,
}

impl TaskOrigin {
    /// Storage/wire name of this origin.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Template => "template",
        }
    }

    /// Parses a storage/wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "instance" => Some(Self::Instance),
            "template" => Some(Self::Template),
            _ => None,
        }
    }
}

/// Validation errors for task write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is blank after trim.
    BlankTitle,
    /// `due_date` is earlier than `start_date`.
    DueBeforeStart {
        start_date: NaiveDate,
        due_date: NaiveDate,
    },
    /// A root task must be its own root.
    RootIdMismatch { id: TaskId, root_id: TaskId },
    /// A task cannot be its own parent.
    SelfParent(TaskId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::DueBeforeStart {
                start_date,
                due_date,
            } => write!(
                f,
                "due date {due_date} is earlier than start date {start_date}"
            ),
            Self::RootIdMismatch { id, root_id } => {
                write!(f, "root task {id} must use its own id as root_id, got {root_id}")
            }
            Self::SelfParent(id) => write!(f, "task {id} cannot be its own parent"),
        }
    }
}

impl Error for TaskValidationError {}

/// Canonical task record as stored by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// `None` means this task is a root ("project" or template).
    pub parent_task_id: Option<TaskId>,
    /// Top-level ancestor, denormalized for fast filtering.
    pub root_id: TaskId,
    /// Sibling sort key. Missing positions sort as `0`.
    pub position: Option<f64>,
    pub origin: TaskOrigin,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl Task {
    /// Creates a root task with a generated id.
    ///
    /// # Invariants
    /// - `root_id` equals the generated `id`.
    /// - Position and dates start unset.
    pub fn new_root(origin: TaskOrigin, title: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            title: title.into(),
            parent_task_id: None,
            root_id: id,
            position: None,
            origin,
            start_date: None,
            due_date: None,
        }
    }

    /// Creates a child task under `parent`, inheriting its root and origin.
    pub fn new_child(parent: &Task, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            parent_task_id: Some(parent.id),
            root_id: parent.root_id,
            position: None,
            origin: parent.origin,
            start_date: None,
            due_date: None,
        }
    }

    /// Returns whether this task has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_task_id.is_none()
    }

    /// Sort key used by every ordering rule in core.
    pub fn sort_position(&self) -> f64 {
        self.position.unwrap_or(0.0)
    }

    /// Validates record-level invariants before persistence.
    ///
    /// Cross-record invariants (parent origin, shared root) are checked by the
    /// service layer, which can see the parent.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        if self.parent_task_id == Some(self.id) {
            return Err(TaskValidationError::SelfParent(self.id));
        }
        if self.is_root() && self.root_id != self.id {
            return Err(TaskValidationError::RootIdMismatch {
                id: self.id,
                root_id: self.root_id,
            });
        }
        if let (Some(start_date), Some(due_date)) = (self.start_date, self.due_date) {
            if due_date < start_date {
                return Err(TaskValidationError::DueBeforeStart {
                    start_date,
                    due_date,
                });
            }
        }
        Ok(())
    }
}
