//! Task tree use-case service.
//!
//! # Responsibility
//! - Run read-compute-write for task create, move, reschedule and
//!   renormalization on top of the pure tree algorithms.
//! - Validate cross-record hierarchy invariants above the repository layer.
//! - Render project trees and origin-separated forests.
//!
//! # Invariants
//! - Parent and child share `origin` and `root_id`; moves never cross trees.
//! - Move operations must not create parent-child cycles.
//! - A renormalization batch is persisted before the retried position is
//!   written, and only through the repository's atomic bulk patch.

use crate::model::task::{Task, TaskId, TaskOrigin};
use crate::repo::task_repo::{TaskListQuery, TaskRepoError, TaskRepository};
use crate::tree::builder::{build_tree, separate_by_origin, OriginForests, TaskNode};
use crate::tree::cascade::{calculate_date_deltas, get_descendants, DateDelta};
use crate::tree::position::{calculate_position, position_updates, renormalize, PositionAllocation};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from task service operations.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    /// Target task does not exist.
    TaskNotFound(TaskId),
    /// Parent task does not exist.
    ParentNotFound(TaskId),
    /// Parent belongs to the other origin.
    OriginMismatch {
        origin: TaskOrigin,
        parent_origin: TaskOrigin,
    },
    /// Move would put a task into another tree or detach it as a new root.
    CrossTreeMove {
        task_id: TaskId,
        parent_id: Option<TaskId>,
    },
    /// Move would create a cycle.
    CycleDetected { task_id: TaskId, parent_id: TaskId },
    /// No position could be allocated even after renormalization.
    PositionExhausted { parent_id: Option<TaskId> },
    /// Repository-level failure.
    Repo(TaskRepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "task title must not be blank"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent task not found: {id}"),
            Self::OriginMismatch {
                origin,
                parent_origin,
            } => write!(
                f,
                "{} task cannot be placed under a {} parent",
                origin.as_str(),
                parent_origin.as_str()
            ),
            Self::CrossTreeMove { task_id, parent_id } => write!(
                f,
                "task {task_id} cannot move to another tree (parent {})",
                display_id(*parent_id)
            ),
            Self::CycleDetected { task_id, parent_id } => write!(
                f,
                "move would create cycle: task {task_id} under parent {parent_id}"
            ),
            Self::PositionExhausted { parent_id } => write!(
                f,
                "no sibling position available under parent {}",
                display_id(*parent_id)
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskRepoError> for TaskServiceError {
    fn from(value: TaskRepoError) -> Self {
        match value {
            TaskRepoError::NotFound(id) => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Request model for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    /// `None` creates a new project/template root.
    pub parent_task_id: Option<TaskId>,
    /// Must match the parent's origin when a parent is given.
    pub origin: TaskOrigin,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    /// Request for a new root task.
    pub fn root(origin: TaskOrigin, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parent_task_id: None,
            origin,
            start_date: None,
            due_date: None,
        }
    }

    /// Request for a new child of `parent`.
    pub fn child(parent: &Task, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parent_task_id: Some(parent.id),
            origin: parent.origin,
            start_date: None,
            due_date: None,
        }
    }

    /// Sets the start date.
    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Sets the due date.
    pub fn due(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Result of a reschedule: the saved task plus the cascaded patches.
#[derive(Debug, Clone, PartialEq)]
pub struct RescheduleOutcome {
    pub task: Task,
    pub cascaded: Vec<DateDelta>,
}

/// Task tree service facade.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one task at the end of its sibling group.
    pub fn create_task(&self, request: NewTask) -> Result<Task, TaskServiceError> {
        let title = normalize_title(request.title)?;

        let mut task = match request.parent_task_id {
            Some(parent_id) => {
                let parent = self
                    .repo
                    .get_task(parent_id)?
                    .ok_or(TaskServiceError::ParentNotFound(parent_id))?;
                if parent.origin != request.origin {
                    return Err(TaskServiceError::OriginMismatch {
                        origin: request.origin,
                        parent_origin: parent.origin,
                    });
                }
                Task::new_child(&parent, title)
            }
            None => Task::new_root(request.origin, title),
        };
        task.start_date = request.start_date;
        task.due_date = request.due_date;

        let siblings = self.list_siblings(task.parent_task_id, task.origin)?;
        let position = self.allocate_at(siblings, None, task.parent_task_id)?;
        task.position = Some(position);

        self.repo.create_task(&task)?;
        info!(
            "event=task_create module=service status=ok task_id={} parent_id={} origin={} position={}",
            task.id,
            display_id(task.parent_task_id),
            task.origin.as_str(),
            position
        );
        Ok(task)
    }

    /// Loads one task by id.
    pub fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, TaskServiceError> {
        self.repo.get_task(task_id).map_err(Into::into)
    }

    /// Moves one task under `new_parent` at sibling index `target_index`.
    ///
    /// `target_index` is clamped to the sibling count; `None` appends. Root
    /// tasks may only be reordered among roots of the same origin.
    pub fn move_task(
        &self,
        task_id: TaskId,
        new_parent: Option<TaskId>,
        target_index: Option<usize>,
    ) -> Result<Task, TaskServiceError> {
        let mut task = self.load_task(task_id)?;

        match new_parent {
            Some(parent_id) => {
                if parent_id == task_id {
                    return Err(TaskServiceError::CycleDetected { task_id, parent_id });
                }
                let parent = self
                    .repo
                    .get_task(parent_id)?
                    .ok_or(TaskServiceError::ParentNotFound(parent_id))?;
                if parent.origin != task.origin {
                    return Err(TaskServiceError::OriginMismatch {
                        origin: task.origin,
                        parent_origin: parent.origin,
                    });
                }
                if parent.root_id != task.root_id {
                    return Err(TaskServiceError::CrossTreeMove {
                        task_id,
                        parent_id: new_parent,
                    });
                }
                if self.is_descendant(&task, parent_id)? {
                    return Err(TaskServiceError::CycleDetected { task_id, parent_id });
                }
            }
            None if !task.is_root() => {
                return Err(TaskServiceError::CrossTreeMove {
                    task_id,
                    parent_id: None,
                });
            }
            None => {}
        }

        let mut siblings = self.list_siblings(new_parent, task.origin)?;
        siblings.retain(|sibling| sibling.id != task_id);
        let position = self.allocate_at(siblings, target_index, new_parent)?;

        task.parent_task_id = new_parent;
        task.position = Some(position);
        self.repo.update_placement(task_id, new_parent, position)?;
        info!(
            "event=task_move module=service status=ok task_id={} parent_id={} position={}",
            task_id,
            display_id(new_parent),
            position
        );
        Ok(task)
    }

    /// Saves new dates and shifts scheduled descendants by the start delta.
    ///
    /// Both writes land in one transaction. Descendant `due_date` values are
    /// left as they are.
    pub fn reschedule_task(
        &self,
        task_id: TaskId,
        start_date: Option<NaiveDate>,
        due_date: Option<NaiveDate>,
    ) -> Result<RescheduleOutcome, TaskServiceError> {
        let mut task = self.load_task(task_id)?;
        let previous_start = task.start_date;
        task.start_date = start_date;
        task.due_date = due_date;

        let tree = self.repo.list_tasks(&TaskListQuery::tree(task.root_id))?;
        let cascaded = calculate_date_deltas(&tree, task_id, previous_start, start_date);

        self.repo.reschedule_task(&task, &cascaded)?;
        info!(
            "event=task_reschedule module=service status=ok task_id={} cascaded={}",
            task_id,
            cascaded.len()
        );
        Ok(RescheduleOutcome { task, cascaded })
    }

    /// Reassigns evenly spaced positions to one sibling group.
    pub fn renormalize_children(
        &self,
        parent: Option<TaskId>,
        origin: TaskOrigin,
    ) -> Result<Vec<Task>, TaskServiceError> {
        let siblings = self.list_siblings(parent, origin)?;
        self.persist_renormalized(&siblings, parent)
    }

    /// Loads a project/template root with its full nested tree.
    pub fn project_tree(&self, root_id: TaskId) -> Result<TaskNode, TaskServiceError> {
        let root = self.load_task(root_id)?;
        let tasks = self.repo.list_tasks(&TaskListQuery::tree(root.root_id))?;
        let children = build_tree(&tasks, root_id);
        Ok(TaskNode {
            task: root,
            children,
        })
    }

    /// Loads every task and builds instance/template forests.
    pub fn forests(&self) -> Result<OriginForests, TaskServiceError> {
        let tasks = self.repo.list_tasks(&TaskListQuery::default())?;
        Ok(separate_by_origin(&tasks))
    }

    /// Removes one task. Its children are left as orphans.
    pub fn delete_task(&self, task_id: TaskId) -> Result<(), TaskServiceError> {
        self.repo.delete_task(task_id)?;
        info!("event=task_delete module=service status=ok task_id={task_id}");
        Ok(())
    }

    fn load_task(&self, task_id: TaskId) -> Result<Task, TaskServiceError> {
        self.repo
            .get_task(task_id)?
            .ok_or(TaskServiceError::TaskNotFound(task_id))
    }

    fn list_siblings(
        &self,
        parent: Option<TaskId>,
        origin: TaskOrigin,
    ) -> Result<Vec<Task>, TaskServiceError> {
        self.repo
            .list_tasks(&TaskListQuery::siblings(parent, origin))
            .map_err(Into::into)
    }

    /// Allocates a position at `index` among `siblings` (sorted, mover
    /// excluded), renormalizing the group once if the gap is exhausted.
    fn allocate_at(
        &self,
        siblings: Vec<Task>,
        index: Option<usize>,
        parent: Option<TaskId>,
    ) -> Result<f64, TaskServiceError> {
        let index = index.unwrap_or(siblings.len()).min(siblings.len());
        if let PositionAllocation::At(position) = position_between(&siblings, index) {
            return Ok(position);
        }

        warn!(
            "event=position_renormalize module=service status=start parent_id={} siblings={}",
            display_id(parent),
            siblings.len()
        );
        let renormalized = self.persist_renormalized(&siblings, parent)?;
        position_between(&renormalized, index)
            .value()
            .ok_or(TaskServiceError::PositionExhausted { parent_id: parent })
    }

    fn persist_renormalized(
        &self,
        siblings: &[Task],
        parent: Option<TaskId>,
    ) -> Result<Vec<Task>, TaskServiceError> {
        let renormalized = renormalize(siblings);
        self.repo.update_positions(&position_updates(&renormalized))?;
        info!(
            "event=position_renormalize module=service status=ok parent_id={} siblings={}",
            display_id(parent),
            renormalized.len()
        );
        Ok(renormalized)
    }

    fn is_descendant(&self, task: &Task, candidate: TaskId) -> Result<bool, TaskServiceError> {
        let tree = self.repo.list_tasks(&TaskListQuery::tree(task.root_id))?;
        Ok(get_descendants(&tree, task.id)
            .iter()
            .any(|descendant| descendant.id == candidate))
    }
}

fn position_between(siblings: &[Task], index: usize) -> PositionAllocation {
    let prev = index
        .checked_sub(1)
        .and_then(|prev_index| siblings.get(prev_index))
        .map(Task::sort_position);
    let next = siblings.get(index).map(Task::sort_position);
    calculate_position(prev, next)
}

fn normalize_title(value: String) -> Result<String, TaskServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaskServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn display_id(id: Option<TaskId>) -> String {
    id.map_or_else(|| "none".to_string(), |value| value.to_string())
}
