//! Flat list to nested tree conversion.
//!
//! # Responsibility
//! - Nest tasks by `parent_task_id` for rendering project and template trees.
//! - Flatten nested trees back into records.
//!
//! # Invariants
//! - Sibling order is `position ASC` (missing = 0), ties keep input order.
//! - A task whose parent is missing from the input becomes a root.
//! - Each task appears at most once in the output, even for cyclic input.
//! - Never fails; malformed input degrades to "orphan becomes root".

use crate::model::task::{Task, TaskId, TaskOrigin};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One task with its ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TaskNode>,
}

impl TaskNode {
    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

/// Instance and template forests built independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginForests {
    pub instance_tasks: Vec<TaskNode>,
    pub template_tasks: Vec<TaskNode>,
}

/// Returns the descendants of `root_id` nested by parent, without the root.
///
/// Tasks not reachable from `root_id` are excluded.
pub fn build_tree(tasks: &[Task], root_id: TaskId) -> Vec<TaskNode> {
    let index = index_children(tasks);
    let mut visited = HashSet::from([root_id]);
    build_children(tasks, &index, root_id, &mut visited)
}

/// Builds a forest rooted at every task with no resolvable parent.
pub fn build_hierarchy(tasks: &[Task]) -> Vec<TaskNode> {
    let known: HashSet<TaskId> = tasks.iter().map(|task| task.id).collect();
    let index = index_children(tasks);

    let mut roots: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| match task.parent_task_id {
            None => true,
            Some(parent_id) => parent_id == task.id || !known.contains(&parent_id),
        })
        .map(|(idx, _)| idx)
        .collect();
    sort_by_position(tasks, &mut roots);

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .filter_map(|idx| build_node(tasks, &index, idx, &mut visited))
        .collect()
}

/// Partitions by origin first, then builds each forest on its own.
///
/// A stray parent reference across origins turns the child into a root of
/// its own partition instead of nesting it under the other origin.
pub fn separate_by_origin(tasks: &[Task]) -> OriginForests {
    let (instances, templates): (Vec<Task>, Vec<Task>) = tasks
        .iter()
        .cloned()
        .partition(|task| task.origin == TaskOrigin::Instance);

    OriginForests {
        instance_tasks: build_hierarchy(&instances),
        template_tasks: build_hierarchy(&templates),
    }
}

/// Flattens a forest in depth-first pre-order.
pub fn flatten_tree(nodes: &[TaskNode]) -> Vec<Task> {
    let mut out = Vec::new();
    for node in nodes {
        push_preorder(node, &mut out);
    }
    out
}

fn push_preorder(node: &TaskNode, out: &mut Vec<Task>) {
    out.push(node.task.clone());
    for child in &node.children {
        push_preorder(child, out);
    }
}

/// Maps parent id to child indices in input order. Self-links are dropped.
fn index_children(tasks: &[Task]) -> HashMap<TaskId, Vec<usize>> {
    let mut index: HashMap<TaskId, Vec<usize>> = HashMap::new();
    for (idx, task) in tasks.iter().enumerate() {
        if let Some(parent_id) = task.parent_task_id {
            if parent_id != task.id {
                index.entry(parent_id).or_default().push(idx);
            }
        }
    }
    index
}

fn build_children(
    tasks: &[Task],
    index: &HashMap<TaskId, Vec<usize>>,
    parent_id: TaskId,
    visited: &mut HashSet<TaskId>,
) -> Vec<TaskNode> {
    let Some(children) = index.get(&parent_id) else {
        return Vec::new();
    };
    let mut ordered = children.clone();
    sort_by_position(tasks, &mut ordered);

    ordered
        .into_iter()
        .filter_map(|idx| build_node(tasks, index, idx, visited))
        .collect()
}

fn build_node(
    tasks: &[Task],
    index: &HashMap<TaskId, Vec<usize>>,
    idx: usize,
    visited: &mut HashSet<TaskId>,
) -> Option<TaskNode> {
    let task = &tasks[idx];
    if !visited.insert(task.id) {
        return None;
    }
    let children = build_children(tasks, index, task.id, visited);
    Some(TaskNode {
        task: task.clone(),
        children,
    })
}

/// Stable sort of input indices, so equal positions keep input order.
fn sort_by_position(tasks: &[Task], indices: &mut [usize]) {
    indices.sort_by(|a, b| {
        tasks[*a]
            .sort_position()
            .total_cmp(&tasks[*b].sort_position())
    });
}
