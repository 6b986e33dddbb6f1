//! Start-date propagation through a task subtree.
//!
//! # Responsibility
//! - Walk descendants of a task over `parent_task_id`.
//! - Shift scheduled descendants by the parent's calendar-day delta.
//!
//! # Invariants
//! - Unchanged, missing or unparseable dates produce no patches.
//! - Every patched descendant moves by the same number of days.
//! - Descendants without `start_date` stay unscheduled and are omitted.
//! - `due_date` is never touched here.

use crate::model::task::{Task, TaskId};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Start-date patch for one descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDelta {
    pub id: TaskId,
    pub start_date: NaiveDate,
}

/// Returns all transitive descendants of `root_id`, breadth-first.
///
/// `root_id` itself is not included. Cycles are cut by a visited set.
pub fn get_descendants(tasks: &[Task], root_id: TaskId) -> Vec<&Task> {
    let mut by_parent: HashMap<TaskId, Vec<&Task>> = HashMap::new();
    for task in tasks {
        if let Some(parent_id) = task.parent_task_id {
            by_parent.entry(parent_id).or_default().push(task);
        }
    }

    let mut visited = HashSet::from([root_id]);
    let mut queue = VecDeque::from([root_id]);
    let mut out = Vec::new();
    while let Some(current) = queue.pop_front() {
        let Some(children) = by_parent.get(&current) else {
            continue;
        };
        for child in children {
            if visited.insert(child.id) {
                out.push(*child);
                queue.push_back(child.id);
            }
        }
    }
    out
}

/// Computes start-date patches for descendants of `root_id`.
///
/// `diff_days = new_start - old_start`. Returns an empty list when either
/// date is missing or the delta is zero, so re-saving an unchanged date never
/// touches descendants.
pub fn calculate_date_deltas(
    tasks: &[Task],
    root_id: TaskId,
    old_start: Option<NaiveDate>,
    new_start: Option<NaiveDate>,
) -> Vec<DateDelta> {
    let (Some(old_start), Some(new_start)) = (old_start, new_start) else {
        return Vec::new();
    };
    let diff_days = new_start.signed_duration_since(old_start).num_days();
    if diff_days == 0 {
        return Vec::new();
    }
    let shift = Duration::days(diff_days);

    get_descendants(tasks, root_id)
        .into_iter()
        .filter_map(|task| {
            let start_date = task.start_date?.checked_add_signed(shift)?;
            Some(DateDelta {
                id: task.id,
                start_date,
            })
        })
        .collect()
}

/// Same as [`calculate_date_deltas`] for raw date strings.
///
/// Strings that do not parse as calendar dates degrade to an empty result.
pub fn calculate_date_deltas_str(
    tasks: &[Task],
    root_id: TaskId,
    old_start: &str,
    new_start: &str,
) -> Vec<DateDelta> {
    calculate_date_deltas(
        tasks,
        root_id,
        parse_calendar_date(old_start),
        parse_calendar_date(new_start),
    )
}

/// Parses `YYYY-MM-DD` or a timestamp, keeping only the calendar date.
///
/// Timestamps keep the date as written in their own offset.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|timestamp| timestamp.date())
}
