use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::todo::{Priority, TodoItem};

/// Aggregate counts over a user's live (non-archived) todos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub high_priority: usize,
    pub overdue: usize,
    pub completed_today: usize,
}

impl TodoStats {
    /// Archived todos are skipped. "Today" is the UTC calendar day of `now`.
    pub fn compute<'a, I>(todos: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a TodoItem>,
    {
        let today = now.date_naive();
        let mut stats = TodoStats::default();

        for todo in todos.into_iter().filter(|todo| !todo.is_archived) {
            stats.total += 1;
            if todo.is_completed {
                stats.completed += 1;
            }
            if todo.priority >= Priority::High {
                stats.high_priority += 1;
            }
            if !todo.is_completed && todo.due_date.is_some_and(|due| due < now) {
                stats.overdue += 1;
            }
            if todo.completed_at.is_some_and(|at| at.date_naive() == today) {
                stats.completed_today += 1;
            }
        }

        stats.active = stats.total - stats.completed;
        stats
    }
}
