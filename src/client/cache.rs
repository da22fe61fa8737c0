//! The client's copy of the user's todo list.
//!
//! Reads are tagged with the generation they started in. Every optimistic
//! mutation and rollback bumps the generation, so a list fetched before the
//! mutation can no longer overwrite it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::engine::{derive_view, lifecycle, TodoStats, ViewCriteria};
use crate::models::todo::TodoItem;

/// Proof of when a read began; see [`TodoCache::apply_read_if_current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket(u64);

/// The cache contents captured before an optimistic mutation.
#[derive(Debug, Clone)]
#[must_use = "a snapshot is needed to roll back a failed mutation"]
pub struct Snapshot(Option<Vec<TodoItem>>);

#[derive(Debug, Default)]
struct CacheState {
    todos: Option<Vec<TodoItem>>,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct TodoCache {
    state: Mutex<CacheState>,
}

impl TodoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first successful read.
    pub fn todos(&self) -> Option<Vec<TodoItem>> {
        self.state.lock().todos.clone()
    }

    pub fn begin_read(&self) -> ReadTicket {
        ReadTicket(self.state.lock().generation)
    }

    /// Stores `todos` unless a mutation started after `ticket` was taken.
    pub fn apply_read_if_current(&self, ticket: ReadTicket, todos: Vec<TodoItem>) -> bool {
        let mut state = self.state.lock();
        if state.generation != ticket.0 {
            tracing::debug!(
                started = ticket.0,
                current = state.generation,
                "dropping stale todo list"
            );
            return false;
        }
        state.todos = Some(todos);
        true
    }

    fn mutate<F>(&self, apply: F) -> Snapshot
    where
        F: FnOnce(&mut Vec<TodoItem>),
    {
        let mut state = self.state.lock();
        state.generation += 1;
        let snapshot = Snapshot(state.todos.clone());
        if let Some(todos) = state.todos.as_mut() {
            apply(todos);
        }
        snapshot
    }

    pub fn optimistic_toggle(&self, todo_id: i32, now: DateTime<Utc>) -> Snapshot {
        self.mutate(|todos| {
            if let Some(todo) = todos.iter_mut().find(|todo| todo.id == todo_id) {
                lifecycle::toggle(todo, now);
            }
        })
    }

    pub fn optimistic_delete(&self, todo_id: i32) -> Snapshot {
        self.mutate(|todos| todos.retain(|todo| todo.id != todo_id))
    }

    /// Puts back the contents captured by `snapshot`.
    pub fn rollback(&self, snapshot: Snapshot) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.todos = snapshot.0;
    }

    /// Replaces the cached copy of `todo`, or adds it when absent.
    pub fn upsert(&self, todo: TodoItem) {
        let mut state = self.state.lock();
        state.generation += 1;
        let todos = state.todos.get_or_insert_with(Vec::new);
        match todos.iter_mut().find(|cached| cached.id == todo.id) {
            Some(cached) => *cached = todo,
            None => todos.insert(0, todo),
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.todos = None;
    }

    pub fn view(&self, criteria: &ViewCriteria) -> Vec<TodoItem> {
        let state = self.state.lock();
        derive_view(state.todos.as_deref(), criteria)
    }

    /// Stats over the cached list; archived items are never counted.
    pub fn stats(&self, now: DateTime<Utc>) -> TodoStats {
        let state = self.state.lock();
        TodoStats::compute(state.todos.iter().flatten(), now)
    }
}
