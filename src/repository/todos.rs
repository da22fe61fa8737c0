//! User-scoped todo persistence.
//!
//! Every query filters on both `id` and `user_id`, so a todo that belongs to
//! someone else is indistinguishable from one that does not exist.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::engine::{lifecycle, TodoStats};
use crate::models::todo::{
    encode_tags, NewTodo, NewTodoRow, TodoChanges, TodoChangeset, TodoFilter, TodoItem, TodoRow,
};
use crate::repository::database::{Database, RepositoryError};
use crate::repository::schema::todos;

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn encode_optional_tags(tags: &[String]) -> Result<Option<String>, RepositoryError> {
    Ok(Some(encode_tags(tags)?))
}

fn find_owned(
    conn: &mut SqliteConnection,
    todo_id: i32,
    owner: &str,
) -> Result<Option<TodoItem>, RepositoryError> {
    todos::table
        .filter(todos::id.eq(todo_id))
        .filter(todos::user_id.eq(owner))
        .select(TodoRow::as_select())
        .first(conn)
        .optional()?
        .map(TodoItem::try_from)
        .transpose()
}

fn save(conn: &mut SqliteConnection, item: &TodoItem) -> Result<TodoItem, RepositoryError> {
    let changeset = TodoChangeset {
        title: &item.title,
        description: &item.description,
        is_completed: item.is_completed,
        priority: item.priority.value(),
        due_date: item.due_date.map(|at| at.naive_utc()),
        tags: encode_optional_tags(&item.tags)?,
        completed_at: item.completed_at.map(|at| at.naive_utc()),
        is_archived: item.is_archived,
        archived_at: item.archived_at.map(|at| at.naive_utc()),
    };
    let row = diesel::update(
        todos::table
            .filter(todos::id.eq(item.id))
            .filter(todos::user_id.eq(&item.user_id)),
    )
    .set(&changeset)
    .returning(TodoRow::as_returning())
    .get_result(conn)?;
    TodoItem::try_from(row)
}

impl Database {
    /// Lists `owner`'s todos, newest first.
    pub fn list_todos(
        &self,
        owner: &str,
        filter: Option<&TodoFilter>,
    ) -> Result<Vec<TodoItem>, RepositoryError> {
        let mut conn = self.conn()?;
        let mut query = todos::table
            .filter(todos::user_id.eq(owner))
            .select(TodoRow::as_select())
            .into_boxed();

        if let Some(filter) = filter {
            if let Some(is_completed) = filter.is_completed {
                query = query.filter(todos::is_completed.eq(is_completed));
            }
            if let Some(priority) = filter.priority {
                query = query.filter(todos::priority.eq(priority.value()));
            }
            if let Some(due_before) = filter.due_before {
                query = query.filter(todos::due_date.le(due_before.naive_utc()));
            }
            if let Some(created_after) = filter.created_after {
                query = query.filter(todos::created_at.ge(created_after.naive_utc()));
            }
            if let Some(tags) = filter.tags.as_deref().filter(|tags| !tags.is_empty()) {
                query = query.filter(todos::tags.like(like_pattern(tags)).escape('\\'));
            }
        }
        if !filter.is_some_and(|filter| filter.include_archived) {
            query = query.filter(todos::is_archived.eq(false));
        }

        let items = query
            .order((todos::created_at.desc(), todos::id.desc()))
            .load::<TodoRow>(&mut conn)?
            .into_iter()
            .map(TodoItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(count = items.len(), user_id = owner, "retrieved todos");
        Ok(items)
    }

    pub fn get_todo(&self, todo_id: i32, owner: &str) -> Result<Option<TodoItem>, RepositoryError> {
        let mut conn = self.conn()?;
        let todo = find_owned(&mut conn, todo_id, owner)?;
        if todo.is_none() {
            tracing::warn!(todo_id, user_id = owner, "todo not found");
        }
        Ok(todo)
    }

    pub fn create_todo(&self, todo: NewTodo, owner: &str) -> Result<TodoItem, RepositoryError> {
        let mut conn = self.conn()?;
        let row = NewTodoRow {
            user_id: owner,
            title: &todo.title,
            description: &todo.description,
            is_completed: false,
            priority: todo.priority.value(),
            due_date: todo.due_date.map(|at| at.naive_utc()),
            tags: encode_optional_tags(&todo.tags)?,
            created_at: Utc::now().naive_utc(),
        };
        let created = diesel::insert_into(todos::table)
            .values(&row)
            .returning(TodoRow::as_returning())
            .get_result(&mut conn)?;
        let created = TodoItem::try_from(created)?;
        tracing::info!(todo_id = created.id, user_id = owner, "created todo");
        Ok(created)
    }

    /// Loads an owned todo, applies `transition` and writes it back in one
    /// `BEGIN IMMEDIATE` transaction, so concurrent writers queue on the
    /// busy timeout and the last one wins. `None` when the todo is absent
    /// or not owned.
    fn modify_todo<F>(
        &self,
        todo_id: i32,
        owner: &str,
        transition: F,
    ) -> Result<Option<TodoItem>, RepositoryError>
    where
        F: FnOnce(&mut TodoItem),
    {
        let mut pooled = self.conn()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.immediate_transaction::<_, RepositoryError, _>(|conn| {
            let Some(mut item) = find_owned(conn, todo_id, owner)? else {
                return Ok(None);
            };
            transition(&mut item);
            save(conn, &item).map(Some)
        })
    }

    pub fn update_todo(
        &self,
        todo_id: i32,
        changes: TodoChanges,
        owner: &str,
    ) -> Result<Option<TodoItem>, RepositoryError> {
        let now = Utc::now();
        let updated = self.modify_todo(todo_id, owner, |item| {
            lifecycle::apply_update(item, changes, now)
        })?;
        match &updated {
            Some(_) => tracing::info!(todo_id, user_id = owner, "updated todo"),
            None => tracing::warn!(todo_id, user_id = owner, "todo not found for update"),
        }
        Ok(updated)
    }

    pub fn toggle_todo(&self, todo_id: i32, owner: &str) -> Result<Option<TodoItem>, RepositoryError> {
        let now = Utc::now();
        let toggled = self.modify_todo(todo_id, owner, |item| lifecycle::toggle(item, now))?;
        if let Some(item) = &toggled {
            tracing::info!(todo_id, user_id = owner, completed = item.is_completed, "toggled todo");
        }
        Ok(toggled)
    }

    pub fn archive_todo(&self, todo_id: i32, owner: &str) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let archived = self
            .modify_todo(todo_id, owner, |item| lifecycle::archive(item, now))?
            .is_some();
        if archived {
            tracing::info!(todo_id, user_id = owner, "archived todo");
        }
        Ok(archived)
    }

    pub fn restore_todo(&self, todo_id: i32, owner: &str) -> Result<bool, RepositoryError> {
        let restored = self
            .modify_todo(todo_id, owner, lifecycle::restore)?
            .is_some();
        if restored {
            tracing::info!(todo_id, user_id = owner, "restored todo");
        }
        Ok(restored)
    }

    pub fn delete_todo(&self, todo_id: i32, owner: &str) -> Result<bool, RepositoryError> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            todos::table
                .filter(todos::id.eq(todo_id))
                .filter(todos::user_id.eq(owner)),
        )
        .execute(&mut conn)?;
        if deleted == 0 {
            tracing::warn!(todo_id, user_id = owner, "todo not found for deletion");
            return Ok(false);
        }
        tracing::info!(todo_id, user_id = owner, "deleted todo");
        Ok(true)
    }

    pub fn todo_stats(&self, owner: &str, now: DateTime<Utc>) -> Result<TodoStats, RepositoryError> {
        let live = self.list_todos(owner, None)?;
        Ok(TodoStats::compute(&live, now))
    }
}
