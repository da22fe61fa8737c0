use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::engine::filter::{FilterMode, SortDirection, SortField, SortSpec, ViewCriteria};
use crate::models::todo::{NewTodo, Priority, TodoChanges, TodoFilter};
use crate::models::user::UserDto;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TAGS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(
        length(max = 10, message = "A todo can have at most 10 tags"),
        custom(function = "validate_tags")
    )]
    pub tags: Vec<String>,
}

impl CreateTodoRequest {
    pub fn into_new_todo(self) -> NewTodo {
        NewTodo {
            title: self.title.trim().to_string(),
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
            tags: trim_tags(self.tags),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: String,
    pub is_completed: bool,
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(
        length(max = 10, message = "A todo can have at most 10 tags"),
        custom(function = "validate_tags")
    )]
    pub tags: Vec<String>,
}

impl UpdateTodoRequest {
    pub fn into_changes(self) -> TodoChanges {
        TodoChanges {
            title: self.title.trim().to_string(),
            description: self.description,
            is_completed: self.is_completed,
            priority: self.priority,
            due_date: self.due_date,
            tags: trim_tags(self.tags),
        }
    }
}

impl From<TodoChanges> for UpdateTodoRequest {
    fn from(value: TodoChanges) -> Self {
        Self {
            title: value.title,
            description: value.description,
            is_completed: value.is_completed,
            priority: value.priority,
            due_date: value.due_date,
            tags: value.tags,
        }
    }
}

/// Query string of `GET /api/todos`.
///
/// The first six fields narrow the persisted set; `search`, `sort` and
/// `direction` reorder or narrow the result in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTodosQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SortDirection>,
}

impl ListTodosQuery {
    pub fn filter(&self) -> TodoFilter {
        TodoFilter {
            is_completed: self.is_completed,
            priority: self.priority,
            due_before: self.due_before,
            created_after: self.created_after,
            tags: self.tags.clone().filter(|tags| !tags.is_empty()),
            include_archived: self.include_archived,
        }
    }

    /// In-memory view criteria, present only when search or sorting was asked for.
    pub fn view(&self) -> Option<ViewCriteria> {
        let search = self.search.clone().unwrap_or_default();
        if search.trim().is_empty() && self.sort.is_none() && self.direction.is_none() {
            return None;
        }
        let defaults = SortSpec::default();
        Some(ViewCriteria {
            filter: FilterMode::All,
            sort: SortSpec {
                field: self.sort.unwrap_or(defaults.field),
                direction: self.direction.unwrap_or(defaults.direction),
            },
            search,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    #[validate(custom(function = "validate_name"))]
    pub first_name: String,
    #[validate(custom(function = "validate_name"))]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "validate_name"))]
    pub first_name: String,
    #[validate(custom(function = "validate_name"))]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

fn trim_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter().map(|tag| tag.trim().to_string()).collect()
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(error("required", "Title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(error("length", "Title too long"));
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn validate_tags(tags: &Vec<String>) -> Result<(), ValidationError> {
    if tags.iter().any(|tag| tag.trim().is_empty()) {
        return Err(error("blank_tag", "Tags cannot be empty"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(error("required", "Name is required"));
    }
    if name.chars().count() > 100 {
        return Err(error("length", "Name must be at most 100 characters"));
    }
    Ok(())
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 6 {
        return Err(error("length", "Password must be at least 6 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(error("digit", "Password must contain a digit"));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(error("lowercase", "Password must contain a lowercase letter"));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(error("uppercase", "Password must contain an uppercase letter"));
    }
    Ok(())
}
