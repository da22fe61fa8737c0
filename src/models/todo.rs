use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordinal urgency of a todo. Serialized as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
}

impl Priority {
    pub fn value(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid priority `{0}`, expected 0-2 or Low/Medium/High")]
pub struct InvalidPriority(pub String);

impl TryFrom<i32> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::Medium),
            2 => Ok(Priority::High),
            other => Err(InvalidPriority(other.to_string())),
        }
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<i32>() {
            return Priority::try_from(number);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(InvalidPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

struct PriorityVisitor;

impl<'de> Visitor<'de> for PriorityVisitor {
    type Value = Priority;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a priority as 0, 1, 2 or Low, Medium, High")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Priority, E> {
        i32::try_from(v)
            .ok()
            .and_then(|v| Priority::try_from(v).ok())
            .ok_or_else(|| E::custom(InvalidPriority(v.to_string())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Priority, E> {
        i32::try_from(v)
            .ok()
            .and_then(|v| Priority::try_from(v).ok())
            .ok_or_else(|| E::custom(InvalidPriority(v.to_string())))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Priority, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriorityVisitor)
    }
}

/// A single task owned by exactly one user, as seen at the API boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub user_id: String,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Validated input for a new todo.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Validated full replacement of a todo's mutable fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoChanges {
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl TodoChanges {
    /// The changes that re-send `todo` as is, with completion flipped.
    pub fn toggled(todo: &TodoItem) -> Self {
        Self {
            title: todo.title.clone(),
            description: todo.description.clone(),
            is_completed: !todo.is_completed,
            priority: todo.priority,
            due_date: todo.due_date,
            tags: todo.tags.clone(),
        }
    }
}

/// Predicates for listing a user's todos, AND-combined.
///
/// Archived todos are left out unless `include_archived` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoFilter {
    pub is_completed: Option<bool>,
    pub priority: Option<Priority>,
    /// Keeps todos due at or before this instant; undated todos never match.
    pub due_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    /// Substring of the serialized tag blob.
    pub tags: Option<String>,
    pub include_archived: bool,
}

/// Tags are persisted as a JSON array string.
pub fn encode_tags(tags: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(tags)
}

pub fn decode_tags(blob: Option<&str>) -> Result<Vec<String>, serde_json::Error> {
    match blob.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(blob) => serde_json::from_str(blob),
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = crate::repository::schema::todos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TodoRow {
    pub id: i32,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub priority: i32,
    pub due_date: Option<NaiveDateTime>,
    pub tags: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub is_archived: bool,
    pub archived_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::repository::schema::todos)]
pub struct NewTodoRow<'a> {
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub is_completed: bool,
    pub priority: i32,
    pub due_date: Option<NaiveDateTime>,
    pub tags: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Every mutable column, written back after a lifecycle transition.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = crate::repository::schema::todos, treat_none_as_null = true)]
pub struct TodoChangeset<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub is_completed: bool,
    pub priority: i32,
    pub due_date: Option<NaiveDateTime>,
    pub tags: Option<String>,
    pub completed_at: Option<NaiveDateTime>,
    pub is_archived: bool,
    pub archived_at: Option<NaiveDateTime>,
}
