//! Derived views over a todo collection.
//!
//! The same filter, search and sort rules back the list endpoint and the
//! client-side cache, so both always agree on what a view contains.

use std::cmp::Ordering;
use std::sync::OnceLock;

use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use serde::{Deserialize, Serialize};

use crate::models::todo::TodoItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Created,
    Title,
    Completed,
    Priority,
    DueDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewCriteria {
    #[serde(default)]
    pub filter: FilterMode,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub search: String,
}

pub fn matches_filter(todo: &TodoItem, filter: FilterMode) -> bool {
    match filter {
        FilterMode::All => true,
        FilterMode::Active => !todo.is_completed,
        FilterMode::Completed => todo.is_completed,
    }
}

/// Case-insensitive substring match on title or description.
/// A blank query matches everything; otherwise the query is matched as typed.
pub fn matches_search(todo: &TodoItem, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    todo.title.to_lowercase().contains(&needle)
        || todo.description.to_lowercase().contains(&needle)
}

static TITLE_COLLATOR: OnceLock<Option<CollatorBorrowed<'static>>> = OnceLock::new();

fn title_collator() -> Option<&'static CollatorBorrowed<'static>> {
    TITLE_COLLATOR
        .get_or_init(|| match Collator::try_new(Default::default(), CollatorOptions::default()) {
            Ok(collator) => Some(collator),
            Err(err) => {
                tracing::warn!(error = %err, "no collation data, sorting titles by lower case");
                None
            }
        })
        .as_ref()
}

/// Unicode root collation, ties broken by the raw title.
fn compare_titles(a: &str, b: &str) -> Ordering {
    let collated = match title_collator() {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    };
    collated.then_with(|| a.cmp(b))
}

/// Orders two todos under `sort`.
///
/// Undated todos go after dated ones whichever the direction.
pub fn compare(a: &TodoItem, b: &TodoItem, sort: SortSpec) -> Ordering {
    let ordering = match sort.field {
        SortField::Created => a.created_at.cmp(&b.created_at),
        SortField::Title => compare_titles(&a.title, &b.title),
        SortField::Completed => a.is_completed.cmp(&b.is_completed),
        SortField::Priority => a.priority.cmp(&b.priority),
        SortField::DueDate => match (&a.due_date, &b.due_date) {
            (Some(a_due), Some(b_due)) => a_due.cmp(b_due),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };

    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Filters, searches and sorts `todos`. The sort is stable.
pub fn derive_view(todos: Option<&[TodoItem]>, criteria: &ViewCriteria) -> Vec<TodoItem> {
    let Some(todos) = todos else {
        return Vec::new();
    };

    let mut view: Vec<TodoItem> = todos
        .iter()
        .filter(|todo| matches_filter(todo, criteria.filter))
        .filter(|todo| matches_search(todo, &criteria.search))
        .cloned()
        .collect();

    view.sort_by(|a, b| compare(a, b, criteria.sort));
    view
}
