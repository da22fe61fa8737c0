//! Completion and archive transitions.
//!
//! Two independent axes: `is_completed`/`completed_at` and
//! `is_archived`/`archived_at`. Each timestamp is non-null exactly when
//! its flag is set, and only these functions move either axis.

use chrono::{DateTime, Utc};

use crate::models::todo::{TodoChanges, TodoItem};

/// Moves the completion axis to `requested`.
///
/// `completed_at` is stamped on false -> true, cleared on true -> false,
/// and left alone when the flag does not change.
pub fn apply_completion(todo: &mut TodoItem, requested: bool, now: DateTime<Utc>) {
    match (todo.is_completed, requested) {
        (false, true) => todo.completed_at = Some(now),
        (true, false) => todo.completed_at = None,
        _ => {}
    }
    todo.is_completed = requested;
}

pub fn toggle(todo: &mut TodoItem, now: DateTime<Utc>) {
    let requested = !todo.is_completed;
    apply_completion(todo, requested, now);
}

/// Full replace of the mutable fields. Never touches the archive axis.
pub fn apply_update(todo: &mut TodoItem, changes: TodoChanges, now: DateTime<Utc>) {
    todo.title = changes.title;
    todo.description = changes.description;
    todo.priority = changes.priority;
    todo.due_date = changes.due_date;
    todo.tags = changes.tags;
    apply_completion(todo, changes.is_completed, now);
}

pub fn archive(todo: &mut TodoItem, now: DateTime<Utc>) {
    todo.is_archived = true;
    todo.archived_at = Some(now);
}

pub fn restore(todo: &mut TodoItem) {
    todo.is_archived = false;
    todo.archived_at = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::todo::Priority;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn todo(completed: bool) -> TodoItem {
        TodoItem {
            id: 7,
            title: "A".to_string(),
            description: String::new(),
            is_completed: completed,
            created_at: t0() - Duration::days(1),
            completed_at: completed.then(|| t0() - Duration::hours(5)),
            user_id: "user-1".to_string(),
            priority: Priority::Medium,
            due_date: None,
            tags: vec![],
            is_archived: false,
            archived_at: None,
        }
    }

    #[rstest]
    #[case(false, true, Some(t0()))]
    #[case(true, false, None)]
    #[case(true, true, Some(t0() - Duration::hours(5)))]
    #[case(false, false, None)]
    fn completion_transition_table(
        #[case] previous: bool,
        #[case] requested: bool,
        #[case] expected: Option<DateTime<Utc>>,
    ) {
        let mut item = todo(previous);
        apply_completion(&mut item, requested, t0());
        assert_eq!(item.is_completed, requested);
        assert_eq!(item.completed_at, expected);
    }

    #[test]
    fn repeated_toggles_keep_timestamp_in_step() {
        let mut item = todo(false);
        for step in 0..5 {
            toggle(&mut item, t0() + Duration::minutes(step));
            assert_eq!(item.completed_at.is_some(), item.is_completed);
        }
        assert!(item.is_completed);
        assert_eq!(item.completed_at, Some(t0() + Duration::minutes(4)));
    }

    #[test]
    fn update_replaces_fields_but_not_identity_or_archive_state() {
        let mut item = todo(false);
        archive(&mut item, t0());
        let created_at = item.created_at;

        apply_update(
            &mut item,
            TodoChanges {
                title: "B".to_string(),
                description: "details".to_string(),
                is_completed: true,
                priority: Priority::High,
                due_date: Some(t0() + Duration::days(2)),
                tags: vec!["work".to_string()],
            },
            t0(),
        );

        assert_eq!(item.id, 7);
        assert_eq!(item.user_id, "user-1");
        assert_eq!(item.created_at, created_at);
        assert_eq!(item.title, "B");
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.tags, vec!["work"]);
        assert_eq!(item.completed_at, Some(t0()));
        assert!(item.is_archived);
        assert_eq!(item.archived_at, Some(t0()));
    }

    #[test]
    fn archive_and_restore_move_only_the_archive_axis() {
        let mut item = todo(true);
        let completed_at = item.completed_at;

        archive(&mut item, t0());
        assert!(item.is_archived);
        assert_eq!(item.archived_at, Some(t0()));

        restore(&mut item);
        assert!(!item.is_archived);
        assert!(item.archived_at.is_none());
        assert!(item.is_completed);
        assert_eq!(item.completed_at, completed_at);
    }
}
