use std::collections::HashSet;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::todos::repo_types::Task;

/// How far ahead a reminder is considered due.
pub const REMINDER_WINDOW: Duration = Duration::minutes(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: Uuid,
    pub title: String,
    pub at: OffsetDateTime,
}

impl Reminder {
    pub fn message(&self) -> String {
        format!("Reminder: \"{}\" is due soon!", self.title)
    }
}

/// Tasks whose reminder is strictly after `now` and at most [`REMINDER_WINDOW`] away.
pub fn due_reminders(tasks: &[Task], now: OffsetDateTime) -> Vec<Reminder> {
    tasks
        .iter()
        .filter_map(|t| {
            let at = t.reminder?;
            (at > now && at - now <= REMINDER_WINDOW).then(|| Reminder {
                task_id: t.id,
                title: t.title.clone(),
                at,
            })
        })
        .collect()
}

/// Remembers what was already announced so a poller reports each reminder once.
#[derive(Debug, Default)]
pub struct ReminderTracker {
    seen: HashSet<(Uuid, OffsetDateTime)>,
}

impl ReminderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, due: Vec<Reminder>) -> Vec<Reminder> {
        due.into_iter()
            .filter(|r| self.seen.insert((r.task_id, r.at)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::{format_description::well_known::Rfc3339, macros::datetime};

    fn task(title: &str, reminder: Option<OffsetDateTime>) -> Task {
        let reminder = reminder.map(|r| r.format(&Rfc3339).unwrap());
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "userId": Uuid::nil(),
            "title": title,
            "status": "TODO",
            "priority": "LOW",
            "importance": "NORMAL",
            "urgency": "NORMAL",
            "reminder": reminder,
            "createdAt": "2024-04-01T09:00:00Z",
            "updatedAt": "2024-04-01T09:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn window_is_open_below_and_closed_above() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let tasks = vec![
            task("past", Some(now - Duration::minutes(1))),
            task("now", Some(now)),
            task("soon", Some(now + Duration::minutes(2))),
            task("edge", Some(now + Duration::minutes(5))),
            task("later", Some(now + Duration::minutes(6))),
            task("none", None),
        ];
        let due: Vec<_> = due_reminders(&tasks, now)
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(due, ["soon", "edge"]);
    }

    #[test]
    fn message_names_the_task() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let due = due_reminders(&[task("Buy milk", Some(now + Duration::minutes(1)))], now);
        assert_eq!(due[0].message(), "Reminder: \"Buy milk\" is due soon!");
    }

    #[test]
    fn tracker_reports_once() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let tasks = vec![task("soon", Some(now + Duration::minutes(3)))];
        let mut tracker = ReminderTracker::new();
        assert_eq!(tracker.fresh(due_reminders(&tasks, now)).len(), 1);
        let later = now + Duration::minutes(1);
        assert!(tracker.fresh(due_reminders(&tasks, later)).is_empty());
    }
}
