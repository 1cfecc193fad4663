use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime};
use uuid::Uuid;

use crate::todos::{
    dto::{CreateTodoRequest, UpdateTodoRequest},
    repo_types::{Level, Priority, Task, TaskStatus},
};

/// `YYYY-MM-DD`, the form's date representation.
pub fn format_day(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Editable fields of a task as the create/edit form holds them.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoForm {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<Date>,
    pub category_id: Option<Uuid>,
    pub importance: Level,
    pub urgency: Level,
    pub reminder: Option<OffsetDateTime>,
}

impl Default for TodoForm {
    fn default() -> Self {
        Self::blank()
    }
}

impl TodoForm {
    pub fn blank() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: Priority::Low,
            due_date: None,
            category_id: None,
            importance: Level::Normal,
            urgency: Level::Normal,
            reminder: None,
        }
    }

    /// Pre-fills the form for editing an existing task.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority,
            due_date: task.due_date.map(|d| d.date()),
            category_id: task.category_id,
            importance: task.importance,
            urgency: task.urgency,
            reminder: task.reminder,
        }
    }

    fn description(&self) -> Option<String> {
        let d = self.description.trim();
        (!d.is_empty()).then(|| d.to_string())
    }

    fn reminder(&self) -> Result<Option<String>, time::error::Format> {
        self.reminder.map(|r| r.format(&Rfc3339)).transpose()
    }

    pub fn into_create(self) -> Result<CreateTodoRequest, time::error::Format> {
        Ok(CreateTodoRequest {
            description: self.description(),
            reminder: self.reminder()?,
            priority: Some(self.priority),
            importance: Some(self.importance),
            urgency: Some(self.urgency),
            due_date: self.due_date.map(format_day),
            category_id: self.category_id,
            title: self.title,
        })
    }

    /// Every form field is sent; empty fields are sent as explicit nulls so they clear.
    pub fn into_update(self) -> Result<UpdateTodoRequest, time::error::Format> {
        Ok(UpdateTodoRequest {
            description: Some(self.description()),
            reminder: Some(self.reminder()?),
            priority: Some(self.priority),
            importance: Some(self.importance),
            urgency: Some(self.urgency),
            due_date: Some(self.due_date.map(format_day)),
            category_id: Some(self.category_id),
            title: Some(self.title),
            status: None,
            updated_at: None,
        })
    }
}

/// One-line rendering of a task for lists.
pub fn render_item(task: &Task) -> String {
    let check = match task.status {
        TaskStatus::Done => "[x]",
        TaskStatus::Todo => "[ ]",
    };
    let mut line = format!("{check} {}  ({})", task.title, task.priority.as_str());
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {}", format_day(due.date())));
    }
    if !task.subtasks.is_empty() {
        let done = task.subtasks.iter().filter(|s| s.completed).count();
        line.push_str(&format!("  {done}/{} subtasks", task.subtasks.len()));
    }
    line.push_str(&format!("  {}", task.id));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{date, datetime};

    fn task() -> Task {
        serde_json::from_value(json!({
            "id": Uuid::nil(),
            "userId": Uuid::nil(),
            "title": "Buy milk",
            "description": null,
            "status": "DONE",
            "priority": "HIGH",
            "importance": "HIGH",
            "urgency": "LOW",
            "dueDate": "2024-05-01T00:00:00Z",
            "reminder": "2024-04-30T08:00:00Z",
            "createdAt": "2024-04-01T09:00:00Z",
            "updatedAt": "2024-04-01T09:00:00Z",
            "subtasks": [
                { "id": Uuid::new_v4(), "taskId": Uuid::nil(), "title": "a", "completed": true },
                { "id": Uuid::new_v4(), "taskId": Uuid::nil(), "title": "b", "completed": false }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn blank_form_defaults() {
        let f = TodoForm::blank();
        assert_eq!(f.priority, Priority::Low);
        assert_eq!(f.importance, Level::Normal);
        assert_eq!(f.urgency, Level::Normal);
        assert!(f.title.is_empty() && f.due_date.is_none());
    }

    #[test]
    fn form_round_trips_through_a_task() {
        let f = TodoForm::from_task(&task());
        assert_eq!(f.due_date, Some(date!(2024 - 05 - 01)));
        assert_eq!(f.description, "");
        let req = f.into_create().unwrap();
        assert_eq!(req.due_date.as_deref(), Some("2024-05-01"));
        assert_eq!(req.reminder.as_deref(), Some("2024-04-30T08:00:00Z"));
        assert_eq!(req.description, None);
        assert_eq!(req.clone().into_new_task().unwrap().title, "Buy milk");
    }

    #[test]
    fn update_clears_emptied_fields() {
        let mut f = TodoForm::from_task(&task());
        f.due_date = None;
        let req = f.into_update().unwrap();
        let v = serde_json::to_value(&req).unwrap();
        assert!(v["dueDate"].is_null());
        assert!(v.get("status").is_none());
        let patch = req.into_patch().unwrap();
        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.reminder, Some(Some(datetime!(2024-04-30 8:00 UTC))));
    }

    #[test]
    fn renders_one_line() {
        let line = render_item(&task());
        assert!(line.starts_with("[x] Buy milk  (HIGH)  due 2024-05-01  1/2 subtasks"));
    }
}
