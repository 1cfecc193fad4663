use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    Done,
}

impl TaskStatus {
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Todo => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::Done => "DONE",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

/// Shared scale for importance and urgency.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "task_level", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Low,
    #[default]
    Normal,
    High,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Low => "LOW",
            Level::Normal => "NORMAL",
            Level::High => "HIGH",
        }
    }
}

/// `tasks` row without its children.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub importance: Level,
    pub urgency: Level,
    pub due_date: Option<OffsetDateTime>,
    pub reminder: Option<OffsetDateTime>,
    pub category_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub task_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub name: String,
    pub url: String,
}

/// A task as returned by the API, children included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub importance: Level,
    pub urgency: Level,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reminder: Option<OffsetDateTime>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn from_parts(
        row: TaskRow,
        subtasks: Vec<Subtask>,
        notes: Vec<Note>,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            importance: row.importance,
            urgency: row.urgency,
            due_date: row.due_date,
            reminder: row.reminder,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            notes,
            attachments,
            subtasks,
        }
    }
}

/// Validated input for a new task. Status always starts at `TODO`.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub importance: Level,
    pub urgency: Level,
    pub due_date: Option<OffsetDateTime>,
    pub reminder: Option<OffsetDateTime>,
    pub category_id: Option<Uuid>,
}

/// Field replacement for an existing task.
///
/// `None` leaves a field alone; for nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub importance: Option<Level>,
    pub urgency: Option<Level>,
    pub due_date: Option<Option<OffsetDateTime>>,
    pub reminder: Option<Option<OffsetDateTime>>,
    pub category_id: Option<Option<Uuid>>,
    /// When set, the update only applies if the row still carries this `updated_at`.
    pub expected_updated_at: Option<OffsetDateTime>,
}

impl TaskPatch {
    pub fn is_stale(&self, row: &TaskRow) -> bool {
        self.expected_updated_at
            .is_some_and(|expected| expected != row.updated_at)
    }

    pub fn apply(self, row: &mut TaskRow) {
        if let Some(v) = self.title {
            row.title = v;
        }
        if let Some(v) = self.description {
            row.description = v;
        }
        if let Some(v) = self.status {
            row.status = v;
        }
        if let Some(v) = self.priority {
            row.priority = v;
        }
        if let Some(v) = self.importance {
            row.importance = v;
        }
        if let Some(v) = self.urgency {
            row.urgency = v;
        }
        if let Some(v) = self.due_date {
            row.due_date = v;
        }
        if let Some(v) = self.reminder {
            row.reminder = v;
        }
        if let Some(v) = self.category_id {
            row.category_id = v;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubtaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl SubtaskPatch {
    pub fn apply(self, subtask: &mut Subtask) {
        if let Some(v) = self.title {
            subtask.title = v;
        }
        if let Some(v) = self.completed {
            subtask.completed = v;
        }
    }
}
