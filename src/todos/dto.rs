use serde::{Deserialize, Deserializer, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{Level, NewTask, Priority, SubtaskPatch, TaskPatch, TaskStatus};
use crate::error::AppError;

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Accepts RFC 3339 timestamps or a bare `YYYY-MM-DD` (midnight UTC). Empty means unset.
pub fn parse_when(field: &str, raw: &str) -> Result<Option<OffsetDateTime>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(Some(ts));
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| Some(d.midnight().assume_utc()))
        .map_err(|_| AppError::validation(format!("Invalid date for {field}")))
}

fn required_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    Ok(title.to_string())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
}

impl CreateTodoRequest {
    pub fn into_new_task(self) -> Result<NewTask, AppError> {
        Ok(NewTask {
            title: required_title(&self.title)?,
            description: self.description,
            priority: self.priority.unwrap_or_default(),
            importance: self.importance.unwrap_or_default(),
            urgency: self.urgency.unwrap_or_default(),
            due_date: match self.due_date {
                Some(raw) => parse_when("dueDate", &raw)?,
                None => None,
            },
            reminder: match self.reminder {
                Some(raw) => parse_when("reminder", &raw)?,
                None => None,
            },
            category_id: self.category_id,
        })
    }
}

/// Body of `PUT /api/todos/:id`. Unknown keys (`id`, `userId`, `subtasks`, ...) are ignored,
/// so a client may send back a whole task with one field changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<Level>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Level>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<Uuid>>,
    /// Optimistic-concurrency precondition; the `updatedAt` the client last saw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UpdateTodoRequest {
    pub fn into_patch(self) -> Result<TaskPatch, AppError> {
        let when = |field: &str, v: Option<Option<String>>| -> Result<_, AppError> {
            Ok(match v {
                None => None,
                Some(None) => Some(None),
                Some(Some(raw)) => Some(parse_when(field, &raw)?),
            })
        };
        let expected_updated_at = match self.updated_at {
            Some(raw) => Some(
                OffsetDateTime::parse(raw.trim(), &Rfc3339)
                    .map_err(|_| AppError::validation("Invalid date for updatedAt"))?,
            ),
            None => None,
        };
        Ok(TaskPatch {
            title: self.title.as_deref().map(required_title).transpose()?,
            description: self.description,
            status: self.status,
            priority: self.priority,
            importance: self.importance,
            urgency: self.urgency,
            due_date: when("dueDate", self.due_date)?,
            reminder: when("reminder", self.reminder)?,
            category_id: self.category_id,
            expected_updated_at,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSubtaskRequest {
    #[serde(default)]
    pub title: String,
}

impl CreateSubtaskRequest {
    pub fn into_title(self) -> Result<String, AppError> {
        required_title(&self.title)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubtaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateSubtaskRequest {
    pub fn into_patch(self) -> Result<SubtaskPatch, AppError> {
        Ok(SubtaskPatch {
            title: self.title.as_deref().map(required_title).transpose()?,
            completed: self.completed,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
