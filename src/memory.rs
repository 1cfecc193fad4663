//! In-process implementation of [`UserRepo`] and [`TodoRepo`].
//!
//! Used by the test suites and by `AppState::in_memory`. Each mutating call holds the
//! write lock for its whole duration, which gives the same all-or-nothing behaviour as a
//! database transaction.

use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{UserRepo, USER_EXISTS},
        repo_types::{NewUser, User},
    },
    error::{RepoError, RepoResult},
    todos::{
        repo::{TodoRepo, SUBTASK_NOT_FOUND, TODO_NOT_FOUND, TODO_STALE},
        repo_types::{
            Attachment, NewTask, Note, Subtask, SubtaskPatch, Task, TaskPatch, TaskRow,
            TaskStatus,
        },
    },
};

#[derive(Default)]
struct Data {
    users: Vec<User>,
    // insertion order == creation order
    tasks: Vec<TaskRow>,
    subtasks: Vec<Subtask>,
    notes: Vec<Note>,
    attachments: Vec<Attachment>,
}

impl Data {
    fn owned_task(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == task_id && t.user_id == user_id)
            .ok_or(RepoError::NotFound(TODO_NOT_FOUND))
    }

    fn owned_subtask(&self, user_id: Uuid, subtask_id: Uuid) -> RepoResult<usize> {
        self.subtasks
            .iter()
            .position(|s| {
                s.id == subtask_id
                    && self
                        .tasks
                        .iter()
                        .any(|t| t.id == s.task_id && t.user_id == user_id)
            })
            .ok_or(RepoError::NotFound(SUBTASK_NOT_FOUND))
    }

    fn build(&self, row: &TaskRow) -> Task {
        Task::from_parts(
            row.clone(),
            self.subtasks
                .iter()
                .filter(|s| s.task_id == row.id)
                .cloned()
                .collect(),
            self.notes
                .iter()
                .filter(|n| n.task_id == row.id)
                .cloned()
                .collect(),
            self.attachments
                .iter()
                .filter(|a| a.task_id == row.id)
                .cloned()
                .collect(),
        )
    }
}

/// Clock that never repeats or goes backwards, so `updated_at` always changes on write.
fn tick(previous: Option<OffsetDateTime>) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Data>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.data.read().await.users.len()
    }

    /// Number of stored subtasks belonging to `task_id`, whoever owns it.
    pub async fn subtask_count(&self, task_id: Uuid) -> usize {
        self.data
            .read()
            .await
            .subtasks
            .iter()
            .filter(|s| s.task_id == task_id)
            .count()
    }

    /// Notes have no public write endpoint; this seeds them.
    pub async fn insert_note(&self, task_id: Uuid, content: &str) -> Note {
        let note = Note {
            id: Uuid::new_v4(),
            task_id,
            content: content.into(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.data.write().await.notes.push(note.clone());
        note
    }

    /// Attachments have no public write endpoint; this seeds them.
    pub async fn insert_attachment(&self, task_id: Uuid, name: &str, url: &str) -> Attachment {
        let attachment = Attachment {
            id: Uuid::new_v4(),
            task_id,
            name: name.into(),
            url: url.into(),
        };
        self.data.write().await.attachments.push(attachment.clone());
        attachment
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> RepoResult<User> {
        let mut data = self.data.write().await;
        if data.users.iter().any(|u| u.email == new.email) {
            return Err(RepoError::Conflict(USER_EXISTS));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            name: new.name,
            created_at: OffsetDateTime::now_utc(),
        };
        data.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TodoRepo for MemoryStore {
    async fn create(&self, user_id: Uuid, new: NewTask) -> RepoResult<Task> {
        let mut data = self.data.write().await;
        let now = tick(data.tasks.last().map(|t| t.created_at));
        let row = TaskRow {
            id: Uuid::new_v4(),
            user_id,
            title: new.title,
            description: new.description,
            status: TaskStatus::Todo,
            priority: new.priority,
            importance: new.importance,
            urgency: new.urgency,
            due_date: new.due_date,
            reminder: new.reminder,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };
        data.tasks.push(row.clone());
        Ok(data.build(&row))
    }

    async fn list_all(&self, user_id: Uuid) -> RepoResult<Vec<Task>> {
        let data = self.data.read().await;
        Ok(data
            .tasks
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .map(|t| data.build(t))
            .collect())
    }

    async fn get_one(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<Task> {
        let data = self.data.read().await;
        let idx = data.owned_task(user_id, task_id)?;
        Ok(data.build(&data.tasks[idx]))
    }

    async fn update(&self, user_id: Uuid, task_id: Uuid, patch: TaskPatch) -> RepoResult<Task> {
        let mut data = self.data.write().await;
        let idx = data.owned_task(user_id, task_id)?;
        if patch.is_stale(&data.tasks[idx]) {
            return Err(RepoError::Stale(TODO_STALE));
        }
        let mut row = data.tasks[idx].clone();
        patch.apply(&mut row);
        row.updated_at = tick(Some(row.updated_at));
        data.tasks[idx] = row.clone();
        Ok(data.build(&row))
    }

    async fn delete(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<()> {
        let mut data = self.data.write().await;
        let idx = data.owned_task(user_id, task_id)?;
        data.tasks.remove(idx);
        data.subtasks.retain(|s| s.task_id != task_id);
        data.notes.retain(|n| n.task_id != task_id);
        data.attachments.retain(|a| a.task_id != task_id);
        Ok(())
    }

    async fn create_subtask(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        title: String,
    ) -> RepoResult<Subtask> {
        let mut data = self.data.write().await;
        data.owned_task(user_id, task_id)?;
        let subtask = Subtask {
            id: Uuid::new_v4(),
            task_id,
            title,
            completed: false,
        };
        data.subtasks.push(subtask.clone());
        Ok(subtask)
    }

    async fn update_subtask(
        &self,
        user_id: Uuid,
        subtask_id: Uuid,
        patch: SubtaskPatch,
    ) -> RepoResult<Subtask> {
        let mut data = self.data.write().await;
        let idx = data.owned_subtask(user_id, subtask_id)?;
        patch.apply(&mut data.subtasks[idx]);
        Ok(data.subtasks[idx].clone())
    }

    async fn delete_subtask(&self, user_id: Uuid, subtask_id: Uuid) -> RepoResult<()> {
        let mut data = self.data.write().await;
        let idx = data.owned_subtask(user_id, subtask_id)?;
        data.subtasks.remove(idx);
        Ok(())
    }
}
