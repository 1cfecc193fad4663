use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::repo_types::{
    Attachment, NewTask, Note, Subtask, SubtaskPatch, Task, TaskPatch, TaskRow,
};
use crate::error::{RepoError, RepoResult};

pub const TODO_NOT_FOUND: &str = "Todo not found";
pub const SUBTASK_NOT_FOUND: &str = "Subtask not found";
pub const TODO_STALE: &str = "Todo was modified by another request";

/// User-scoped task storage. Every method filters by `user_id`; a task owned by someone
/// else is reported exactly like a task that does not exist.
#[async_trait]
pub trait TodoRepo: Send + Sync {
    async fn create(&self, user_id: Uuid, new: NewTask) -> RepoResult<Task>;
    /// Newest first.
    async fn list_all(&self, user_id: Uuid) -> RepoResult<Vec<Task>>;
    async fn get_one(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<Task>;
    async fn update(&self, user_id: Uuid, task_id: Uuid, patch: TaskPatch) -> RepoResult<Task>;
    /// Removes the task together with its subtasks, notes and attachments.
    async fn delete(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<()>;

    async fn create_subtask(&self, user_id: Uuid, task_id: Uuid, title: String)
        -> RepoResult<Subtask>;
    async fn update_subtask(
        &self,
        user_id: Uuid,
        subtask_id: Uuid,
        patch: SubtaskPatch,
    ) -> RepoResult<Subtask>;
    async fn delete_subtask(&self, user_id: Uuid, subtask_id: Uuid) -> RepoResult<()>;
}

#[derive(Clone)]
pub struct PgTodoRepo {
    db: PgPool,
}

impl PgTodoRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn group_by_task<T>(items: Vec<T>, key: impl Fn(&T) -> Uuid) -> HashMap<Uuid, Vec<T>> {
    let mut out: HashMap<Uuid, Vec<T>> = HashMap::new();
    for item in items {
        out.entry(key(&item)).or_default().push(item);
    }
    out
}

/// Loads children for `rows` and builds API tasks, preserving row order.
async fn assemble(conn: &mut PgConnection, rows: Vec<TaskRow>) -> RepoResult<Vec<Task>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let subtasks = sqlx::query_as::<_, Subtask>(
        r#"
        SELECT id, task_id, title, completed
          FROM subtasks
         WHERE task_id = ANY($1)
         ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let notes = sqlx::query_as::<_, Note>(
        r#"
        SELECT id, task_id, content, created_at
          FROM notes
         WHERE task_id = ANY($1)
         ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let attachments = sqlx::query_as::<_, Attachment>(
        r#"
        SELECT id, task_id, name, url
          FROM attachments
         WHERE task_id = ANY($1)
         ORDER BY name ASC, id ASC
        "#,
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let mut subtasks = group_by_task(subtasks, |s| s.task_id);
    let mut notes = group_by_task(notes, |n| n.task_id);
    let mut attachments = group_by_task(attachments, |a| a.task_id);

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            Task::from_parts(
                row,
                subtasks.remove(&id).unwrap_or_default(),
                notes.remove(&id).unwrap_or_default(),
                attachments.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

async fn assemble_one(conn: &mut PgConnection, row: TaskRow) -> RepoResult<Task> {
    assemble(conn, vec![row])
        .await?
        .pop()
        .ok_or(RepoError::NotFound(TODO_NOT_FOUND))
}

/// Locks the task row for the rest of the transaction if `user_id` owns it.
async fn lock_owned_task(
    conn: &mut PgConnection,
    user_id: Uuid,
    task_id: Uuid,
) -> RepoResult<TaskRow> {
    sqlx::query_as::<_, TaskRow>(
        r#"
        SELECT id, user_id, title, description, status, priority, importance, urgency,
               due_date, reminder, category_id, created_at, updated_at
          FROM tasks
         WHERE id = $1 AND user_id = $2
         FOR UPDATE
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepoError::NotFound(TODO_NOT_FOUND))
}

/// Subtask lookup joined through its task to the owner.
async fn lock_owned_subtask(
    conn: &mut PgConnection,
    user_id: Uuid,
    subtask_id: Uuid,
) -> RepoResult<Subtask> {
    sqlx::query_as::<_, Subtask>(
        r#"
        SELECT s.id, s.task_id, s.title, s.completed
          FROM subtasks s
          JOIN tasks t ON t.id = s.task_id
         WHERE s.id = $1 AND t.user_id = $2
         FOR UPDATE OF s
        "#,
    )
    .bind(subtask_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepoError::NotFound(SUBTASK_NOT_FOUND))
}

#[async_trait]
impl TodoRepo for PgTodoRepo {
    async fn create(&self, user_id: Uuid, new: NewTask) -> RepoResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (id, user_id, title, description, priority, importance, urgency,
                               due_date, reminder, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, title, description, status, priority, importance, urgency,
                      due_date, reminder, category_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.priority)
        .bind(new.importance)
        .bind(new.urgency)
        .bind(new.due_date)
        .bind(new.reminder)
        .bind(new.category_id)
        .fetch_one(&self.db)
        .await?;

        Ok(Task::from_parts(row, Vec::new(), Vec::new(), Vec::new()))
    }

    async fn list_all(&self, user_id: Uuid) -> RepoResult<Vec<Task>> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, title, description, status, priority, importance, urgency,
                   due_date, reminder, category_id, created_at, updated_at
              FROM tasks
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        assemble(&mut conn, rows).await
    }

    async fn get_one(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<Task> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, user_id, title, description, status, priority, importance, urgency,
                   due_date, reminder, category_id, created_at, updated_at
              FROM tasks
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepoError::NotFound(TODO_NOT_FOUND))?;
        assemble_one(&mut conn, row).await
    }

    async fn update(&self, user_id: Uuid, task_id: Uuid, patch: TaskPatch) -> RepoResult<Task> {
        let mut tx = self.db.begin().await?;
        let mut row = lock_owned_task(&mut tx, user_id, task_id).await?;
        if patch.is_stale(&row) {
            return Err(RepoError::Stale(TODO_STALE));
        }
        patch.apply(&mut row);

        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
               SET title = $3, description = $4, status = $5, priority = $6,
                   importance = $7, urgency = $8, due_date = $9, reminder = $10,
                   category_id = $11, updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, priority, importance, urgency,
                      due_date, reminder, category_id, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.status)
        .bind(row.priority)
        .bind(row.importance)
        .bind(row.urgency)
        .bind(row.due_date)
        .bind(row.reminder)
        .bind(row.category_id)
        .fetch_one(&mut *tx)
        .await?;

        let task = assemble_one(&mut tx, row).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn delete(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<()> {
        let mut tx = self.db.begin().await?;
        lock_owned_task(&mut tx, user_id, task_id).await?;

        // notes and attachments go through ON DELETE CASCADE
        sqlx::query("DELETE FROM subtasks WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create_subtask(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        title: String,
    ) -> RepoResult<Subtask> {
        let mut tx = self.db.begin().await?;
        lock_owned_task(&mut tx, user_id, task_id).await?;
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            INSERT INTO subtasks (id, task_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, title, completed
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(task_id)
        .bind(&title)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(subtask)
    }

    async fn update_subtask(
        &self,
        user_id: Uuid,
        subtask_id: Uuid,
        patch: SubtaskPatch,
    ) -> RepoResult<Subtask> {
        let mut tx = self.db.begin().await?;
        let mut subtask = lock_owned_subtask(&mut tx, user_id, subtask_id).await?;
        patch.apply(&mut subtask);
        let subtask = sqlx::query_as::<_, Subtask>(
            r#"
            UPDATE subtasks
               SET title = $2, completed = $3
             WHERE id = $1
            RETURNING id, task_id, title, completed
            "#,
        )
        .bind(subtask_id)
        .bind(&subtask.title)
        .bind(subtask.completed)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(subtask)
    }

    async fn delete_subtask(&self, user_id: Uuid, subtask_id: Uuid) -> RepoResult<()> {
        let mut tx = self.db.begin().await?;
        lock_owned_subtask(&mut tx, user_id, subtask_id).await?;
        sqlx::query("DELETE FROM subtasks WHERE id = $1")
            .bind(subtask_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_task_keeps_order_within_groups() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let grouped = group_by_task(vec![(a, 1), (b, 2), (a, 3)], |(id, _)| *id);
        assert_eq!(grouped[&a], vec![(a, 1), (a, 3)]);
        assert_eq!(grouped[&b], vec![(b, 2)]);
    }
}
