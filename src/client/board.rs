use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, error};
use uuid::Uuid;

use super::{
    matrix::EisenhowerMatrix,
    reminders::{due_reminders, Reminder},
    view::TodoForm,
    ClientError, TodoBackend,
};
use crate::todos::{
    dto::{UpdateSubtaskRequest, UpdateTodoRequest},
    repo_types::Task,
};

/// The signed-in user's tasks as the client sees them.
///
/// Every mutation goes through the backend first; the local list only changes once the
/// server has answered, and it is left untouched when the call fails.
pub struct TodoBoard<B> {
    backend: B,
    todos: Vec<Task>,
}

fn rfc3339(ts: Option<OffsetDateTime>) -> Result<Option<String>, time::error::Format> {
    ts.map(|t| t.format(&Rfc3339)).transpose()
}

/// The whole task sent back with one field changed.
fn echo(task: &Task) -> Result<UpdateTodoRequest, time::error::Format> {
    Ok(UpdateTodoRequest {
        title: Some(task.title.clone()),
        description: Some(task.description.clone()),
        status: Some(task.status),
        priority: Some(task.priority),
        importance: Some(task.importance),
        urgency: Some(task.urgency),
        due_date: Some(rfc3339(task.due_date)?),
        reminder: Some(rfc3339(task.reminder)?),
        category_id: Some(task.category_id),
        updated_at: Some(task.updated_at.format(&Rfc3339)?),
    })
}

impl<B: TodoBackend> TodoBoard<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            todos: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn todos(&self) -> &[Task] {
        &self.todos
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.todos.iter().find(|t| t.id == id)
    }

    fn position(&self, id: Uuid) -> Result<usize, ClientError> {
        self.todos
            .iter()
            .position(|t| t.id == id)
            .ok_or(ClientError::UnknownTask(id))
    }

    fn owner_of_subtask(&self, subtask_id: Uuid) -> Result<(usize, usize), ClientError> {
        self.todos
            .iter()
            .enumerate()
            .find_map(|(i, t)| {
                t.subtasks
                    .iter()
                    .position(|s| s.id == subtask_id)
                    .map(|j| (i, j))
            })
            .ok_or(ClientError::UnknownSubtask(subtask_id))
    }

    /// Replaces the local list with the server's.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        match self.backend.list_todos().await {
            Ok(todos) => {
                debug!(count = todos.len(), "tasks loaded");
                self.todos = todos;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to fetch tasks");
                Err(e)
            }
        }
    }

    /// Creates a task and puts it at the top of the list.
    pub async fn add(&mut self, form: TodoForm) -> Result<&Task, ClientError> {
        let req = form.into_create()?;
        match self.backend.create_todo(&req).await {
            Ok(task) => {
                self.todos.insert(0, task);
                Ok(&self.todos[0])
            }
            Err(e) => {
                error!(error = %e, "failed to create task");
                Err(e)
            }
        }
    }

    async fn replace(&mut self, idx: usize, req: UpdateTodoRequest) -> Result<&Task, ClientError> {
        let id = self.todos[idx].id;
        match self.backend.update_todo(id, &req).await {
            Ok(task) => {
                self.todos[idx] = task;
                Ok(&self.todos[idx])
            }
            Err(e) => {
                error!(error = %e, %id, "failed to update task");
                Err(e)
            }
        }
    }

    /// Saves the form over an existing task; the entry is swapped for the server's version.
    pub async fn edit(&mut self, id: Uuid, form: TodoForm) -> Result<&Task, ClientError> {
        let idx = self.position(id)?;
        let mut req = form.into_update()?;
        req.updated_at = Some(self.todos[idx].updated_at.format(&Rfc3339)?);
        self.replace(idx, req).await
    }

    /// Flips TODO/DONE by sending the whole task back with the status changed.
    pub async fn toggle_status(&mut self, id: Uuid) -> Result<&Task, ClientError> {
        let idx = self.position(id)?;
        let mut req = echo(&self.todos[idx])?;
        req.status = Some(self.todos[idx].status.toggled());
        self.replace(idx, req).await
    }

    pub async fn remove(&mut self, id: Uuid) -> Result<(), ClientError> {
        if let Err(e) = self.backend.delete_todo(id).await {
            error!(error = %e, %id, "failed to delete task");
            return Err(e);
        }
        self.todos.retain(|t| t.id != id);
        Ok(())
    }

    pub async fn add_subtask(&mut self, todo_id: Uuid, title: &str) -> Result<(), ClientError> {
        let idx = self.position(todo_id)?;
        match self.backend.create_subtask(todo_id, title).await {
            Ok(subtask) => {
                self.todos[idx].subtasks.push(subtask);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, %todo_id, "failed to add subtask");
                Err(e)
            }
        }
    }

    pub async fn set_subtask_completed(
        &mut self,
        subtask_id: Uuid,
        completed: bool,
    ) -> Result<(), ClientError> {
        let (i, j) = self.owner_of_subtask(subtask_id)?;
        let req = UpdateSubtaskRequest {
            title: None,
            completed: Some(completed),
        };
        match self.backend.update_subtask(subtask_id, &req).await {
            Ok(subtask) => {
                self.todos[i].subtasks[j] = subtask;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, %subtask_id, "failed to update subtask");
                Err(e)
            }
        }
    }

    pub async fn remove_subtask(&mut self, subtask_id: Uuid) -> Result<(), ClientError> {
        let (i, j) = self.owner_of_subtask(subtask_id)?;
        if let Err(e) = self.backend.delete_subtask(subtask_id).await {
            error!(error = %e, %subtask_id, "failed to delete subtask");
            return Err(e);
        }
        self.todos[i].subtasks.remove(j);
        Ok(())
    }

    pub fn matrix(&self) -> EisenhowerMatrix<'_> {
        EisenhowerMatrix::partition(&self.todos)
    }

    pub fn due_reminders(&self, now: OffsetDateTime) -> Vec<Reminder> {
        due_reminders(&self.todos, now)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::AppError,
        memory::MemoryStore,
        todos::{
            dto::CreateTodoRequest,
            repo_types::{Level, Priority, Subtask, TaskStatus},
            TodoRepo,
        },
    };

    fn api_err(e: impl Into<AppError>) -> ClientError {
        let e = e.into();
        ClientError::Api {
            status: e.status_code().as_u16(),
            message: e.to_string(),
        }
    }

    /// Runs the same conversions the HTTP handlers do, against an in-memory store.
    struct StoreBackend {
        store: MemoryStore,
        user: Uuid,
        offline: AtomicBool,
    }

    impl StoreBackend {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                user: Uuid::new_v4(),
                offline: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<(), ClientError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(ClientError::Api {
                    status: 503,
                    message: "offline".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TodoBackend for StoreBackend {
        async fn list_todos(&self) -> Result<Vec<Task>, ClientError> {
            self.check()?;
            self.store.list_all(self.user).await.map_err(api_err)
        }

        async fn create_todo(&self, req: &CreateTodoRequest) -> Result<Task, ClientError> {
            self.check()?;
            let new = req.clone().into_new_task().map_err(api_err)?;
            TodoRepo::create(&self.store, self.user, new)
                .await
                .map_err(api_err)
        }

        async fn update_todo(
            &self,
            id: Uuid,
            req: &UpdateTodoRequest,
        ) -> Result<Task, ClientError> {
            self.check()?;
            let patch = req.clone().into_patch().map_err(api_err)?;
            self.store.update(self.user, id, patch).await.map_err(api_err)
        }

        async fn delete_todo(&self, id: Uuid) -> Result<(), ClientError> {
            self.check()?;
            self.store.delete(self.user, id).await.map_err(api_err)
        }

        async fn create_subtask(&self, todo_id: Uuid, title: &str) -> Result<Subtask, ClientError> {
            self.check()?;
            self.store
                .create_subtask(self.user, todo_id, title.to_string())
                .await
                .map_err(api_err)
        }

        async fn update_subtask(
            &self,
            id: Uuid,
            req: &UpdateSubtaskRequest,
        ) -> Result<Subtask, ClientError> {
            self.check()?;
            let patch = req.clone().into_patch().map_err(api_err)?;
            self.store
                .update_subtask(self.user, id, patch)
                .await
                .map_err(api_err)
        }

        async fn delete_subtask(&self, id: Uuid) -> Result<(), ClientError> {
            self.check()?;
            self.store.delete_subtask(self.user, id).await.map_err(api_err)
        }
    }

    fn form(title: &str) -> TodoForm {
        TodoForm {
            title: title.into(),
            ..TodoForm::blank()
        }
    }

    #[tokio::test]
    async fn add_prepends_server_task() {
        let mut board = TodoBoard::new(StoreBackend::new());
        board.add(form("first")).await.unwrap();
        let second = board.add(form("second")).await.unwrap().clone();
        assert_eq!(second.status, TaskStatus::Todo);
        assert_eq!(second.priority, Priority::Low);
        let titles: Vec<_> = board.todos().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);
    }

    #[tokio::test]
    async fn load_matches_server_order() {
        let mut board = TodoBoard::new(StoreBackend::new());
        board.add(form("a")).await.unwrap();
        board.add(form("b")).await.unwrap();
        let local: Vec<_> = board.todos().iter().map(|t| t.id).collect();
        board.load().await.unwrap();
        let fetched: Vec<_> = board.todos().iter().map(|t| t.id).collect();
        assert_eq!(local, fetched);
    }

    #[tokio::test]
    async fn double_toggle_restores_status() {
        let mut board = TodoBoard::new(StoreBackend::new());
        let id = board.add(form("flip")).await.unwrap().id;
        assert_eq!(board.toggle_status(id).await.unwrap().status, TaskStatus::Done);
        assert_eq!(board.toggle_status(id).await.unwrap().status, TaskStatus::Todo);
        let server = board.backend().store.get_one(board.backend().user, id).await.unwrap();
        assert_eq!(server.status, TaskStatus::Todo);
        assert_eq!(board.get(id), Some(&server));
    }

    #[tokio::test]
    async fn edit_replaces_entry_with_server_version() {
        let mut board = TodoBoard::new(StoreBackend::new());
        let id = board.add(form("draft")).await.unwrap().id;
        let mut f = TodoForm::from_task(board.get(id).unwrap());
        f.title = "final".into();
        f.importance = Level::High;
        let edited = board.edit(id, f).await.unwrap().clone();
        assert_eq!(edited.title, "final");
        assert_eq!(edited.importance, Level::High);
        assert_eq!(board.todos().len(), 1);
    }

    #[tokio::test]
    async fn edit_after_foreign_change_is_stale() {
        let mut board = TodoBoard::new(StoreBackend::new());
        let id = board.add(form("shared")).await.unwrap().id;
        let user = board.backend().user;
        board
            .backend()
            .store
            .update(user, id, Default::default())
            .await
            .unwrap();
        let err = board.edit(id, form("mine")).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(board.get(id).unwrap().title, "shared");
    }

    #[tokio::test]
    async fn failures_leave_the_list_alone() {
        let mut board = TodoBoard::new(StoreBackend::new());
        let id = board.add(form("keep")).await.unwrap().id;
        let before = board.todos().to_vec();
        board.backend().offline.store(true, Ordering::SeqCst);

        assert!(board.add(form("lost")).await.is_err());
        assert!(board.toggle_status(id).await.is_err());
        assert!(board.remove(id).await.is_err());
        assert!(board.load().await.is_err());
        assert_eq!(board.todos(), before.as_slice());
    }

    #[tokio::test]
    async fn remove_filters_locally() {
        let mut board = TodoBoard::new(StoreBackend::new());
        let a = board.add(form("a")).await.unwrap().id;
        let b = board.add(form("b")).await.unwrap().id;
        board.remove(a).await.unwrap();
        assert_eq!(board.todos().len(), 1);
        assert_eq!(board.todos()[0].id, b);
    }

    #[tokio::test]
    async fn subtasks_follow_the_server() {
        let mut board = TodoBoard::new(StoreBackend::new());
        let id = board.add(form("parent")).await.unwrap().id;
        board.add_subtask(id, "step").await.unwrap();
        let sub = board.get(id).unwrap().subtasks[0].id;
        board.set_subtask_completed(sub, true).await.unwrap();
        assert!(board.get(id).unwrap().subtasks[0].completed);
        board.remove_subtask(sub).await.unwrap();
        assert!(board.get(id).unwrap().subtasks.is_empty());
        assert!(matches!(
            board.remove_subtask(sub).await,
            Err(ClientError::UnknownSubtask(_))
        ));
    }

    #[tokio::test]
    async fn unknown_task_is_reported() {
        let mut board = TodoBoard::new(StoreBackend::new());
        let missing = Uuid::new_v4();
        assert!(matches!(
            board.toggle_status(missing).await,
            Err(ClientError::UnknownTask(id)) if id == missing
        ));
    }
}
