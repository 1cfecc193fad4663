use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{
        CreateSubtaskRequest, CreateTodoRequest, MessageResponse, UpdateSubtaskRequest,
        UpdateTodoRequest,
    },
    repo_types::{Subtask, Task},
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

// --- routers ---

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", post(create_todo).get(list_todos))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

pub fn subtask_routes() -> Router<AppState> {
    Router::new()
        .route("/todos/:id/subtasks", post(create_subtask))
        .route(
            "/todos/subtasks/:id",
            put(update_subtask).delete(delete_subtask),
        )
}

// --- todos ---

#[instrument(skip(state, body))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(body): ApiJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let new = body.into_new_task()?;
    let task = state.todos.create(user_id, new).await?;
    info!(%user_id, task_id = %task.id, "todo created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Task>>, AppError> {
    Ok(Json(state.todos.list_all(user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(state.todos.get_one(user_id, id).await?))
}

#[instrument(skip(state, body))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateTodoRequest>,
) -> Result<Json<Task>, AppError> {
    let patch = body.into_patch()?;
    let task = state.todos.update(user_id, id, patch).await?;
    info!(%user_id, task_id = %id, "todo updated");
    Ok(Json(task))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.todos.delete(user_id, id).await?;
    info!(%user_id, task_id = %id, "todo deleted");
    Ok(Json(MessageResponse::new("Todo deleted successfully")))
}

// --- subtasks ---

#[instrument(skip(state, body))]
pub async fn create_subtask(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(todo_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateSubtaskRequest>,
) -> Result<(StatusCode, Json<Subtask>), AppError> {
    let title = body.into_title()?;
    let subtask = state.todos.create_subtask(user_id, todo_id, title).await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

#[instrument(skip(state, body))]
pub async fn update_subtask(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateSubtaskRequest>,
) -> Result<Json<Subtask>, AppError> {
    let patch = body.into_patch()?;
    Ok(Json(state.todos.update_subtask(user_id, id, patch).await?))
}

#[instrument(skip(state))]
pub async fn delete_subtask(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.todos.delete_subtask(user_id, id).await?;
    Ok(Json(MessageResponse::new("Subtask deleted successfully")))
}
