//! Client-side state and views: a typed HTTP client, the local task list, the task form
//! contract, the Eisenhower matrix, export and reminders.

pub mod api;
pub mod board;
pub mod export;
pub mod matrix;
pub mod reminders;
pub mod view;

use uuid::Uuid;

pub use api::{ApiClient, TodoBackend};
pub use board::TodoBoard;
pub use matrix::{EisenhowerMatrix, Quadrant};
pub use view::TodoForm;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("not logged in")]
    NotLoggedIn,
    #[error("task {0} is not on the board")]
    UnknownTask(Uuid),
    #[error("subtask {0} is not on the board")]
    UnknownSubtask(Uuid),
    #[error("cannot format date: {0}")]
    Date(#[from] time::error::Format),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
