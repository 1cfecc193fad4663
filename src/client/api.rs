use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::ClientError;
use crate::{
    auth::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
    todos::{
        dto::{
            CreateSubtaskRequest, CreateTodoRequest, MessageResponse, UpdateSubtaskRequest,
            UpdateTodoRequest,
        },
        repo_types::{Subtask, Task},
    },
};

/// The task operations a [`TodoBoard`](super::TodoBoard) needs from a server.
#[async_trait]
pub trait TodoBackend: Send + Sync {
    async fn list_todos(&self) -> Result<Vec<Task>, ClientError>;
    async fn create_todo(&self, req: &CreateTodoRequest) -> Result<Task, ClientError>;
    async fn update_todo(&self, id: Uuid, req: &UpdateTodoRequest) -> Result<Task, ClientError>;
    async fn delete_todo(&self, id: Uuid) -> Result<(), ClientError>;
    async fn create_subtask(&self, todo_id: Uuid, title: &str) -> Result<Subtask, ClientError>;
    async fn update_subtask(
        &self,
        id: Uuid,
        req: &UpdateSubtaskRequest,
    ) -> Result<Subtask, ClientError>;
    async fn delete_subtask(&self, id: Uuid) -> Result<(), ClientError>;
}

/// HTTP client for the REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authed(&self, rb: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(rb.bearer_auth(token))
    }

    async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res.json::<T>().await?);
        }
        let message = match res.json::<MessageResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        debug!(status = status.as_u16(), %message, "api error");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Registers and keeps the returned token for later calls.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthResponse, ClientError> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.map(str::to_string),
        };
        let res = self
            .http
            .post(self.url("/auth/register"))
            .json(&body)
            .send()
            .await?;
        let auth: AuthResponse = Self::decode(res).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Logs in and keeps the returned token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let res = self
            .http
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await?;
        let auth: AuthResponse = Self::decode(res).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        let res = self.authed(self.http.get(self.url("/auth/me")))?.send().await?;
        Self::decode(res).await
    }

    pub async fn get_todo(&self, id: Uuid) -> Result<Task, ClientError> {
        let res = self
            .authed(self.http.get(self.url(&format!("/todos/{id}"))))?
            .send()
            .await?;
        Self::decode(res).await
    }
}

#[async_trait]
impl TodoBackend for ApiClient {
    async fn list_todos(&self) -> Result<Vec<Task>, ClientError> {
        let res = self.authed(self.http.get(self.url("/todos")))?.send().await?;
        Self::decode(res).await
    }

    async fn create_todo(&self, req: &CreateTodoRequest) -> Result<Task, ClientError> {
        let res = self
            .authed(self.http.post(self.url("/todos")))?
            .json(req)
            .send()
            .await?;
        Self::decode(res).await
    }

    async fn update_todo(&self, id: Uuid, req: &UpdateTodoRequest) -> Result<Task, ClientError> {
        let res = self
            .authed(self.http.put(self.url(&format!("/todos/{id}"))))?
            .json(req)
            .send()
            .await?;
        Self::decode(res).await
    }

    async fn delete_todo(&self, id: Uuid) -> Result<(), ClientError> {
        let res = self
            .authed(self.http.delete(self.url(&format!("/todos/{id}"))))?
            .send()
            .await?;
        Self::decode::<MessageResponse>(res).await.map(|_| ())
    }

    async fn create_subtask(&self, todo_id: Uuid, title: &str) -> Result<Subtask, ClientError> {
        let body = CreateSubtaskRequest {
            title: title.to_string(),
        };
        let res = self
            .authed(self.http.post(self.url(&format!("/todos/{todo_id}/subtasks"))))?
            .json(&body)
            .send()
            .await?;
        Self::decode(res).await
    }

    async fn update_subtask(
        &self,
        id: Uuid,
        req: &UpdateSubtaskRequest,
    ) -> Result<Subtask, ClientError> {
        let res = self
            .authed(self.http.put(self.url(&format!("/todos/subtasks/{id}"))))?
            .json(req)
            .send()
            .await?;
        Self::decode(res).await
    }

    async fn delete_subtask(&self, id: Uuid) -> Result<(), ClientError> {
        let res = self
            .authed(self.http.delete(self.url(&format!("/todos/subtasks/{id}"))))?
            .send()
            .await?;
        Self::decode::<MessageResponse>(res).await.map(|_| ())
    }
}
