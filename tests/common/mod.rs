#![allow(dead_code)]

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use taskboard::{app::build_app, client::ApiClient, memory::MemoryStore, state::AppState};

pub const PASSWORD: &str = "secret123";

/// The real router on an ephemeral port, backed by a fresh in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub store: MemoryStore,
    http: reqwest::Client,
}

pub async fn spawn() -> Result<TestServer> {
    let store = MemoryStore::new();
    let app = build_app(AppState::with_store(store.clone()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(TestServer {
        base_url: format!("http://{addr}"),
        store,
        http: reqwest::Client::new(),
    })
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url)
    }

    /// Sends a request and returns the status with the JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.http.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).with_context(|| format!("non-json body: {text}"))?
        };
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, Some(token), None).await
    }

    /// Registers `email` and returns the bearer token.
    pub async fn register(&self, email: &str) -> Result<String> {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {status} {body}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("token missing")
    }

    pub async fn create_todo(&self, token: &str, body: Value) -> Result<Value> {
        let (status, task) = self.post("/todos", token, body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create failed: {status} {task}");
        Ok(task)
    }
}
