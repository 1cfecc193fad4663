use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    auth::{JwtKeys, PgUserRepo, UserRepo},
    config::AppConfig,
    memory::MemoryStore,
    todos::{PgTodoRepo, TodoRepo},
};

/// Everything handlers need, constructed once at start-up and injected into the router.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub todos: Arc<dyn TodoRepo>,
    pub keys: JwtKeys,
    pub config: Arc<AppConfig>,
    db: Option<PgPool>,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl AppState {
    /// Opens the Postgres pool and wires the Postgres repositories.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        info!("database pool ready");

        Ok(Self {
            users: Arc::new(PgUserRepo::new(db.clone())),
            todos: Arc::new(PgTodoRepo::new(db.clone())),
            keys: JwtKeys::from_config(&config.jwt),
            config: Arc::new(config),
            db: Some(db),
        })
    }

    pub fn from_parts(
        users: Arc<dyn UserRepo>,
        todos: Arc<dyn TodoRepo>,
        config: AppConfig,
    ) -> Self {
        Self {
            users,
            todos,
            keys: JwtKeys::from_config(&config.jwt),
            config: Arc::new(config),
            db: None,
        }
    }

    /// State backed by a fresh [`MemoryStore`]; no database needed.
    pub fn in_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self::from_parts(
            Arc::new(store.clone()),
            Arc::new(store),
            AppConfig::for_tests(),
        )
    }

    pub fn db(&self) -> Option<&PgPool> {
        self.db.as_ref()
    }

    /// Closes the database pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        if let Some(db) = &self.db {
            db.close().await;
            info!("database pool closed");
        }
    }
}
