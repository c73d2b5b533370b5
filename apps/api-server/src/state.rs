//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{CategoryRepository, PostRepository, UserRepository};
use quill_infra::database::{DatabaseConfig, DatabaseConnections};
use quill_infra::{InMemoryCategoryRepository, InMemoryPostRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
use quill_infra::database::{
    PostgresCategoryRepository, PostgresPostRepository, PostgresUserRepository,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Repositories that live and die with the process.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            posts: Arc::new(InMemoryPostRepository::new()),
            categories: Arc::new(InMemoryCategoryRepository::new()),
            db: None,
        }
    }

    /// PostgreSQL when configured and reachable, in-memory otherwise.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> Self {
        #[cfg(feature = "postgres")]
        let state = match db_config {
            Some(config) => match DatabaseConnections::init(config).await {
                Ok(connections) => {
                    let conn = Arc::new(connections);
                    Self {
                        users: Arc::new(PostgresUserRepository::new(conn.main.clone())),
                        posts: Arc::new(PostgresPostRepository::new(conn.main.clone())),
                        categories: Arc::new(PostgresCategoryRepository::new(conn.main.clone())),
                        db: Some(conn),
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to database, using in-memory repositories");
                    Self::in_memory()
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory repositories");
                Self::in_memory()
            }
        };

        #[cfg(not(feature = "postgres"))]
        let state = {
            if db_config.is_some() {
                tracing::warn!("Built without the postgres feature, ignoring DATABASE_URL");
            }
            Self::in_memory()
        };

        tracing::info!(persistent = state.db.is_some(), "Application state initialized");
        state
    }

    pub fn storage_kind(&self) -> &'static str {
        if self.db.is_some() { "postgres" } else { "in-memory" }
    }

    /// Names of the connected secondary databases, in alphabetical order.
    pub fn secondary_databases(&self) -> Vec<String> {
        self.db
            .as_ref()
            .map(|db| db.secondary_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
