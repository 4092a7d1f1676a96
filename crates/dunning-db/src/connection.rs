//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Endpoint URL, e.g. `ws://127.0.0.1:8000` or `mem://`.
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root credentials. Ignored for embedded engines.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "dunning".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Embedded engines (`mem://`, `rocksdb://`, ...) run in-process
    /// and take no credentials.
    pub fn is_embedded(&self) -> bool {
        !(self.url.starts_with("ws://")
            || self.url.starts_with("wss://")
            || self.url.starts_with("http://")
            || self.url.starts_with("https://"))
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root for remote engines, selects the
    /// configured namespace and database, and applies pending
    /// migrations.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = any::connect(config.url.as_str()).await?;

        if !config.is_embedded() {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_engine_is_embedded() {
        let config = DbConfig {
            url: "mem://".into(),
            ..Default::default()
        };
        assert!(config.is_embedded());
        assert!(!DbConfig::default().is_embedded());
    }

    #[tokio::test]
    async fn connects_to_memory_engine_and_migrates() {
        let config = DbConfig {
            url: "mem://".into(),
            ..Default::default()
        };
        let manager = DbManager::connect(&config).await.unwrap();
        // A second run finds nothing to apply.
        run_migrations(manager.client()).await.unwrap();
    }
}
