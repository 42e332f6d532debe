//! Shared `AnyPool` for the metadata store and generated tables

use crate::persistence::error::PersistenceError;
use sqlx::{any::AnyPoolOptions, AnyPool};
use std::time::Duration;

/// SQL dialect behind the pool, picked from the URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
    Mysql,
}

impl DatabaseBackend {
    pub fn from_url(url: &str) -> Result<Self, PersistenceError> {
        let scheme = url.split_once(':').map_or(url, |(scheme, _)| scheme);
        match scheme {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            other => Err(PersistenceError::Connection(format!(
                "unsupported database scheme '{}' (expected sqlite, postgres or mysql)",
                other
            ))),
        }
    }

    /// Display name, also reported by the health endpoint
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
            Self::Mysql => "MySQL",
        }
    }

    /// Positional bind placeholder (1-based)
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::Sqlite | Self::Mysql => "?".to_string(),
        }
    }

    /// Rewrite `?` placeholders into the backend's native form.
    ///
    /// Only for statically written SQL that has no `?` inside literals.
    pub fn prepare_sql(&self, sql: &str) -> String {
        match self {
            Self::Postgres => {
                let mut out = String::with_capacity(sql.len() + 8);
                let mut index = 0;
                for ch in sql.chars() {
                    if ch == '?' {
                        index += 1;
                        out.push_str(&self.placeholder(index));
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            Self::Sqlite | Self::Mysql => sql.to_string(),
        }
    }

    /// Catalog query counting tables with the given name, ignoring case
    /// (one bind parameter)
    pub fn table_exists_sql(&self) -> &'static str {
        match self {
            Self::Sqlite => "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND LOWER(name) = LOWER(?)",
            // unquoted identifiers fold to lower case
            Self::Postgres => "SELECT COUNT(*) AS count FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = LOWER($1)",
            Self::Mysql => "SELECT COUNT(*) AS count FROM information_schema.tables WHERE table_schema = DATABASE() AND LOWER(table_name) = LOWER(?)",
        }
    }
}

#[derive(Clone)]
pub struct ConnectionPool {
    pool: AnyPool,
    backend: DatabaseBackend,
}

impl ConnectionPool {
    /// Open a pool over `url`, waiting at most `connect_timeout_secs` for a connection
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, PersistenceError> {
        sqlx::any::install_default_drivers();
        let backend = DatabaseBackend::from_url(url)?;

        tracing::info!(
            backend = backend.name(),
            max_connections,
            "Opening connection pool"
        );

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;

        Ok(Self { pool, backend })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| PersistenceError::Connection(format!("Health check failed: {}", e)))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
