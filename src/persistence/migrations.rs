//! Database migrations for the metadata store

use crate::persistence::error::PersistenceError;
use crate::persistence::pool::ConnectionPool;
use sqlx::Row;

/// Form and field definition tables
const MIGRATION_001_FORM_DEFINITIONS: &str = r#"
-- One row per declared form. table_key is the lower-cased table name
-- and keeps generated tables unique across tenants whatever the casing
CREATE TABLE IF NOT EXISTS form_definitions (
    id VARCHAR(36) PRIMARY KEY,
    tenant_id VARCHAR(36) NOT NULL,
    name VARCHAR(63) NOT NULL,
    display_name VARCHAR(255) NOT NULL,
    description TEXT,
    table_name VARCHAR(255) NOT NULL,
    table_key VARCHAR(255) NOT NULL UNIQUE,
    created_at VARCHAR(64) NOT NULL,
    updated_at VARCHAR(64) NOT NULL,
    UNIQUE(tenant_id, name)
);

-- Fields are owned by their form
CREATE TABLE IF NOT EXISTS field_definitions (
    id VARCHAR(36) PRIMARY KEY,
    form_definition_id VARCHAR(36) NOT NULL,
    name VARCHAR(63) NOT NULL,
    label VARCHAR(255) NOT NULL,
    field_type VARCHAR(64) NOT NULL,
    is_required BIGINT NOT NULL DEFAULT 0,
    sort_order BIGINT NOT NULL DEFAULT 0,
    configuration TEXT,
    UNIQUE(form_definition_id, name),
    FOREIGN KEY (form_definition_id) REFERENCES form_definitions(id) ON DELETE CASCADE
)
"#;

/// Tables whose form was deleted stay reserved for their former owner
const MIGRATION_002_RETIRED_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS retired_tables (
    table_key VARCHAR(255) PRIMARY KEY,
    table_name VARCHAR(255) NOT NULL,
    tenant_id VARCHAR(36) NOT NULL,
    form_name VARCHAR(63) NOT NULL,
    table_shape TEXT NOT NULL,
    retired_at VARCHAR(64) NOT NULL
)
"#;

/// Migration definition
struct Migration {
    name: &'static str,
    sql: &'static str,
    checksum: &'static str,
}

/// Get all migrations in order
fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: "001_form_definitions",
            sql: MIGRATION_001_FORM_DEFINITIONS,
            checksum: "v1",
        },
        Migration {
            name: "002_retired_tables",
            sql: MIGRATION_002_RETIRED_TABLES,
            checksum: "v1",
        },
    ]
}

/// Split a migration script into executable statements
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|statement| {
            statement
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|statement| !statement.trim().is_empty())
        .collect()
}

/// Migration runner for the persistence layer
pub struct MigrationRunner {
    pool: ConnectionPool,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations
    pub async fn migrate_up(&self) -> Result<MigrationResult, PersistenceError> {
        let migrations = get_migrations();
        let mut applied = 0;
        let mut skipped = 0;

        // Ensure migrations table exists (bootstrap)
        self.ensure_migrations_table().await?;

        for migration in migrations {
            if self.is_migration_applied(migration.name).await? {
                tracing::debug!("Migration '{}' already applied, skipping", migration.name);
                skipped += 1;
                continue;
            }

            tracing::info!("Applying migration: {}", migration.name);

            for statement in split_statements(migration.sql) {
                sqlx::query(&statement)
                    .execute(self.pool.pool())
                    .await
                    .map_err(|e| {
                        PersistenceError::Migration(format!(
                            "Failed to execute migration '{}': {}",
                            migration.name, e
                        ))
                    })?;
            }

            self.record_migration(migration.name, migration.checksum)
                .await?;

            tracing::info!("Migration '{}' applied successfully", migration.name);
            applied += 1;
        }

        Ok(MigrationResult { applied, skipped })
    }

    /// Get migration status
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, PersistenceError> {
        self.ensure_migrations_table().await?;

        let mut statuses = Vec::new();
        for migration in get_migrations() {
            let applied_at = self.get_migration_applied_at(migration.name).await?;
            statuses.push(MigrationStatus {
                name: migration.name.to_string(),
                applied: applied_at.is_some(),
                applied_at,
            });
        }

        Ok(statuses)
    }

    /// Ensure the migrations tracking table exists
    async fn ensure_migrations_table(&self) -> Result<(), PersistenceError> {
        let sql = r#"
            CREATE TABLE IF NOT EXISTS _dynaform_migrations (
                name VARCHAR(255) PRIMARY KEY,
                applied_at VARCHAR(64) NOT NULL,
                checksum VARCHAR(64) NOT NULL
            )
        "#;

        sqlx::query(sql)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to create migrations table: {}", e))
            })?;

        Ok(())
    }

    /// Check if a migration has been applied
    async fn is_migration_applied(&self, name: &str) -> Result<bool, PersistenceError> {
        let sql = self
            .pool
            .backend()
            .prepare_sql("SELECT COUNT(*) AS count FROM _dynaform_migrations WHERE name = ?");

        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to check migration status: {}", e))
            })?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    /// Get when a migration was applied
    async fn get_migration_applied_at(
        &self,
        name: &str,
    ) -> Result<Option<String>, PersistenceError> {
        let sql = self
            .pool
            .backend()
            .prepare_sql("SELECT applied_at FROM _dynaform_migrations WHERE name = ?");

        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to get migration applied_at: {}", e))
            })?;

        row.map(|row| row.try_get::<String, _>("applied_at"))
            .transpose()
            .map_err(PersistenceError::from)
    }

    /// Record a migration as applied
    async fn record_migration(&self, name: &str, checksum: &str) -> Result<(), PersistenceError> {
        let now = chrono::Utc::now().to_rfc3339();
        let sql = self.pool.backend().prepare_sql(
            "INSERT INTO _dynaform_migrations (name, applied_at, checksum) VALUES (?, ?, ?)",
        );

        sqlx::query(&sql)
            .bind(name)
            .bind(&now)
            .bind(checksum)
            .execute(self.pool.pool())
            .await
            .map_err(|e| PersistenceError::Migration(format!("Failed to record migration: {}", e)))?;

        Ok(())
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Number of migrations applied
    pub applied: usize,
    /// Number of migrations skipped (already applied)
    pub skipped: usize,
}

/// Status of a single migration
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Migration name
    pub name: String,
    /// Whether the migration has been applied
    pub applied: bool,
    /// When the migration was applied (if applied)
    pub applied_at: Option<String>,
}
