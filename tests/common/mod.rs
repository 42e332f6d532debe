#![allow(dead_code)]

use dynaform::domain::{FieldType, NewFieldDefinition, NewFormDefinition};
use dynaform::engine::{FormEngine, DEFAULT_TABLE_PREFIX};
use dynaform::persistence::{DataStore, PersistenceConfig};
use tempfile::TempDir;

/// File-backed SQLite store with migrations applied.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn test_store() -> (DataStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dynaform.db");
    let config = PersistenceConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections: 4,
        ..PersistenceConfig::default()
    };

    let store = DataStore::new(&config).await.unwrap();
    store.migrate().await.unwrap();
    (store, dir)
}

pub async fn test_engine() -> (FormEngine, DataStore, TempDir) {
    let (store, dir) = test_store().await;
    let engine = FormEngine::from_store(&store, DEFAULT_TABLE_PREFIX);
    (engine, store, dir)
}

/// The leave request form used throughout the tests
pub fn leave_request() -> NewFormDefinition {
    NewFormDefinition {
        name: "leave_request".to_string(),
        display_name: "Leave request".to_string(),
        description: Some("Annual and sick leave".to_string()),
        fields: vec![
            NewFieldDefinition::new("reason", "Reason", FieldType::Text)
                .required()
                .sort_order(1),
            NewFieldDefinition::new("days", "Days", FieldType::Number).sort_order(2),
            NewFieldDefinition::new("start", "Start date", FieldType::Date).sort_order(3),
            NewFieldDefinition::new("paid", "Paid", FieldType::Boolean).sort_order(4),
        ],
    }
}

pub async fn count_rows(store: &DataStore, table: &str) -> i64 {
    use sqlx::Row;
    let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
        .fetch_one(store.pool().pool())
        .await
        .unwrap();
    row.try_get::<i64, _>("n").unwrap()
}
