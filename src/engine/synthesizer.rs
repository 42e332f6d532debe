//! Table synthesizer: form definition -> guarded DDL

use std::collections::HashSet;

use sqlx::Row;

use crate::domain::{validate_identifier, FormDefinition};
use crate::engine::column::ColumnType;
use crate::engine::error::SchemaError;
use crate::persistence::{ConnectionPool, DatabaseBackend};

/// Record id column, always first
pub const ID_COLUMN: &str = "id";
/// Capture timestamp column, always second
pub const SUBMITTED_AT_COLUMN: &str = "submitted_at";

fn check_identifier(name: &str) -> Result<(), SchemaError> {
    validate_identifier(name).map_err(|reason| SchemaError::InvalidIdentifier {
        identifier: name.to_string(),
        reason,
    })
}

/// Validate everything about a definition that must hold before any side effect.
///
/// Identifier grammar first, then field-name collisions. Names are compared
/// case-insensitively since none of the backends distinguish unquoted case.
pub fn validate_definition(form: &FormDefinition) -> Result<(), SchemaError> {
    check_identifier(&form.name)?;
    check_identifier(&form.table_name)?;
    for field in &form.fields {
        check_identifier(&field.name)?;
    }

    if form.fields.is_empty() {
        return Err(SchemaError::EmptyDefinition {
            form: form.name.clone(),
        });
    }

    let mut seen: HashSet<String> = [ID_COLUMN, SUBMITTED_AT_COLUMN]
        .iter()
        .map(|c| c.to_string())
        .collect();
    for field in &form.fields {
        if !seen.insert(field.name.to_lowercase()) {
            return Err(SchemaError::DuplicateDefinition {
                entity: "field".to_string(),
                name: field.name.clone(),
            });
        }
    }

    Ok(())
}

/// Build the `CREATE TABLE IF NOT EXISTS` statement for a definition
pub fn build_create_table(
    backend: DatabaseBackend,
    form: &FormDefinition,
) -> Result<String, SchemaError> {
    validate_definition(form)?;

    let mut columns = vec![
        format!("{} VARCHAR(36) NOT NULL PRIMARY KEY", ID_COLUMN),
        format!(
            "{} {} NOT NULL",
            SUBMITTED_AT_COLUMN,
            ColumnType::Timestamp.ddl(backend)
        ),
    ];

    for field in &form.fields {
        let (column_type, fallback) = ColumnType::for_field(&field.field_type);
        if fallback {
            tracing::warn!(
                "Field '{}' of form '{}' has unrecognized type '{}', storing as {}",
                field.name,
                form.name,
                field.field_type,
                column_type.ddl(backend)
            );
        }

        let nullability = if field.is_required { "NOT NULL" } else { "NULL" };
        columns.push(format!(
            "{} {} {}",
            field.name,
            column_type.ddl(backend),
            nullability
        ));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        form.table_name,
        columns.join(", ")
    ))
}

/// Executes generated DDL against the shared pool
#[derive(Clone)]
pub struct TableSynthesizer {
    pool: ConnectionPool,
}

impl TableSynthesizer {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Create the backing table for a form. Safe to call repeatedly.
    pub async fn synthesize(&self, form: &FormDefinition) -> Result<(), SchemaError> {
        let ddl = build_create_table(self.pool.backend(), form)?;
        tracing::debug!("Synthesizing table for form '{}': {}", form.name, ddl);

        sqlx::query(&ddl)
            .execute(self.pool.pool())
            .await
            .map_err(|e| SchemaError::SynthesisFailed {
                table: form.table_name.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(
            "Table '{}' ready for form '{}' ({} fields)",
            form.table_name,
            form.name,
            form.fields.len()
        );
        Ok(())
    }

    /// Whether a table with this name exists in the backend catalog
    pub async fn table_exists(&self, table: &str) -> Result<bool, SchemaError> {
        check_identifier(table)?;

        let row = sqlx::query(self.pool.backend().table_exists_sql())
            .bind(table)
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| SchemaError::QueryFailed {
                form: table.to_string(),
                message: e.to_string(),
            })?;

        let count: i64 = row.try_get("count").map_err(|e| SchemaError::QueryFailed {
            form: table.to_string(),
            message: e.to_string(),
        })?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldType, NewFieldDefinition, NewFormDefinition, TenantId};

    fn make_form(fields: Vec<NewFieldDefinition>) -> FormDefinition {
        FormDefinition::from_request(
            TenantId::nil(),
            NewFormDefinition {
                name: "leave_request".to_string(),
                display_name: "Leave request".to_string(),
                description: None,
                fields,
            },
            "UserData_",
        )
    }

    #[test]
    fn test_create_table_sqlite() {
        let form = make_form(vec![
            NewFieldDefinition::new("reason", "Reason", FieldType::Text)
                .required()
                .sort_order(1),
            NewFieldDefinition::new("days", "Days", FieldType::Number).sort_order(2),
            NewFieldDefinition::new("start", "Start", FieldType::Date).sort_order(3),
            NewFieldDefinition::new("paid", "Paid", FieldType::Boolean).sort_order(4),
            NewFieldDefinition::new("kind", "Kind", FieldType::Enumerated).sort_order(5),
        ]);

        let ddl = build_create_table(DatabaseBackend::Sqlite, &form).unwrap();
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS UserData_leave_request (\
             id VARCHAR(36) NOT NULL PRIMARY KEY, \
             submitted_at TEXT NOT NULL, \
             reason TEXT NOT NULL, \
             days DECIMAL(18, 2) NULL, \
             start TEXT NULL, \
             paid INTEGER NULL, \
             kind VARCHAR(255) NULL)"
        );
    }

    #[test]
    fn test_create_table_postgres_uses_timestamptz() {
        let form = make_form(vec![NewFieldDefinition::new("start", "Start", FieldType::Date).required()]);
        let ddl = build_create_table(DatabaseBackend::Postgres, &form).unwrap();
        assert!(ddl.contains("submitted_at TIMESTAMPTZ NOT NULL"));
        assert!(ddl.contains("start TIMESTAMPTZ NOT NULL"));
    }

    #[test]
    fn test_columns_follow_sort_order() {
        let form = make_form(vec![
            NewFieldDefinition::new("b", "B", FieldType::Text).sort_order(2),
            NewFieldDefinition::new("a", "A", FieldType::Text).sort_order(1),
        ]);
        let ddl = build_create_table(DatabaseBackend::Sqlite, &form).unwrap();
        assert!(ddl.find("a TEXT").unwrap() < ddl.find("b TEXT").unwrap());
    }

    #[test]
    fn test_unknown_type_is_text() {
        let form = make_form(vec![NewFieldDefinition::new(
            "sig",
            "Signature",
            FieldType::Other("signature".into()),
        )]);
        let ddl = build_create_table(DatabaseBackend::Sqlite, &form).unwrap();
        assert!(ddl.contains("sig TEXT NULL"));
    }

    #[test]
    fn test_invalid_field_name_builds_nothing() {
        let form = make_form(vec![NewFieldDefinition::new("bad name!", "Bad", FieldType::Text)]);
        match build_create_table(DatabaseBackend::Sqlite, &form) {
            Err(SchemaError::InvalidIdentifier { identifier, .. }) => {
                assert_eq!(identifier, "bad name!")
            }
            other => panic!("expected InvalidIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_table_name() {
        let mut form = make_form(vec![NewFieldDefinition::new("reason", "Reason", FieldType::Text)]);
        form.table_name = "UserData_x; DROP TABLE users".to_string();
        assert!(matches!(
            validate_definition(&form),
            Err(SchemaError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_duplicate_field_names() {
        let form = make_form(vec![
            NewFieldDefinition::new("reason", "Reason", FieldType::Text),
            NewFieldDefinition::new("Reason", "Reason again", FieldType::Text),
        ]);
        assert!(matches!(
            validate_definition(&form),
            Err(SchemaError::DuplicateDefinition { ref name, .. }) if name == "Reason"
        ));
    }

    #[test]
    fn test_system_column_names_are_reserved() {
        let form = make_form(vec![NewFieldDefinition::new("submitted_at", "When", FieldType::Date)]);
        assert!(matches!(
            validate_definition(&form),
            Err(SchemaError::DuplicateDefinition { .. })
        ));

        let form = make_form(vec![NewFieldDefinition::new("ID", "Identifier", FieldType::Text)]);
        assert!(matches!(
            validate_definition(&form),
            Err(SchemaError::DuplicateDefinition { .. })
        ));
    }

    #[test]
    fn test_empty_definition() {
        let form = make_form(vec![]);
        assert!(matches!(
            validate_definition(&form),
            Err(SchemaError::EmptyDefinition { .. })
        ));
    }
}
