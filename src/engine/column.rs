//! Physical column types for generated tables
//!
//! The `Any` driver only moves a small set of scalar kinds (text, integers,
//! doubles, booleans), so every column type also knows how its values are
//! bound on insert and projected on select for each backend.

use crate::domain::FieldType;
use crate::persistence::DatabaseBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Variable-length string
    Text,
    /// Fixed-precision decimal
    Decimal,
    /// Timestamp with offset
    Timestamp,
    /// Single bit
    Bit,
    /// Bounded string
    BoundedText,
}

impl ColumnType {
    /// Column type for a declared field type.
    ///
    /// Returns `(Text, true)` for types without a mapping.
    pub fn for_field(field_type: &FieldType) -> (Self, bool) {
        match field_type {
            FieldType::Text => (Self::Text, false),
            FieldType::Number => (Self::Decimal, false),
            FieldType::Date => (Self::Timestamp, false),
            FieldType::Boolean => (Self::Bit, false),
            FieldType::Enumerated => (Self::BoundedText, false),
            FieldType::Other(_) => (Self::Text, true),
        }
    }

    pub fn of(field_type: &FieldType) -> Self {
        Self::for_field(field_type).0
    }

    /// Column type in DDL
    pub fn ddl(&self, backend: DatabaseBackend) -> &'static str {
        match (self, backend) {
            (Self::Text, _) => "TEXT",
            (Self::Decimal, _) => "DECIMAL(18, 2)",
            // ISO8601 text is SQLite's own date convention
            (Self::Timestamp, DatabaseBackend::Sqlite) => "TEXT",
            (Self::Timestamp, DatabaseBackend::Postgres) => "TIMESTAMPTZ",
            (Self::Timestamp, DatabaseBackend::Mysql) => "DATETIME(6)",
            // sqlx maps a BOOLEAN decltype to a type the Any driver rejects
            (Self::Bit, DatabaseBackend::Sqlite) => "INTEGER",
            (Self::Bit, _) => "BOOLEAN",
            (Self::BoundedText, _) => "VARCHAR(255)",
        }
    }

    /// Placeholder expression for a bound value of this column
    pub fn bind_expr(&self, backend: DatabaseBackend, index: usize) -> String {
        let placeholder = backend.placeholder(index);
        match (self, backend) {
            // a text parameter has no implicit cast to timestamptz
            (Self::Timestamp, DatabaseBackend::Postgres) => {
                format!("CAST({} AS TIMESTAMPTZ)", placeholder)
            }
            _ => placeholder,
        }
    }

    /// Select-list expression that yields a value the `Any` driver can decode
    pub fn select_expr(&self, backend: DatabaseBackend, column: &str) -> String {
        match (self, backend) {
            (Self::Decimal, DatabaseBackend::Postgres) => {
                format!("CAST({} AS DOUBLE PRECISION)", column)
            }
            (Self::Decimal, DatabaseBackend::Mysql) => format!("CAST({} AS DOUBLE)", column),
            (Self::Timestamp, DatabaseBackend::Postgres) => format!("CAST({} AS TEXT)", column),
            (Self::Timestamp, DatabaseBackend::Mysql) => format!("CAST({} AS CHAR)", column),
            // also covers tables created with a BOOLEAN column
            (Self::Bit, DatabaseBackend::Sqlite) => format!("CAST({} AS INTEGER)", column),
            _ => column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_mapping() {
        assert_eq!(ColumnType::of(&FieldType::Text), ColumnType::Text);
        assert_eq!(ColumnType::of(&FieldType::Number), ColumnType::Decimal);
        assert_eq!(ColumnType::of(&FieldType::Date), ColumnType::Timestamp);
        assert_eq!(ColumnType::of(&FieldType::Boolean), ColumnType::Bit);
        assert_eq!(ColumnType::of(&FieldType::Enumerated), ColumnType::BoundedText);
    }

    #[test]
    fn test_unknown_type_falls_back_to_text() {
        let (column, fallback) = ColumnType::for_field(&FieldType::Other("signature".into()));
        assert_eq!(column, ColumnType::Text);
        assert!(fallback);

        let (_, fallback) = ColumnType::for_field(&FieldType::Date);
        assert!(!fallback);
    }

    #[test]
    fn test_ddl_per_backend() {
        assert_eq!(ColumnType::Timestamp.ddl(DatabaseBackend::Postgres), "TIMESTAMPTZ");
        assert_eq!(ColumnType::Timestamp.ddl(DatabaseBackend::Sqlite), "TEXT");
        assert_eq!(ColumnType::Decimal.ddl(DatabaseBackend::Mysql), "DECIMAL(18, 2)");
        assert_eq!(ColumnType::BoundedText.ddl(DatabaseBackend::Sqlite), "VARCHAR(255)");
        assert_eq!(ColumnType::Bit.ddl(DatabaseBackend::Sqlite), "INTEGER");
        assert_eq!(ColumnType::Bit.ddl(DatabaseBackend::Postgres), "BOOLEAN");
    }

    #[test]
    fn test_bind_and_select_expressions() {
        assert_eq!(ColumnType::Timestamp.bind_expr(DatabaseBackend::Sqlite, 2), "?");
        assert_eq!(
            ColumnType::Timestamp.bind_expr(DatabaseBackend::Postgres, 2),
            "CAST($2 AS TIMESTAMPTZ)"
        );
        assert_eq!(ColumnType::Decimal.bind_expr(DatabaseBackend::Postgres, 4), "$4");

        assert_eq!(ColumnType::Decimal.select_expr(DatabaseBackend::Sqlite, "days"), "days");
        assert_eq!(
            ColumnType::Decimal.select_expr(DatabaseBackend::Postgres, "days"),
            "CAST(days AS DOUBLE PRECISION)"
        );
        assert_eq!(
            ColumnType::Timestamp.select_expr(DatabaseBackend::Mysql, "submitted_at"),
            "CAST(submitted_at AS CHAR)"
        );
        assert_eq!(
            ColumnType::Bit.select_expr(DatabaseBackend::Sqlite, "paid"),
            "CAST(paid AS INTEGER)"
        );
        assert_eq!(ColumnType::Bit.select_expr(DatabaseBackend::Postgres, "paid"), "paid");
    }
}
