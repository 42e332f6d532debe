//! Data mediator: validated, parameterized INSERT and SELECT against
//! generated tables
//!
//! Identifiers are the only interpolated tokens and come from a definition
//! that passed [`validate_definition`]. Every value is a bound parameter.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::TryStreamExt;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{DynamicValue, FormDefinition, TenantId};
use crate::engine::column::ColumnType;
use crate::engine::error::SchemaError;
use crate::engine::synthesizer::{validate_definition, ID_COLUMN, SUBMITTED_AT_COLUMN};
use crate::persistence::{ConnectionPool, DatabaseBackend, FormRepository};

/// A value ready to be bound to a statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Number(f64),
    Bool(bool),
    /// NULL typed after the target column
    Null(ColumnType),
}

/// Fail on the first required field that is absent, null, or empty
pub fn check_required(
    form: &FormDefinition,
    values: &HashMap<String, DynamicValue>,
) -> Result<(), SchemaError> {
    for field in form.required_fields() {
        let provided = values.get(&field.name).is_some_and(|v| !v.is_blank());
        if !provided {
            return Err(SchemaError::MissingRequiredField {
                label: field.label.clone(),
            });
        }
    }
    Ok(())
}

/// A submitted value that cannot be converted to its column's scalar
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, got {kind} {value}")]
pub struct ValueMismatch {
    pub expected: &'static str,
    pub kind: &'static str,
    pub value: String,
}

impl ValueMismatch {
    fn new(column: ColumnType, value: &DynamicValue) -> Self {
        let expected = match column {
            ColumnType::Decimal => "a number",
            ColumnType::Bit => "a boolean",
            ColumnType::Timestamp => "a date or timestamp",
            ColumnType::Text | ColumnType::BoundedText => "text",
        };
        let rendered = match value {
            DynamicValue::String(s) => format!("{:?}", s),
            DynamicValue::Number(n) => n.to_string(),
            DynamicValue::Bool(b) => b.to_string(),
            DynamicValue::Null => "null".to_string(),
            DynamicValue::Unknown(raw) => raw.clone(),
        };
        Self {
            expected,
            kind: value.kind(),
            value: rendered,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn is_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Convert a submitted value into the scalar its column stores.
///
/// Numeric and boolean strings are parsed, numbers and booleans are
/// rendered into text columns. An empty string in a non-text column is
/// NULL. Anything else is a mismatch and nothing is bound.
pub fn coerce(value: &DynamicValue, column: ColumnType) -> Result<SqlParam, ValueMismatch> {
    use ColumnType::{Bit, BoundedText, Decimal, Text, Timestamp};

    let mismatch = || ValueMismatch::new(column, value);
    match (column, value) {
        (_, DynamicValue::Null) => Ok(SqlParam::Null(column)),
        (Decimal | Bit | Timestamp, DynamicValue::String(s)) if s.is_empty() => {
            Ok(SqlParam::Null(column))
        }

        (Text | BoundedText, DynamicValue::String(s)) => Ok(SqlParam::Text(s.clone())),
        (Text | BoundedText, DynamicValue::Number(n)) => Ok(SqlParam::Text(n.to_string())),
        (Text | BoundedText, DynamicValue::Bool(b)) => Ok(SqlParam::Text(b.to_string())),
        (Text | BoundedText, DynamicValue::Unknown(raw)) => Ok(SqlParam::Text(raw.clone())),

        (Decimal, DynamicValue::Number(n)) => Ok(SqlParam::Number(*n)),
        (Decimal, DynamicValue::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(SqlParam::Number)
            .ok_or_else(mismatch),

        (Bit, DynamicValue::Bool(b)) => Ok(SqlParam::Bool(*b)),
        (Bit, DynamicValue::Number(n)) if *n == 0.0 || *n == 1.0 => Ok(SqlParam::Bool(*n == 1.0)),
        (Bit, DynamicValue::String(s)) => parse_bool(s).map(SqlParam::Bool).ok_or_else(mismatch),

        (Timestamp, DynamicValue::String(s)) if is_timestamp(s.trim()) => {
            Ok(SqlParam::Text(s.trim().to_string()))
        }

        _ => Err(mismatch()),
    }
}

/// Render a capture timestamp in the form the backend's timestamp column accepts
pub fn format_timestamp(backend: DatabaseBackend, at: DateTime<Utc>) -> String {
    match backend {
        DatabaseBackend::Mysql => at.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        DatabaseBackend::Sqlite | DatabaseBackend::Postgres => at.to_rfc3339(),
    }
}

/// Generated INSERT together with its parameters in placeholder order
#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Build the INSERT for one submission.
///
/// `id` and `submitted_at` are always the first two parameters. Fields
/// missing from `values` are left out of the column list. A value that
/// does not fit its column fails the whole submission.
pub fn build_insert(
    backend: DatabaseBackend,
    form: &FormDefinition,
    values: &HashMap<String, DynamicValue>,
    record_id: Uuid,
    submitted_at: DateTime<Utc>,
) -> Result<InsertStatement, SchemaError> {
    validate_definition(form)?;

    let mut columns = vec![ID_COLUMN.to_string(), SUBMITTED_AT_COLUMN.to_string()];
    let mut placeholders = vec![
        ColumnType::Text.bind_expr(backend, 1),
        ColumnType::Timestamp.bind_expr(backend, 2),
    ];
    let mut params = vec![
        SqlParam::Text(record_id.to_string()),
        SqlParam::Text(format_timestamp(backend, submitted_at)),
    ];

    for field in &form.fields {
        let Some(value) = values.get(&field.name) else {
            continue;
        };
        let column = ColumnType::of(&field.field_type);
        let param = coerce(value, column).map_err(|e| SchemaError::SubmissionFailed {
            form: form.name.clone(),
            message: format!("field '{}' {}", field.name, e),
        })?;
        columns.push(field.name.clone());
        params.push(param);
        placeholders.push(column.bind_expr(backend, params.len()));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        form.table_name,
        columns.join(", "),
        placeholders.join(", ")
    );

    Ok(InsertStatement { sql, params })
}

/// Physical columns of a form's table, in order
fn table_columns(form: &FormDefinition) -> Vec<(&str, ColumnType)> {
    let mut columns = vec![
        (ID_COLUMN, ColumnType::Text),
        (SUBMITTED_AT_COLUMN, ColumnType::Timestamp),
    ];
    columns.extend(
        form.fields
            .iter()
            .map(|f| (f.name.as_str(), ColumnType::of(&f.field_type))),
    );
    columns
}

/// Build the unfiltered scan over a form's table
pub fn build_select(backend: DatabaseBackend, form: &FormDefinition) -> Result<String, SchemaError> {
    validate_definition(form)?;

    let projection = table_columns(form)
        .into_iter()
        .map(|(name, column)| column.select_expr(backend, name))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("SELECT {} FROM {}", projection, form.table_name))
}

fn bind_params<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    params: &'q [SqlParam],
) -> Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Number(n) => query.bind(*n),
            SqlParam::Bool(b) => query.bind(*b),
            SqlParam::Null(ColumnType::Decimal) => query.bind(None::<f64>),
            SqlParam::Null(ColumnType::Bit) => query.bind(None::<bool>),
            SqlParam::Null(_) => query.bind(None::<String>),
        };
    }
    query
}

fn json_number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Decode one cell. Backends disagree on storage class (SQLite keeps whole
/// decimals as integers and booleans as 0/1), so each column type tries the
/// kinds it can legitimately arrive as. Text is the last resort for every
/// column, so a stray value never makes the whole table unreadable.
fn decode_cell(row: &AnyRow, index: usize, column: ColumnType) -> Result<Value, sqlx::Error> {
    match column {
        ColumnType::Decimal => {
            if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
                return Ok(v.map(json_number).unwrap_or(Value::Null));
            }
            if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
                return Ok(v.map(|i| json_number(i as f64)).unwrap_or(Value::Null));
            }
            decode_text(row, index)
        }
        ColumnType::Bit => {
            if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
                return Ok(v.map(|i| Value::Bool(i != 0)).unwrap_or(Value::Null));
            }
            if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
                return Ok(v.map(Value::Bool).unwrap_or(Value::Null));
            }
            decode_text(row, index)
        }
        ColumnType::Text | ColumnType::BoundedText | ColumnType::Timestamp => {
            if let Ok(v) = row.try_get::<Option<String>, _>(index) {
                return Ok(v.map(Value::String).unwrap_or(Value::Null));
            }
            if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
                return Ok(v.map(Value::from).unwrap_or(Value::Null));
            }
            let v: Option<f64> = row.try_get(index)?;
            Ok(v.map(json_number).unwrap_or(Value::Null))
        }
    }
}

fn decode_text(row: &AnyRow, index: usize) -> Result<Value, sqlx::Error> {
    let v: Option<String> = row.try_get(index)?;
    Ok(v.map(Value::String).unwrap_or(Value::Null))
}

/// One stored submission: column name to value, in physical column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, Value)> {
        self.columns
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Resolves forms through the registry and runs generated DML
#[derive(Clone)]
pub struct DataMediator {
    pool: ConnectionPool,
    forms: Arc<dyn FormRepository>,
}

impl DataMediator {
    pub fn new(pool: ConnectionPool, forms: Arc<dyn FormRepository>) -> Self {
        Self { pool, forms }
    }

    async fn resolve(&self, tenant: TenantId, form_name: &str) -> Result<FormDefinition, SchemaError> {
        self.forms
            .get_by_name(tenant, form_name)
            .await?
            .ok_or_else(|| SchemaError::NotFound {
                form: form_name.to_string(),
            })
    }

    /// Validate and insert one submission. Returns the new record id.
    pub async fn submit(
        &self,
        tenant: TenantId,
        form_name: &str,
        values: &HashMap<String, DynamicValue>,
    ) -> Result<Uuid, SchemaError> {
        let form = self.resolve(tenant, form_name).await?;
        check_required(&form, values)?;

        let ignored: Vec<&str> = values
            .keys()
            .filter(|k| form.field(k).is_none())
            .map(String::as_str)
            .collect();
        if !ignored.is_empty() {
            tracing::warn!(
                "Ignoring undeclared keys {:?} submitted to form '{}'",
                ignored,
                form.name
            );
        }

        let record_id = Uuid::new_v4();
        let statement = build_insert(self.pool.backend(), &form, values, record_id, Utc::now())?;
        tracing::debug!("Submitting to form '{}': {}", form.name, statement.sql);

        bind_params(sqlx::query(&statement.sql), &statement.params)
            .execute(self.pool.pool())
            .await
            .map_err(|e| SchemaError::SubmissionFailed {
                form: form.name.clone(),
                message: e.to_string(),
            })?;

        Ok(record_id)
    }

    /// Read every row of a form's table in storage order
    pub async fn query(&self, tenant: TenantId, form_name: &str) -> Result<Vec<Record>, SchemaError> {
        let form = self.resolve(tenant, form_name).await?;
        let sql = build_select(self.pool.backend(), &form)?;
        let columns = table_columns(&form);
        tracing::debug!("Querying form '{}': {}", form.name, sql);

        let query_failed = |e: sqlx::Error| SchemaError::QueryFailed {
            form: form.name.clone(),
            message: e.to_string(),
        };

        let mut rows = sqlx::query(&sql).fetch(self.pool.pool());
        let mut records = Vec::new();
        while let Some(row) = rows.try_next().await.map_err(query_failed)? {
            let mut record = Vec::with_capacity(columns.len());
            for (index, (name, column)) in columns.iter().enumerate() {
                let value = decode_cell(&row, index, *column).map_err(query_failed)?;
                record.push((name.to_string(), value));
            }
            records.push(Record { columns: record });
        }

        Ok(records)
    }
}
