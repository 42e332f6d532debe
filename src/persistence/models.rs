//! Database rows for the metadata store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::{FieldDefinition, FieldType, FormDefinition, RetiredTable, TenantId};
use crate::persistence::error::PersistenceError;

/// Form definition as stored in `form_definitions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinitionRow {
    /// Unique identifier (UUID)
    pub id: String,
    /// Owning tenant (UUID)
    pub tenant_id: String,
    /// Machine name, unique per tenant
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Generated table name, unique across tenants
    pub table_name: String,
    /// Creation timestamp (ISO8601)
    pub created_at: String,
    /// Last update timestamp (ISO8601)
    pub updated_at: String,
}

impl FormDefinitionRow {
    pub fn from_any_row(row: &sqlx::any::AnyRow) -> Result<Self, PersistenceError> {
        Ok(Self {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            name: row.try_get("name")?,
            display_name: row.try_get("display_name")?,
            description: row.try_get("description")?,
            table_name: row.try_get("table_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Combine with the form's field rows into a domain definition
    pub fn into_definition(
        self,
        field_rows: Vec<FieldDefinitionRow>,
    ) -> Result<FormDefinition, PersistenceError> {
        let mut fields = field_rows
            .into_iter()
            .map(FieldDefinitionRow::into_definition)
            .collect::<Result<Vec<_>, _>>()?;
        fields.sort_by_key(|f| f.sort_order);

        Ok(FormDefinition {
            id: parse_uuid(&self.id)?,
            tenant_id: TenantId::new(parse_uuid(&self.tenant_id)?),
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            table_name: self.table_name,
            fields,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl From<&FormDefinition> for FormDefinitionRow {
    fn from(form: &FormDefinition) -> Self {
        Self {
            id: form.id.to_string(),
            tenant_id: form.tenant_id.to_string(),
            name: form.name.clone(),
            display_name: form.display_name.clone(),
            description: form.description.clone(),
            table_name: form.table_name.clone(),
            created_at: form.created_at.to_rfc3339(),
            updated_at: form.updated_at.to_rfc3339(),
        }
    }
}

/// Field definition as stored in `field_definitions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinitionRow {
    pub id: String,
    pub form_definition_id: String,
    pub name: String,
    pub label: String,
    pub field_type: String,
    /// 0 or 1
    pub is_required: i64,
    pub sort_order: i64,
    /// JSON serialized configuration
    pub configuration: Option<String>,
}

impl FieldDefinitionRow {
    pub fn from_any_row(row: &sqlx::any::AnyRow) -> Result<Self, PersistenceError> {
        Ok(Self {
            id: row.try_get("id")?,
            form_definition_id: row.try_get("form_definition_id")?,
            name: row.try_get("name")?,
            label: row.try_get("label")?,
            field_type: row.try_get("field_type")?,
            is_required: row.try_get("is_required")?,
            sort_order: row.try_get("sort_order")?,
            configuration: row.try_get("configuration")?,
        })
    }

    pub fn from_definition(
        form_id: Uuid,
        field: &FieldDefinition,
    ) -> Result<Self, PersistenceError> {
        Ok(Self {
            id: field.id.to_string(),
            form_definition_id: form_id.to_string(),
            name: field.name.clone(),
            label: field.label.clone(),
            field_type: field.field_type.as_str().to_string(),
            is_required: i64::from(field.is_required),
            sort_order: i64::from(field.sort_order),
            configuration: field
                .configuration
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }

    pub fn into_definition(self) -> Result<FieldDefinition, PersistenceError> {
        let sort_order = i32::try_from(self.sort_order).map_err(|_| {
            PersistenceError::Corrupt(format!(
                "sort_order {} of field '{}' is out of range",
                self.sort_order, self.name
            ))
        })?;

        Ok(FieldDefinition {
            id: parse_uuid(&self.id)?,
            field_type: FieldType::parse(&self.field_type),
            is_required: self.is_required != 0,
            sort_order,
            configuration: self
                .configuration
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            name: self.name,
            label: self.label,
        })
    }
}

/// Tombstone as stored in `retired_tables`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetiredTableRow {
    pub table_name: String,
    pub tenant_id: String,
    pub form_name: String,
    pub table_shape: String,
    pub retired_at: String,
}

impl RetiredTableRow {
    pub fn from_any_row(row: &sqlx::any::AnyRow) -> Result<Self, PersistenceError> {
        Ok(Self {
            table_name: row.try_get("table_name")?,
            tenant_id: row.try_get("tenant_id")?,
            form_name: row.try_get("form_name")?,
            table_shape: row.try_get("table_shape")?,
            retired_at: row.try_get("retired_at")?,
        })
    }

    pub fn into_retired(self) -> Result<RetiredTable, PersistenceError> {
        Ok(RetiredTable {
            tenant_id: TenantId::new(parse_uuid(&self.tenant_id)?),
            retired_at: parse_timestamp(&self.retired_at)?,
            table_name: self.table_name,
            form_name: self.form_name,
            table_shape: self.table_shape,
        })
    }
}

impl From<&RetiredTable> for RetiredTableRow {
    fn from(retired: &RetiredTable) -> Self {
        Self {
            table_name: retired.table_name.clone(),
            tenant_id: retired.tenant_id.to_string(),
            form_name: retired.form_name.clone(),
            table_shape: retired.table_shape.clone(),
            retired_at: retired.retired_at.to_rfc3339(),
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, PersistenceError> {
    Uuid::parse_str(s).map_err(|e| PersistenceError::Corrupt(format!("invalid uuid '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Corrupt(format!("invalid timestamp '{}': {}", s, e)))
}
