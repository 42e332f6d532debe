//! Schema registry: repository for form and field definitions

use crate::domain::{identifier_key, FormDefinition, FormDefinitionId, RetiredTable, TenantId};
use crate::persistence::error::PersistenceError;
use crate::persistence::models::{FieldDefinitionRow, FormDefinitionRow, RetiredTableRow};
use crate::persistence::pool::ConnectionPool;
use async_trait::async_trait;

const FORM_COLUMNS: &str =
    "id, tenant_id, name, display_name, description, table_name, created_at, updated_at";

const FIELD_COLUMNS: &str =
    "id, form_definition_id, name, label, field_type, is_required, sort_order, configuration";

const RETIRED_COLUMNS: &str = "table_name, tenant_id, form_name, table_shape, retired_at";

/// Metadata store for form definitions, scoped by tenant
#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Get a form (with fields) by its per-tenant name, ignoring case
    async fn get_by_name(
        &self,
        tenant: TenantId,
        name: &str,
    ) -> Result<Option<FormDefinition>, PersistenceError>;

    /// Get a form (with fields) by id
    async fn get_by_id(
        &self,
        tenant: TenantId,
        id: FormDefinitionId,
    ) -> Result<Option<FormDefinition>, PersistenceError>;

    /// List all forms of a tenant ordered by name
    async fn list(&self, tenant: TenantId) -> Result<Vec<FormDefinition>, PersistenceError>;

    /// Persist a form and its fields atomically
    async fn add(&self, form: &FormDefinition) -> Result<(), PersistenceError>;

    /// Delete a form and its fields, leaving a tombstone for its table.
    /// Returns false when nothing matched.
    async fn delete(&self, tenant: TenantId, name: &str) -> Result<bool, PersistenceError>;

    /// Tombstone of a deleted form's table, if any
    async fn find_retired(
        &self,
        table_name: &str,
    ) -> Result<Option<RetiredTable>, PersistenceError>;
}

/// SQLx-based implementation of FormRepository
pub struct SqlxFormRepository {
    pool: ConnectionPool,
}

impl SqlxFormRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn sql(&self, sql: &str) -> String {
        self.pool.backend().prepare_sql(sql)
    }

    async fn load_fields(
        &self,
        form_id: &str,
    ) -> Result<Vec<FieldDefinitionRow>, PersistenceError> {
        let sql = self.sql(&format!(
            "SELECT {} FROM field_definitions WHERE form_definition_id = ? ORDER BY sort_order",
            FIELD_COLUMNS
        ));

        let rows = sqlx::query(&sql)
            .bind(form_id)
            .fetch_all(self.pool.pool())
            .await?;

        rows.iter().map(FieldDefinitionRow::from_any_row).collect()
    }

    async fn hydrate(&self, row: FormDefinitionRow) -> Result<FormDefinition, PersistenceError> {
        let fields = self.load_fields(&row.id).await?;
        row.into_definition(fields)
    }
}

#[async_trait]
impl FormRepository for SqlxFormRepository {
    async fn get_by_name(
        &self,
        tenant: TenantId,
        name: &str,
    ) -> Result<Option<FormDefinition>, PersistenceError> {
        let sql = self.sql(&format!(
            "SELECT {} FROM form_definitions WHERE tenant_id = ? AND LOWER(name) = ?",
            FORM_COLUMNS
        ));

        let row = sqlx::query(&sql)
            .bind(tenant.to_string())
            .bind(identifier_key(name))
            .fetch_optional(self.pool.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(FormDefinitionRow::from_any_row(&row)?).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_id(
        &self,
        tenant: TenantId,
        id: FormDefinitionId,
    ) -> Result<Option<FormDefinition>, PersistenceError> {
        let sql = self.sql(&format!(
            "SELECT {} FROM form_definitions WHERE tenant_id = ? AND id = ?",
            FORM_COLUMNS
        ));

        let row = sqlx::query(&sql)
            .bind(tenant.to_string())
            .bind(id.to_string())
            .fetch_optional(self.pool.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(FormDefinitionRow::from_any_row(&row)?).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, tenant: TenantId) -> Result<Vec<FormDefinition>, PersistenceError> {
        let sql = self.sql(&format!(
            "SELECT {} FROM form_definitions WHERE tenant_id = ? ORDER BY name",
            FORM_COLUMNS
        ));

        let rows = sqlx::query(&sql)
            .bind(tenant.to_string())
            .fetch_all(self.pool.pool())
            .await?;

        let mut forms = Vec::with_capacity(rows.len());
        for row in rows {
            forms.push(self.hydrate(FormDefinitionRow::from_any_row(&row)?).await?);
        }

        Ok(forms)
    }

    async fn add(&self, form: &FormDefinition) -> Result<(), PersistenceError> {
        let form_row = FormDefinitionRow::from(form);
        let field_rows = form
            .fields
            .iter()
            .map(|f| FieldDefinitionRow::from_definition(form.id, f))
            .collect::<Result<Vec<_>, _>>()?;

        let table_key = identifier_key(&form.table_name);

        let insert_form = self.sql(&format!(
            "INSERT INTO form_definitions ({}, table_key) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            FORM_COLUMNS
        ));
        let insert_field = self.sql(&format!(
            "INSERT INTO field_definitions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            FIELD_COLUMNS
        ));

        let mut tx = self.pool.pool().begin().await?;

        let inserted = sqlx::query(&insert_form)
            .bind(&form_row.id)
            .bind(&form_row.tenant_id)
            .bind(&form_row.name)
            .bind(&form_row.display_name)
            .bind(&form_row.description)
            .bind(&form_row.table_name)
            .bind(&form_row.created_at)
            .bind(&form_row.updated_at)
            .bind(&table_key)
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::from);

        if let Err(e) = inserted {
            if e.is_unique_violation() {
                return Err(PersistenceError::Duplicate {
                    entity_type: "form_definition".to_string(),
                    name: form.name.clone(),
                });
            }
            return Err(e);
        }

        for field in &field_rows {
            sqlx::query(&insert_field)
                .bind(&field.id)
                .bind(&field.form_definition_id)
                .bind(&field.name)
                .bind(&field.label)
                .bind(&field.field_type)
                .bind(field.is_required)
                .bind(field.sort_order)
                .bind(&field.configuration)
                .execute(&mut *tx)
                .await?;
        }

        // A live form takes its retired table back
        sqlx::query(&self.sql("DELETE FROM retired_tables WHERE table_key = ?"))
            .bind(&table_key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            "Stored form definition '{}' ({} fields) for tenant {}",
            form.name,
            field_rows.len(),
            form.tenant_id
        );

        Ok(())
    }

    async fn delete(&self, tenant: TenantId, name: &str) -> Result<bool, PersistenceError> {
        let find = self.sql(&format!(
            "SELECT {} FROM form_definitions WHERE tenant_id = ? AND LOWER(name) = ?",
            FORM_COLUMNS
        ));
        let find_fields = self.sql(&format!(
            "SELECT {} FROM field_definitions WHERE form_definition_id = ?",
            FIELD_COLUMNS
        ));
        let clear_retired = self.sql("DELETE FROM retired_tables WHERE table_key = ?");
        let insert_retired = self.sql(&format!(
            "INSERT INTO retired_tables (table_key, {}) VALUES (?, ?, ?, ?, ?, ?)",
            RETIRED_COLUMNS
        ));
        let delete_fields = self.sql("DELETE FROM field_definitions WHERE form_definition_id = ?");
        let delete_form = self.sql("DELETE FROM form_definitions WHERE id = ?");

        let mut tx = self.pool.pool().begin().await?;

        let row = sqlx::query(&find)
            .bind(tenant.to_string())
            .bind(identifier_key(name))
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };
        let form_row = FormDefinitionRow::from_any_row(&row)?;
        let id = form_row.id.clone();

        let field_rows = sqlx::query(&find_fields)
            .bind(&id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(FieldDefinitionRow::from_any_row)
            .collect::<Result<Vec<_>, _>>()?;

        // The table keeps its rows, so its name stays reserved
        let form = form_row.into_definition(field_rows)?;
        let retired = RetiredTableRow::from(&RetiredTable::for_form(&form));
        let table_key = identifier_key(&retired.table_name);

        sqlx::query(&clear_retired)
            .bind(&table_key)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&insert_retired)
            .bind(&table_key)
            .bind(&retired.table_name)
            .bind(&retired.tenant_id)
            .bind(&retired.form_name)
            .bind(&retired.table_shape)
            .bind(&retired.retired_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(&delete_fields)
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(&delete_form)
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            "Retired table '{}' of form '{}' for tenant {}",
            retired.table_name,
            form.name,
            tenant
        );

        Ok(result.rows_affected() > 0)
    }

    async fn find_retired(
        &self,
        table_name: &str,
    ) -> Result<Option<RetiredTable>, PersistenceError> {
        let sql = self.sql(&format!(
            "SELECT {} FROM retired_tables WHERE table_key = ?",
            RETIRED_COLUMNS
        ));

        let row = sqlx::query(&sql)
            .bind(identifier_key(table_name))
            .fetch_optional(self.pool.pool())
            .await?;

        row.map(|row| RetiredTableRow::from_any_row(&row)?.into_retired())
            .transpose()
    }
}
