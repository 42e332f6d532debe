//! Dynamic schema engine
//!
//! `FormEngine` ties the three layers together:
//!
//! - the schema registry ([`FormRepository`]) holding form/field metadata,
//! - the [`TableSynthesizer`] turning a definition into a physical table,
//! - the [`DataMediator`] validating submissions and reading rows back.
//!
//! Form creation commits metadata first and synthesizes the table second.
//! The two steps are not atomic: when synthesis fails the metadata stays
//! behind without a table. That state is logged at error level, reported by
//! [`FormEngine::find_orphans`], and repaired only on request through
//! [`FormEngine::resynthesize`].

pub mod column;
pub mod error;
pub mod mediator;
pub mod synthesizer;

pub use column::ColumnType;
pub use error::SchemaError;
pub use mediator::{DataMediator, Record, SqlParam, ValueMismatch};
pub use synthesizer::TableSynthesizer;

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{DynamicValue, FormDefinition, FormDefinitionId, NewFormDefinition, TenantId};
use crate::persistence::{ConnectionPool, DataStore, FormRepository, PersistenceError};

/// Default prefix for generated table names
pub const DEFAULT_TABLE_PREFIX: &str = "UserData_";

#[derive(Clone)]
pub struct FormEngine {
    forms: Arc<dyn FormRepository>,
    synthesizer: TableSynthesizer,
    mediator: DataMediator,
    table_prefix: String,
}

impl FormEngine {
    pub fn new(
        pool: ConnectionPool,
        forms: Arc<dyn FormRepository>,
        table_prefix: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer: TableSynthesizer::new(pool.clone()),
            mediator: DataMediator::new(pool, forms.clone()),
            forms,
            table_prefix: table_prefix.into(),
        }
    }

    /// Build an engine over a data store's pool and form repository
    pub fn from_store(store: &DataStore, table_prefix: impl Into<String>) -> Self {
        let forms: Arc<dyn FormRepository> = store.forms().clone();
        Self::new(store.pool().clone(), forms, table_prefix)
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Persist a form definition, then synthesize its table.
    ///
    /// Identifier and duplicate checks run before anything is written, so
    /// an invalid definition leaves neither metadata nor a table. Form names
    /// are compared case-insensitively, like the tables they derive.
    ///
    /// A table left by a deleted form is handed back only to the tenant that
    /// owned it and only for the same column layout. Any other table already
    /// holding the derived name is never adopted.
    pub async fn create_form(
        &self,
        tenant: TenantId,
        request: NewFormDefinition,
    ) -> Result<FormDefinition, SchemaError> {
        let form = FormDefinition::from_request(tenant, request, &self.table_prefix);
        synthesizer::validate_definition(&form)?;

        if self.forms.get_by_name(tenant, &form.name).await?.is_some() {
            return Err(SchemaError::DuplicateDefinition {
                entity: "form".to_string(),
                name: form.name,
            });
        }

        self.check_table_available(&form).await?;

        self.forms.add(&form).await.map_err(|e| match e {
            PersistenceError::Duplicate { name, .. } => SchemaError::DuplicateDefinition {
                entity: "form".to_string(),
                name,
            },
            other => SchemaError::Registry(other),
        })?;

        if let Err(e) = self.synthesizer.synthesize(&form).await {
            tracing::error!(
                form = %form.name,
                form_id = %form.id,
                tenant = %tenant,
                table = %form.table_name,
                "Form metadata committed but table synthesis failed; definition is orphaned: {}",
                e
            );
            return Err(e);
        }

        tracing::info!(
            "Created form '{}' ({}) for tenant {}",
            form.name,
            form.id,
            tenant
        );
        Ok(form)
    }

    async fn check_table_available(&self, form: &FormDefinition) -> Result<(), SchemaError> {
        let taken = match self.forms.find_retired(&form.table_name).await? {
            Some(retired) => {
                let admitted = retired.admits(form);
                if !admitted {
                    tracing::warn!(
                        table = %form.table_name,
                        owner = %retired.tenant_id,
                        tenant = %form.tenant_id,
                        "Refusing to reuse retired table"
                    );
                }
                !admitted
            }
            None => self.synthesizer.table_exists(&form.table_name).await?,
        };

        if taken {
            return Err(SchemaError::DuplicateDefinition {
                entity: "table".to_string(),
                name: form.table_name.clone(),
            });
        }
        Ok(())
    }

    pub async fn get_form(
        &self,
        tenant: TenantId,
        name: &str,
    ) -> Result<FormDefinition, SchemaError> {
        self.forms
            .get_by_name(tenant, name)
            .await?
            .ok_or_else(|| SchemaError::NotFound {
                form: name.to_string(),
            })
    }

    pub async fn get_form_by_id(
        &self,
        tenant: TenantId,
        id: FormDefinitionId,
    ) -> Result<FormDefinition, SchemaError> {
        self.forms
            .get_by_id(tenant, id)
            .await?
            .ok_or_else(|| SchemaError::NotFound {
                form: id.to_string(),
            })
    }

    pub async fn list_forms(&self, tenant: TenantId) -> Result<Vec<FormDefinition>, SchemaError> {
        Ok(self.forms.list(tenant).await?)
    }

    /// Remove a form's metadata. The generated table is left in place and
    /// stays reserved for this tenant and the same column layout.
    pub async fn delete_form(&self, tenant: TenantId, name: &str) -> Result<(), SchemaError> {
        if !self.forms.delete(tenant, name).await? {
            return Err(SchemaError::NotFound {
                form: name.to_string(),
            });
        }
        tracing::info!("Deleted form metadata '{}' for tenant {}", name, tenant);
        Ok(())
    }

    pub async fn submit_data(
        &self,
        tenant: TenantId,
        form_name: &str,
        values: &HashMap<String, DynamicValue>,
    ) -> Result<Uuid, SchemaError> {
        self.mediator.submit(tenant, form_name, values).await
    }

    pub async fn get_data(
        &self,
        tenant: TenantId,
        form_name: &str,
    ) -> Result<Vec<Record>, SchemaError> {
        self.mediator.query(tenant, form_name).await
    }

    /// Forms of a tenant whose generated table does not exist
    pub async fn find_orphans(&self, tenant: TenantId) -> Result<Vec<FormDefinition>, SchemaError> {
        let mut orphans = Vec::new();
        for form in self.forms.list(tenant).await? {
            if !self.synthesizer.table_exists(&form.table_name).await? {
                orphans.push(form);
            }
        }
        Ok(orphans)
    }

    /// Run synthesis again for an existing form
    pub async fn resynthesize(
        &self,
        tenant: TenantId,
        name: &str,
    ) -> Result<FormDefinition, SchemaError> {
        let form = self.get_form(tenant, name).await?;
        self.synthesizer.synthesize(&form).await?;
        Ok(form)
    }

    pub fn synthesizer(&self) -> &TableSynthesizer {
        &self.synthesizer
    }
}
