//! Form and field definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::identifier::identifier_key;
use crate::domain::tenant::TenantId;

/// Identifier of a persisted form definition
pub type FormDefinitionId = Uuid;

/// Declared type of a form field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    /// Bounded string; the option list lives in the field configuration
    Enumerated,
    /// A type name this build does not know, kept verbatim
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Enumerated => "enumerated",
            Self::Other(name) => name,
        }
    }

    /// Parse a type name. Legacy form-builder names are accepted as aliases.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "text" | "textfield" => Self::Text,
            "number" | "numberfield" => Self::Number,
            "date" | "datepicker" => Self::Date,
            "boolean" | "checkbox" => Self::Boolean,
            "enumerated" | "dropdown" => Self::Enumerated,
            _ => Self::Other(name.to_string()),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

/// One typed column descriptor within a form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: Uuid,
    /// Column identifier
    pub name: String,
    /// Human-readable label, used in validation messages
    pub label: String,
    pub field_type: FieldType,
    pub is_required: bool,
    pub sort_order: i32,
    /// Type-specific settings, e.g. `{"options": ["sick", "annual"]}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

/// A form definition together with its fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: FormDefinitionId,
    pub tenant_id: TenantId,
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the generated table backing this form
    pub table_name: String,
    /// Fields ordered by `sort_order`
    pub fields: Vec<FieldDefinition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormDefinition {
    /// Build a definition from a create request.
    ///
    /// Fields are sorted by `sort_order`; ties keep request order.
    pub fn from_request(
        tenant_id: TenantId,
        request: NewFormDefinition,
        table_prefix: &str,
    ) -> Self {
        let now = Utc::now();
        let table_name = derive_table_name(table_prefix, &request.name);

        let mut fields: Vec<FieldDefinition> = request
            .fields
            .into_iter()
            .map(|f| FieldDefinition {
                id: Uuid::new_v4(),
                name: f.name,
                label: f.label,
                field_type: f.field_type,
                is_required: f.is_required,
                sort_order: f.sort_order,
                configuration: f.configuration,
            })
            .collect();
        fields.sort_by_key(|f| f.sort_order);

        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: request.name,
            display_name: request.display_name,
            description: request.description,
            table_name,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_required)
    }

    /// Column layout fingerprint of the generated table.
    ///
    /// Two definitions with equal shapes produce the same physical columns,
    /// regardless of field order, labels or name casing.
    pub fn table_shape(&self) -> String {
        let mut columns: Vec<String> = self
            .fields
            .iter()
            .map(|f| {
                format!(
                    "{}:{}:{}",
                    identifier_key(&f.name),
                    f.field_type.as_str().to_ascii_lowercase(),
                    if f.is_required { "required" } else { "optional" }
                )
            })
            .collect();
        columns.sort();
        columns.join(",")
    }
}

/// Generated table left behind by a deleted form.
///
/// The table keeps its rows, so its name stays reserved for the tenant that
/// owned it and for the same column layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetiredTable {
    pub table_name: String,
    pub tenant_id: TenantId,
    pub form_name: String,
    pub table_shape: String,
    pub retired_at: DateTime<Utc>,
}

impl RetiredTable {
    /// Tombstone for the table of a form that is being deleted
    pub fn for_form(form: &FormDefinition) -> Self {
        Self {
            table_name: form.table_name.clone(),
            tenant_id: form.tenant_id,
            form_name: form.name.clone(),
            table_shape: form.table_shape(),
            retired_at: Utc::now(),
        }
    }

    /// Whether `form` may take this table over
    pub fn admits(&self, form: &FormDefinition) -> bool {
        self.tenant_id == form.tenant_id && self.table_shape == form.table_shape()
    }
}

/// Physical table name for a form name
pub fn derive_table_name(prefix: &str, form_name: &str) -> String {
    format!("{}{}", prefix, form_name)
}

/// Create request for a form definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFormDefinition {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<NewFieldDefinition>,
}

/// Create request for a single field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFieldDefinition {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub configuration: Option<Value>,
}

impl NewFieldDefinition {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            is_required: false,
            sort_order: 0,
            configuration: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn sort_order(mut self, order: i32) -> Self {
        self.sort_order = order;
        self
    }

    pub fn configuration(mut self, configuration: Value) -> Self {
        self.configuration = Some(configuration);
        self
    }
}
