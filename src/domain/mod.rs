//! Core domain types: form definitions, submission values, tenant identity

pub mod auth;
pub mod form;
pub mod identifier;
pub mod tenant;
pub mod value;

pub use auth::{AuthConfig, AuthMode, TenantContext};
pub use form::{
    FieldDefinition, FieldType, FormDefinition, FormDefinitionId, NewFieldDefinition,
    NewFormDefinition, RetiredTable,
};
pub use identifier::{
    identifier_key, is_valid_identifier, validate_identifier, IdentifierViolation,
};
pub use tenant::TenantId;
pub use value::DynamicValue;
