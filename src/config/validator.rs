use thiserror::Error;
use uuid::Uuid;

use crate::config::{FormsSettings, ServerSettings, Settings};
use crate::domain::auth::{AuthConfig, AuthMode};
use crate::domain::validate_identifier;
use crate::persistence::PersistenceConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&settings.server) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_database(&settings.database) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_auth(&settings.auth) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_forms(&settings.forms) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_database(database: &PersistenceConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if database.url.is_empty() {
            errors.push(ValidationError::MissingField("database.url".to_string()));
        } else if !["sqlite:", "postgres:", "postgresql:", "mysql:", "mariadb:"]
            .iter()
            .any(|scheme| database.url.starts_with(scheme))
        {
            errors.push(ValidationError::InvalidValue {
                field: "database.url".to_string(),
                reason: "Unsupported scheme, expected sqlite, postgres or mysql".to_string(),
            });
        }

        if database.max_connections == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "database.max_connections".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_auth(auth: &AuthConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if auth.enabled && auth.mode == AuthMode::BearerToken {
            match &auth.jwt_secret {
                Some(secret) if !secret.is_empty() => {}
                _ => errors.push(ValidationError::CrossReference(
                    "auth.jwt_secret is required when bearer token auth is enabled".to_string(),
                )),
            }
        }

        if auth.enabled && auth.mode == AuthMode::None {
            errors.push(ValidationError::InvalidValue {
                field: "auth.mode".to_string(),
                reason: "Authentication is enabled but no mode is selected".to_string(),
            });
        }

        if let Some(alg) = &auth.jwt_algorithm {
            if !matches!(alg.as_str(), "HS256" | "HS384" | "HS512") {
                errors.push(ValidationError::InvalidValue {
                    field: "auth.jwt_algorithm".to_string(),
                    reason: format!("Unsupported algorithm '{}'", alg),
                });
            }
        }

        if let Some(tenant) = &auth.default_tenant {
            if Uuid::parse_str(tenant).is_err() {
                errors.push(ValidationError::InvalidValue {
                    field: "auth.default_tenant".to_string(),
                    reason: format!("'{}' is not a UUID", tenant),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_forms(forms: &FormsSettings) -> Result<(), Vec<ValidationError>> {
        // An empty prefix is allowed; table names then equal form names
        if forms.table_prefix.is_empty() {
            return Ok(());
        }

        validate_identifier(&forms.table_prefix).map_err(|violation| {
            vec![ValidationError::InvalidValue {
                field: "forms.table_prefix".to_string(),
                reason: violation.to_string(),
            }]
        })
    }
}
