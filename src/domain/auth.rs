use serde::{Deserialize, Serialize};

use crate::domain::tenant::TenantId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMode {
    /// No credentials; every request runs as `default_tenant`
    None,
    /// HS* signed JWT carrying a `tenant_id` claim
    BearerToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub mode: AuthMode,
    pub jwt_secret: Option<String>,
    pub jwt_algorithm: Option<String>,
    /// Tenant used when authentication is disabled
    pub default_tenant: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: AuthMode::None,
            jwt_secret: None,
            jwt_algorithm: Some("HS256".to_string()),
            default_tenant: None,
        }
    }
}

/// Identity attached to every request by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: Option<String>,
}

impl TenantContext {
    pub fn anonymous(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            user_id: None,
        }
    }
}
