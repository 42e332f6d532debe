use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapters::api_handler::ApiResponse;
use crate::domain::auth::{AuthConfig, AuthMode, TenantContext};
use crate::domain::TenantId;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    #[serde(alias = "tenantId")]
    tenant_id: String,
}

/// Resolves the tenant a request acts for
pub struct AuthMiddleware {
    config: Arc<AuthConfig>,
}

impl AuthMiddleware {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self { config }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<TenantContext, AuthError> {
        if !self.config.enabled {
            return self.default_context();
        }

        match self.config.mode {
            AuthMode::None => self.default_context(),
            AuthMode::BearerToken => self.validate_bearer_token(headers),
        }
    }

    fn default_context(&self) -> Result<TenantContext, AuthError> {
        let tenant = match &self.config.default_tenant {
            Some(raw) => raw
                .parse::<TenantId>()
                .map_err(|_| AuthError::ConfigurationError)?,
            None => TenantId::nil(),
        };
        Ok(TenantContext::anonymous(tenant))
    }

    fn validate_bearer_token(&self, headers: &HeaderMap) -> Result<TenantContext, AuthError> {
        let auth_header = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidCredentials)?;

        let secret = self
            .config
            .jwt_secret
            .as_ref()
            .ok_or(AuthError::ConfigurationError)?;

        let algorithm = match self.config.jwt_algorithm.as_deref() {
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            _ => Algorithm::HS256,
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AuthError::InvalidCredentials
        })?;

        let tenant_id: TenantId = token_data
            .claims
            .tenant_id
            .parse()
            .map_err(|_| AuthError::InvalidTenant)?;

        Ok(TenantContext {
            tenant_id,
            user_id: Some(token_data.claims.sub),
        })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidCredentials,
    InvalidTenant,
    ConfigurationError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "Missing credentials"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::InvalidTenant => (StatusCode::UNAUTHORIZED, "Token carries no valid tenant"),
            AuthError::ConfigurationError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Auth configuration error")
            }
        };

        (status, Json(ApiResponse::<()>::error(message.to_string()))).into_response()
    }
}

pub async fn auth_middleware(
    State(auth): State<Arc<AuthMiddleware>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = auth.authenticate(request.headers()).await?;

    // Handlers pick the tenant up from extensions
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
