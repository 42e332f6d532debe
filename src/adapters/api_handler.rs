//! REST API handlers for form definitions and submitted data
//!
//! Every handler reads the caller's tenant from the [`TenantContext`] that
//! the auth middleware places in request extensions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{DynamicValue, FormDefinition, NewFormDefinition, TenantContext};
use crate::engine::{FormEngine, Record, SchemaError};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub engine: FormEngine,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

/// Returned after a successful submission
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: Uuid,
    pub form_name: String,
}

/// Summary row for listings
#[derive(Debug, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub table_name: String,
    pub field_count: usize,
}

impl From<&FormDefinition> for FormSummary {
    fn from(form: &FormDefinition) -> Self {
        Self {
            id: form.id,
            name: form.name.clone(),
            display_name: form.display_name.clone(),
            table_name: form.table_name.clone(),
            field_count: form.fields.len(),
        }
    }
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn failure<T>(err: SchemaError) -> ApiResult<T> {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

// ============================================================================
// Form Definition Endpoints
// ============================================================================

/// POST /api/form-definitions - Create a form and its table
pub async fn create_form_definition(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
    Json(request): Json<NewFormDefinition>,
) -> impl IntoResponse {
    match state.engine.create_form(ctx.tenant_id, request).await {
        Ok(form) => (StatusCode::CREATED, Json(ApiResponse::success(form))),
        Err(e) => failure(e),
    }
}

/// GET /api/form-definitions - List the tenant's forms
pub async fn list_form_definitions(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
) -> impl IntoResponse {
    match state.engine.list_forms(ctx.tenant_id).await {
        Ok(forms) => {
            let summaries: Vec<FormSummary> = forms.iter().map(FormSummary::from).collect();
            (StatusCode::OK, Json(ApiResponse::success(summaries)))
        }
        Err(e) => failure(e),
    }
}

/// GET /api/form-definitions/:id
pub async fn get_form_definition(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = Uuid::parse_str(&id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<FormDefinition>::error(format!("'{}' is not a form id", id))),
        );
    };

    match state.engine.get_form_by_id(ctx.tenant_id, id).await {
        Ok(form) => (StatusCode::OK, Json(ApiResponse::success(form))),
        Err(e) => failure(e),
    }
}

/// GET /api/form-definitions/by-name/:name
pub async fn get_form_definition_by_name(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.engine.get_form(ctx.tenant_id, &name).await {
        Ok(form) => (StatusCode::OK, Json(ApiResponse::success(form))),
        Err(e) => failure(e),
    }
}

/// DELETE /api/form-definitions/by-name/:name - Remove metadata, keep the table
pub async fn delete_form_definition(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.engine.delete_form(ctx.tenant_id, &name).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::<()>::ok())),
        Err(e) => failure(e),
    }
}

/// GET /api/form-definitions/orphans - Forms whose table is missing
pub async fn list_orphans(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
) -> impl IntoResponse {
    match state.engine.find_orphans(ctx.tenant_id).await {
        Ok(forms) => {
            let summaries: Vec<FormSummary> = forms.iter().map(FormSummary::from).collect();
            (StatusCode::OK, Json(ApiResponse::success(summaries)))
        }
        Err(e) => failure(e),
    }
}

/// POST /api/form-definitions/by-name/:name/synthesize - Recreate a missing table
pub async fn resynthesize_form(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.engine.resynthesize(ctx.tenant_id, &name).await {
        Ok(form) => (StatusCode::OK, Json(ApiResponse::success(FormSummary::from(&form)))),
        Err(e) => failure(e),
    }
}

// ============================================================================
// Form Data Endpoints
// ============================================================================

/// POST /api/form-data/:form_name - Submit one record
pub async fn submit_form_data(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(form_name): Path<String>,
    Json(values): Json<HashMap<String, DynamicValue>>,
) -> impl IntoResponse {
    match state.engine.submit_data(ctx.tenant_id, &form_name, &values).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(SubmissionReceipt { id, form_name })),
        ),
        Err(e) => failure(e),
    }
}

/// GET /api/form-data/:form_name - Read every record
pub async fn get_form_data(
    State(state): State<ApiState>,
    Extension(ctx): Extension<TenantContext>,
    Path(form_name): Path<String>,
) -> impl IntoResponse {
    match state.engine.get_data(ctx.tenant_id, &form_name).await {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::<Vec<Record>>::success(records))),
        Err(e) => failure(e),
    }
}
