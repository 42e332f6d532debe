//! # Dynaform - Dynamic Schema Engine
//!
//! Dynaform turns declarative form definitions into real relational tables
//! and stores submissions in them as ordinary typed rows.
//!
//! ## Features
//!
//! - **Schema registry**: form and field metadata scoped per tenant
//! - **Table synthesis**: idempotent `CREATE TABLE IF NOT EXISTS` from a definition
//! - **Data mediation**: required-field checks and parameterized inserts
//! - **Backends**: SQLite, PostgreSQL and MySQL through one `sqlx` pool
//! - **Authentication**: JWT bearer tokens carrying a tenant claim
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynaform::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let settings = Settings::new()?;
//!
//!     // Server will start on configured host:port
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: form, field, tenant and value types
//! - **Engine**: synthesizer and mediator over generated SQL
//! - **Persistence**: connection pool, migrations, metadata repository
//! - **Adapters**: HTTP handlers and middleware
//! - **Config**: configuration management

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod persistence;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::auth_middleware::{auth_middleware, AuthMiddleware};
use crate::adapters::health_handler::HealthHandler;
use crate::domain::AuthConfig;
use crate::engine::FormEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `engine` - Form engine serving definitions and data
/// * `health_handler` - Health check handler
/// * `auth` - Authentication settings used to resolve the tenant
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(
    engine: FormEngine,
    health_handler: Arc<HealthHandler>,
    auth: AuthConfig,
) -> Router {
    // Public routes (no tenant required)
    let public_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }));

    let api_state = ApiState { engine };

    let api_router = Router::new()
        // Form definitions
        .route(
            "/form-definitions",
            get(api_handler::list_form_definitions).post(api_handler::create_form_definition),
        )
        .route("/form-definitions/orphans", get(api_handler::list_orphans))
        .route("/form-definitions/:id", get(api_handler::get_form_definition))
        .route(
            "/form-definitions/by-name/:name",
            get(api_handler::get_form_definition_by_name).delete(api_handler::delete_form_definition),
        )
        .route(
            "/form-definitions/by-name/:name/synthesize",
            post(api_handler::resynthesize_form),
        )
        // Form data
        .route(
            "/form-data/:form_name",
            get(api_handler::get_form_data).post(api_handler::submit_form_data),
        )
        .with_state(api_state);

    // Tenant resolution runs for every API route, with or without auth enabled
    let auth = Arc::new(AuthMiddleware::new(Arc::new(auth)));
    let protected_router = Router::new()
        .nest("/api", api_router)
        .layer(axum::middleware::from_fn_with_state(auth, auth_middleware));

    let router = public_router.merge(protected_router);

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
