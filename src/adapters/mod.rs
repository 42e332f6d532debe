pub mod api_handler;
pub mod auth_middleware;
pub mod health_handler;
