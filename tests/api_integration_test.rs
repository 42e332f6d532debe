mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::test_engine;
use dynaform::adapters::health_handler::HealthHandler;
use dynaform::domain::{AuthConfig, AuthMode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

async fn app_with(auth: AuthConfig) -> (Router, TempDir) {
    let (engine, store, dir) = test_engine().await;
    let health = Arc::new(HealthHandler::new(store));
    (dynaform::create_app(engine, health, auth), dir)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
    (status, body)
}

fn leave_request_body() -> Value {
    json!({
        "name": "leave_request",
        "display_name": "Leave request",
        "fields": [
            { "name": "reason", "label": "Reason", "field_type": "Text", "is_required": true, "sort_order": 1 },
            { "name": "days", "label": "Days", "field_type": "NumberField", "sort_order": 2 },
            { "name": "start", "label": "Start", "field_type": "DatePicker", "sort_order": 3 }
        ]
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _dir) = app_with(AuthConfig::default()).await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"], "ok");
    assert_eq!(body["checks"]["backend"], "SQLite");

    let (status, _) = send(&app, get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_form_lifecycle() {
    let (app, _dir) = app_with(AuthConfig::default()).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/form-definitions", leave_request_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["table_name"], "UserData_leave_request");
    assert_eq!(body["data"]["fields"][1]["field_type"], "number");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/form-definitions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["field_count"], 3);

    let (status, body) = send(&app, get(&format!("/api/form-definitions/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "leave_request");

    let (status, body) = send(&app, get("/api/form-definitions/by-name/leave_request")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = send(&app, get("/api/form-definitions/orphans")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/form-data/leave_request",
            json!({ "reason": "flu", "days": 2, "start": "2024-05-01" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let record_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/form-data/leave_request")).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], record_id.as_str());
    assert_eq!(records[0]["reason"], "flu");
    assert_eq!(records[0]["days"].as_f64(), Some(2.0));

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/form-definitions/by-name/leave_request/synthesize",
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/form-definitions/by-name/leave_request")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, get("/api/form-definitions/by-name/leave_request")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_error_statuses() {
    let (app, _dir) = app_with(AuthConfig::default()).await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/form-definitions", leave_request_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Duplicate
    let (status, body) = send(
        &app,
        json_request("POST", "/api/form-definitions", leave_request_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    // Invalid identifier
    let mut bad = leave_request_body();
    bad["name"] = json!("bad name!");
    let (status, _) = send(&app, json_request("POST", "/api/form-definitions", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing required field
    let (status, body) = send(
        &app,
        json_request("POST", "/api/form-data/leave_request", json!({ "days": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Reason"));

    // Value that does not fit the field type
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/form-data/leave_request",
            json!({ "reason": "flu", "days": "two" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("days"));

    // Same name in another case
    let mut shouting = leave_request_body();
    shouting["name"] = json!("LEAVE_REQUEST");
    let (status, _) = send(&app, json_request("POST", "/api/form-definitions", shouting)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The form stays readable
    let (status, body) = send(&app, get("/api/form-data/leave_request")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Unknown form
    let (status, _) = send(
        &app,
        json_request("POST", "/api/form-data/nope", json!({ "reason": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Malformed id
    let (status, _) = send(&app, get("/api/form-definitions/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bearer_auth_scopes_tenant() {
    let secret = "integration-secret";
    let auth = AuthConfig {
        enabled: true,
        mode: AuthMode::BearerToken,
        jwt_secret: Some(secret.to_string()),
        ..AuthConfig::default()
    };
    let (app, _dir) = app_with(auth).await;

    let (status, _) = send(&app, get("/api/form-definitions")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Health stays public
    let (status, _) = send(&app, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);

    let token = |tenant: &str| {
        let claims = json!({
            "sub": "tester",
            "exp": chrono::Utc::now().timestamp() + 3600,
            "tenant_id": tenant,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    };
    let alice = token(&uuid::Uuid::new_v4().to_string());
    let bob = token(&uuid::Uuid::new_v4().to_string());

    let mut request = json_request("POST", "/api/form-definitions", leave_request_body());
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {}", alice).parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut request = get("/api/form-definitions");
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {}", bob).parse().unwrap());
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let mut request = get("/api/form-definitions");
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {}", alice).parse().unwrap());
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
