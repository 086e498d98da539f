#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde_json::{json, Value};
use storefront::config::{extract_config, ConfigV1};
use storefront::routes::create_router;
use storefront::startup::build_state;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";

const TEST_CONFIG: &str = r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "json"
store:
  type: memory
  timeout_in_secs: 5
jwt:
  secret: test-secret
bind_address: 127.0.0.1:8081
"#;

pub fn load_test_config() -> ConfigV1 {
    extract_config(&Figment::new().merge(Yaml::string(TEST_CONFIG)))
        .expect("Failed to parse test config YAML")
}

pub async fn build_app() -> Router {
    let config = Arc::new(load_test_config());
    let state = build_state(config)
        .await
        .expect("failed to build application state");
    create_router(state)
}

pub fn request(method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("failed to build request")
}

/// Sends the request and decodes the body as JSON (`Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, text) = send_text(app, request).await;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or_else(|_| panic!("body is not JSON: {}", text))
    };
    (status, body)
}

pub async fn send_text(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn signup_body(email: &str, phone: &str) -> Value {
    json!({
        "first_name": "Asha",
        "last_name": "Patil",
        "email": email,
        "phone": phone,
        "password": "secret1",
    })
}

/// Signs up a user and returns `(user_id, access_token)`.
pub async fn signup(app: &Router, email: &str, phone: &str) -> (String, String) {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/users/signup",
            None,
            Some(signup_body(email, phone)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    (
        body["user_id"].as_str().unwrap().to_string(),
        body["access_token"].as_str().unwrap().to_string(),
    )
}

/// Adds a product and returns its id.
pub async fn add_product(app: &Router, name: &str, price: i64) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/admin/addproduct",
            None,
            Some(json!({
                "product_name": name,
                "price": price,
                "rating": 4,
                "image": format!("{}.png", name.to_lowercase()),
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "addproduct failed: {}", body);
    body["product_id"].as_str().unwrap().to_string()
}
