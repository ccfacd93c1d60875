//! Common test utilities for integration tests.
//!
//! These helpers run the full router against a real PostgreSQL database.
//! When `TEST_DATABASE_URL` is not set, [`create_test_pool`] returns `None`
//! and tests return early.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use evently_api::{
    app::create_app,
    config::{
        Config, DatabaseConfig, EmailConfig, JwtAuthConfig, LoggingConfig, RegistrationConfig,
        SecurityConfig, SeedConfig, ServerConfig, StorageConfig,
    },
};
use fake::faker::name::en::Name;
use fake::Fake;
use persistence::repositories::UserRepository;
use shared::jwt::JwtConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "evently-integration-test-secret";

/// Create a test database pool, or `None` when no test database is configured.
pub async fn create_test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    Some(pool)
}

/// Run migrations on the test database.
pub async fn run_migrations(pool: &PgPool) {
    sqlx::migrate!("../persistence/src/migrations")
        .run(pool)
        .await
        .expect("Failed to run migrations");
}

/// Sets up a migrated pool, or returns `None` so the caller can skip.
pub async fn setup() -> Option<PgPool> {
    let pool = create_test_pool().await?;
    run_migrations(&pool).await;
    Some(pool)
}

/// Test configuration using an HS256 secret.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL").unwrap_or_default(),
            max_connections: 20,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig::default(),
        jwt: JwtAuthConfig {
            secret: TEST_JWT_SECRET.to_string(),
            public_key: String::new(),
            private_key: String::new(),
            access_token_expiry_secs: 3600,
            leeway_secs: 30,
        },
        registration: RegistrationConfig {
            lock_timeout_ms: 5000,
        },
        email: EmailConfig::default(),
        storage: StorageConfig {
            public_dir: test_storage_dir().to_string_lossy().into_owned(),
            ..StorageConfig::default()
        },
        seed: SeedConfig::default(),
    }
}

/// Per-process upload directory under the system temp dir.
pub fn test_storage_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("evently-test-storage-{}", std::process::id()))
}

/// Create a test application router.
pub fn create_test_app(config: Config, pool: PgPool) -> Router {
    create_app(config, pool).expect("Failed to build test app")
}

/// Generate a unique email for testing.
pub fn unique_test_email() -> String {
    format!("test_{}@example.com", Uuid::new_v4())
}

/// A user row plus a Bearer token for it.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

/// Inserts a user and mints an access token for it.
pub async fn create_test_user(pool: &PgPool) -> TestUser {
    let name: String = Name().fake();
    let email = unique_test_email();

    let user = UserRepository::new(pool.clone())
        .create_user(&name, &email)
        .await
        .expect("Failed to create test user");

    TestUser {
        id: user.id,
        token: token_for(user.id),
        name,
        email,
    }
}

/// Mints an access token for any user id, existing or not.
pub fn token_for(user_id: Uuid) -> String {
    let jwt = JwtConfig::from_secret(TEST_JWT_SECRET, 3600, 30).expect("Invalid test secret");
    let (token, _jti) = jwt
        .generate_access_token(user_id)
        .expect("Failed to mint test token");
    token
}

/// A valid create/update payload with the given limit.
pub fn event_payload(name: &str, limit: i32) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "description": "An evening of talks and demos",
        "date": (Utc::now() + ChronoDuration::days(30)).to_rfc3339(),
        "image": "events/launch-party.jpg",
        "limit": limit,
    })
}

/// Creates an event via the API and returns its id.
pub async fn create_test_event(app: &Router, owner: &TestUser, limit: i32) -> Uuid {
    use tower::ServiceExt;

    let request = json_request_with_auth(
        Method::POST,
        "/events",
        event_payload("Community Meetup", limit),
        &owner.token,
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);

    let body = parse_response_body(response).await;
    body["event"]["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("Created event has no id")
}

/// Removes rows created for the given users. Events cascade to registrations.
pub async fn cleanup_users(pool: &PgPool, user_ids: &[Uuid]) {
    sqlx::query("DELETE FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .execute(pool)
        .await
        .ok();
}

/// Build a JSON request with authentication.
pub fn json_request_with_auth(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a JSON request without authentication.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Multipart boundary used by [`multipart_request_with_auth`].
pub const FORM_BOUNDARY: &str = "evently-form-boundary";

/// One part of a `multipart/form-data` body.
pub enum FormPart<'a> {
    Text(&'a str, String),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: Vec<u8>,
    },
}

/// Build a `multipart/form-data` request with authentication.
pub fn multipart_request_with_auth(
    method: Method,
    uri: &str,
    parts: Vec<FormPart<'_>>,
    token: &str,
) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", FORM_BOUNDARY).as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", FORM_BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", FORM_BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}

/// Text parts for a valid event form with the given limit.
pub fn event_form_parts(name: &str, limit: i32) -> Vec<FormPart<'static>> {
    vec![
        FormPart::Text("name", name.to_string()),
        FormPart::Text("description", "Slides, demos and pizza".to_string()),
        FormPart::Text(
            "date",
            (Utc::now() + ChronoDuration::days(21)).to_rfc3339(),
        ),
        FormPart::Text("limit", limit.to_string()),
    ]
}

/// Build a bodyless request with authentication.
pub fn request_with_auth(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Build an unauthenticated GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
