//! Shared harness for integration tests: the full router over in-memory
//! stores and a throwaway upload directory.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{header, Request, StatusCode},
    Router,
};
use pixvault::{
    app::build_app,
    config::{AppConfig, JwtConfig, StorageConfig},
    state::AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";
pub const BOUNDARY: &str = "pixvault-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub tmp: TempDir,
}

pub fn test_config(tmp: &TempDir) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: None,
        jwt: JwtConfig {
            secret: TEST_SECRET.into(),
            ttl_minutes: 60,
        },
        storage: StorageConfig {
            upload_dir: tmp.path().join("images"),
            max_upload_bytes: 1024 * 1024,
        },
        cors_origin: "http://localhost:5173".into(),
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let state = AppState::in_memory(test_config(&tmp))
            .await
            .expect("state");
        let app = build_app(state.clone()).expect("router");
        Self { app, state, tmp }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, path: &str, auth: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send_json(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_json(request).await
    }

    pub async fn delete(&self, path: &str, auth: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("DELETE").uri(path);
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send_json(builder.body(Body::empty()).unwrap()).await
    }

    /// POST /api/upload with a single multipart part.
    pub async fn upload(
        &self,
        auth: Option<&str>,
        field: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let request = builder
            .body(Body::from(multipart_body(field, filename, content_type, data)))
            .unwrap();
        self.send_json(request).await
    }

    /// Registers `username` with `<username>@example.com` and returns the token.
    pub async fn register(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/register",
                json!({
                    "username": username,
                    "name": username.to_uppercase(),
                    "email": format!("{}@example.com", username),
                    "password": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
