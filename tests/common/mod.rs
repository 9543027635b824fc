// tests/common/mod.rs

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use exam_desk::{config::Config, db, handlers::user::seed_admin, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@school.test";
pub const PASSWORD: &str = "password123";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        admin_email: None,
        admin_password: None,
    }
}

/// The router over a fresh in-memory database with one admin account.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::in_memory().await.expect("Failed to open in-memory database");
        seed_admin(&pool, ADMIN_EMAIL, PASSWORD)
            .await
            .expect("Failed to seed admin");

        let state = AppState::new(pool.clone(), test_config());

        Self {
            router: routes::create_router(state),
            pool,
        }
    }

    /// Sends one request and returns the status with the JSON body
    /// (`Value::Null` when the body is empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {}: {}", email, body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, PASSWORD).await
    }

    /// Creates an account through the admin API and returns its token.
    pub async fn user(&self, admin: &str, name: &str, role: &str) -> String {
        let email = format!("{}@school.test", name);
        let (status, body) = self
            .post(
                "/api/v1/users",
                admin,
                json!({ "name": name, "email": email, "password": PASSWORD, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        self.login(&email, PASSWORD).await
    }

    pub async fn exam(&self, teacher: &str, duration: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/exams",
                teacher,
                json!({
                    "name": "Biology quiz",
                    "description": "Cells and tissues",
                    "duration": duration,
                    "examDate": chrono::Utc::now().date_naive().to_string(),
                    "examTime": "09:00",
                    "status": "live"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    pub async fn question(&self, teacher: &str, exam_id: i64, correct: &str) -> i64 {
        let (status, body) = self
            .post(
                &format!("/api/v1/questions/{}", exam_id),
                teacher,
                json!({
                    "question": "Which organelle makes ATP?",
                    "optionA": "Nucleus",
                    "optionB": "Mitochondrion",
                    "optionC": "Ribosome",
                    "optionD": "Golgi body",
                    "correctAnswer": correct
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }
}
