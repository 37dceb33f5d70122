//! Test helpers for Web API integration tests.
//!
//! Provides a TestApp wrapping an axum-test server over an in-memory
//! database and a temporary content root.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use cabinet::db::{Role, UserRepository};
use cabinet::file::FileStorage;
use cabinet::web::handlers::AppState;
use cabinet::web::middleware::JwtState;
use cabinet::web::router::create_router;
use cabinet::{register, Database, RegistrationRequest};

/// JWT secret used by every test server.
pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Password used for every test account.
pub const PASSWORD: &str = "password123";

/// A running in-process API with its backing stores.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub storage: FileStorage,
    _temp: TempDir,
}

/// Create a test app with default limits.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|state| state).await
}

/// Create a test app, letting the caller adjust the application state.
pub async fn create_test_app_with(configure: impl FnOnce(AppState) -> AppState) -> TestApp {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let storage =
        FileStorage::new(temp.path().join("uploads")).expect("Failed to create storage");
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );

    let app_state = configure(AppState::new(db.clone(), storage.clone(), JWT_SECRET));
    let jwt_state = Arc::new(JwtState::new(JWT_SECRET));
    let router = create_router(Arc::new(app_state), jwt_state, &[], 64 * 1024 * 1024);

    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        storage,
        _temp: temp,
    }
}

/// Format an Authorization header value.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Get the user ID from an auth response.
pub fn user_id(response: &Value) -> i64 {
    response["data"]["user"]["id"].as_i64().unwrap()
}

/// Get the token from an auth response.
pub fn token(response: &Value) -> String {
    response["data"]["token"].as_str().unwrap().to_string()
}

impl TestApp {
    /// Create an admin directly in the store and log in. Returns (id, token).
    pub async fn create_admin(&self, email: &str) -> (i64, String) {
        let repo = UserRepository::new(self.db.pool());
        let admin = register(
            &repo,
            RegistrationRequest::new("Admin", email, PASSWORD).with_role(Role::Admin),
        )
        .await
        .expect("Failed to create admin");

        let token = self.login(email, PASSWORD).await;
        (admin.id, token)
    }

    /// Register a client through the API. Returns (id, token).
    pub async fn register_client(&self, name: &str, email: &str) -> (i64, String) {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "name": name,
                "email": email,
                "password": PASSWORD
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body = response.json::<Value>();
        (user_id(&body), token(&body))
    }

    /// Log in through the API and return the token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();
        token(&response.json::<Value>())
    }

    /// Create a folder and return its JSON.
    pub async fn create_folder(
        &self,
        token: &str,
        name: &str,
        shared_with: &[i64],
        permission: &str,
    ) -> Value {
        let response = self
            .server
            .post("/api/admin/folders")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({
                "name": name,
                "shared_with": shared_with,
                "permission": permission
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    /// Upload files into a folder.
    pub async fn upload(&self, token: &str, folder_id: i64, files: &[(&str, &[u8])]) -> TestResponse {
        let mut form = MultipartForm::new();
        for (name, content) in files {
            let part = Part::bytes(content.to_vec())
                .file_name(name.to_string())
                .mime_type("application/octet-stream");
            form = form.add_part("files", part);
        }

        self.server
            .post(&format!("/api/admin/files/{}", folder_id))
            .add_header(AUTHORIZATION, bearer(token))
            .multipart(form)
            .await
    }

    /// Number of blobs in the content root.
    pub fn blob_count(&self) -> usize {
        let mut count = 0;
        for shard in std::fs::read_dir(self.storage.base_path())
            .unwrap()
            .flatten()
        {
            if shard.path().is_dir() {
                count += std::fs::read_dir(shard.path()).unwrap().count();
            }
        }
        count
    }
}
