//! Router configuration for the Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    admin_create_user, create_folder, delete_file, delete_folder, delete_user, download_file,
    download_folder, list_all_folders, list_shared_folders, list_users, login, preview_file,
    register, update_folder, upload_files, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Create the main router.
///
/// `max_upload_body` bounds the request body of the upload route only.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
    max_upload_body: usize,
) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/admin/create-user", post(admin_create_user));

    // Admin routes are registered with full paths so that both
    // `/api/admin/` and `/api/admin/users` resolve.
    let admin_routes = Router::new()
        .route("/api/admin/", get(list_users))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id", delete(delete_user))
        .route(
            "/api/admin/folders",
            get(list_all_folders).post(create_folder),
        )
        .route(
            "/api/admin/folders/:id",
            delete(delete_folder).patch(update_folder),
        )
        .route(
            "/api/admin/files/:folder_id",
            post(upload_files).layer(DefaultBodyLimit::max(max_upload_body)),
        )
        .route(
            "/api/admin/files/:folder_id/:file_id",
            delete(delete_file),
        );

    let client_routes = Router::new()
        .route("/folders", get(list_shared_folders))
        .route("/files/:id", get(download_file))
        .route("/files/preview/:id", get(preview_file))
        .route("/files/folder/:id", get(download_folder));

    let uploads = ServeDir::new(app_state.storage.base_path());

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/client", client_routes)
        .merge(admin_routes)
        .nest_service("/uploads", uploads)
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
