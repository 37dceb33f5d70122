//! Authentication handlers and shared application state.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::auth::{authenticate, require, Operation, RegistrationRequest};
use crate::db::{Role, User, UserRepository};
use crate::file::{FileStorage, FolderService, DEFAULT_MAX_FILE_SIZE, DEFAULT_REQUEST_TIMEOUT};
use crate::web::dto::{
    AdminCreateUserRequest, ApiResponse, AuthResponse, LoginRequest, RegisterRequest,
    UserResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};
use crate::{CabinetError, Database};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Arc<Database>,
    /// Blob storage.
    pub storage: FileStorage,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Token validity in days.
    pub token_expiry_days: u64,
    /// Maximum size of one uploaded file in bytes.
    pub max_upload_size: u64,
    /// Maximum number of files in one upload request.
    pub max_files_per_upload: usize,
    /// Time budget of uploads and archive builds.
    pub request_timeout: Duration,
}

impl AppState {
    /// Create a new application state with default limits.
    pub fn new(db: Arc<Database>, storage: FileStorage, jwt_secret: &str) -> Self {
        Self {
            db,
            storage,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            token_expiry_days: 30,
            max_upload_size: DEFAULT_MAX_FILE_SIZE,
            max_files_per_upload: 20,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the token validity in days.
    pub fn with_token_expiry_days(mut self, days: u64) -> Self {
        self.token_expiry_days = days;
        self
    }

    /// Set the upload limits.
    pub fn with_upload_limits(mut self, max_upload_size: u64, max_files_per_upload: usize) -> Self {
        self.max_upload_size = max_upload_size;
        self.max_files_per_upload = max_files_per_upload;
        self
    }

    /// Set the time budget of uploads and archive builds.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Token validity in seconds.
    pub fn token_lifetime_secs(&self) -> u64 {
        self.token_expiry_days * SECONDS_PER_DAY
    }

    /// Generate a bearer token for a user.
    pub fn generate_token(&self, user: &User) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            name: user.name.clone(),
            role: user.role.to_string(),
            iat: now,
            exp: now + self.token_lifetime_secs(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to encode JWT: {e}")))
    }

    /// Folder service configured with this state's limits.
    pub fn folder_service(&self) -> FolderService<'_> {
        FolderService::new(&self.db, &self.storage)
            .with_max_file_size(self.max_upload_size)
            .with_timeout(self.request_timeout)
    }

    /// Load the caller's user record.
    ///
    /// A token whose user no longer exists is rejected as unauthorized.
    pub async fn current_user(&self, claims: &JwtClaims) -> Result<User, ApiError> {
        UserRepository::new(self.db.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User no longer exists"))
    }

    /// Load the caller and check an admin-only operation.
    pub async fn authorize(&self, claims: &JwtClaims, operation: Operation) -> Result<User, ApiError> {
        let user = self.current_user(claims).await?;
        require(&user, operation, None)?;
        Ok(user)
    }

    fn auth_response(&self, user: &User) -> Result<AuthResponse, ApiError> {
        Ok(AuthResponse {
            token: self.generate_token(user)?,
            expires_in: self.token_lifetime_secs(),
            user: UserResponse::from(user),
        })
    }
}

/// POST /api/auth/register - Register a client account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let request = RegistrationRequest::new(req.name, req.email, req.password);
    let user = crate::auth::register(&repo, request)
        .await
        .map_err(CabinetError::from)?;

    let response = state.auth_response(&user)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Log in with email and password.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = authenticate(&repo, &req.email, &req.password).await?;

    tracing::info!(user_id = user.id, "User logged in");

    let response = state.auth_response(&user)?;
    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/auth/admin/create-user - Create a user of any role (admin only).
pub async fn admin_create_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<AdminCreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let admin = state.authorize(&claims, Operation::ManageUsers).await?;

    let repo = UserRepository::new(state.db.pool());
    let request = RegistrationRequest::new(req.name, req.email, req.password).with_role(req.role);
    let user = crate::auth::register(&repo, request)
        .await
        .map_err(CabinetError::from)?;

    if user.role == Role::Admin {
        tracing::info!(user_id = user.id, created_by = admin.id, "Admin account created");
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserResponse::from(&user))),
    ))
}
