//! Account registration, login and admin bootstrap.

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::validation::{validate_account, ValidationError};
use crate::auth::{hash_password, verify_password, PasswordError};
use crate::config::AdminConfig;
use crate::db::{NewUser, Role, User, UserRepository};
use crate::{CabinetError, Result};

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Email already registered.
    #[error("email is already registered")]
    EmailExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<RegistrationError> for CabinetError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => CabinetError::Validation(e.to_string()),
            RegistrationError::EmailExists => {
                CabinetError::Validation("email is already registered".to_string())
            }
            RegistrationError::Password(e @ (PasswordError::TooShort | PasswordError::TooLong)) => {
                CabinetError::Validation(e.to_string())
            }
            RegistrationError::Password(e) => CabinetError::Internal(e.to_string()),
            RegistrationError::Database(msg) => CabinetError::Database(msg),
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Display name (1-100 characters).
    pub name: String,
    /// Login email.
    pub email: String,
    /// Password (8-128 characters).
    pub password: String,
    /// Role of the new account.
    pub role: Role,
}

impl RegistrationRequest {
    /// Create a registration request for a client account.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: Role::Client,
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Register a new user.
///
/// This function:
/// 1. Validates all input fields
/// 2. Checks if the email is already registered
/// 3. Hashes the password
/// 4. Creates the user in the database
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> std::result::Result<User, RegistrationError> {
    validate_account(&request.name, &request.email, &request.password)?;

    let email = request.email.trim();
    if repo
        .email_exists(email)
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?
    {
        return Err(RegistrationError::EmailExists);
    }

    let password_hash = hash_password(&request.password)?;
    let new_user = NewUser::new(request.name.trim(), email, password_hash).with_role(request.role);

    let user = repo.create(&new_user).await.map_err(|e| match e {
        CabinetError::Validation(_) => RegistrationError::EmailExists,
        other => RegistrationError::Database(other.to_string()),
    })?;

    info!(
        email = %user.email,
        user_id = user.id,
        role = %user.role,
        "New user registered"
    );

    Ok(user)
}

/// Verify login credentials.
///
/// Unknown emails and wrong passwords produce the same error.
pub async fn authenticate(repo: &UserRepository<'_>, email: &str, password: &str) -> Result<User> {
    let invalid = || CabinetError::Auth("invalid email or password".to_string());

    let user = repo.get_by_email(email).await?.ok_or_else(invalid)?;
    verify_password(password, &user.password).map_err(|_| invalid())?;

    Ok(user)
}

/// Create the configured admin account if no admin exists yet.
///
/// Returns the created admin, or `None` when an admin already exists or
/// no credentials are configured.
pub async fn ensure_admin(repo: &UserRepository<'_>, config: &AdminConfig) -> Result<Option<User>> {
    if repo.count_by_role(Role::Admin).await? > 0 {
        return Ok(None);
    }

    let Some((email, password)) = config.credentials() else {
        warn!("No admin account exists and no admin credentials are configured");
        return Ok(None);
    };

    let request = RegistrationRequest::new(&config.name, email, password).with_role(Role::Admin);
    let admin = register(repo, request).await?;
    info!(email = %admin.email, "Bootstrap admin account created");

    Ok(Some(admin))
}

/// Delete a user on behalf of an admin.
///
/// An admin cannot delete their own account, and a user who still created
/// folders cannot be deleted. Share memberships go with the user.
pub async fn delete_user(repo: &UserRepository<'_>, actor: &User, user_id: i64) -> Result<User> {
    if actor.id == user_id {
        return Err(CabinetError::Validation(
            "you cannot delete your own account".to_string(),
        ));
    }

    let user = repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| CabinetError::NotFound("user".to_string()))?;

    let folders = repo.count_created_folders(user_id).await?;
    if folders > 0 {
        return Err(CabinetError::Conflict(format!(
            "user still owns {folders} folder(s)"
        )));
    }

    if !repo.delete(user_id).await? {
        return Err(CabinetError::NotFound("user".to_string()));
    }

    info!(user_id, deleted_by = actor.id, "User deleted");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_register_client() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = register(
            &repo,
            RegistrationRequest::new(" Alice ", "alice@example.com", "password123"),
        )
        .await
        .unwrap();

        assert_eq!(user.name, "Alice");
        assert_eq!(user.role, Role::Client);
        assert!(user.password.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        register(
            &repo,
            RegistrationRequest::new("Alice", "alice@example.com", "password123"),
        )
        .await
        .unwrap();
        let result = register(
            &repo,
            RegistrationRequest::new("Alice 2", "Alice@Example.com", "password123"),
        )
        .await;

        assert!(matches!(result, Err(RegistrationError::EmailExists)));
    }

    #[tokio::test]
    async fn test_register_invalid_input() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let result = register(
            &repo,
            RegistrationRequest::new("Alice", "not-an-email", "password123"),
        )
        .await;
        assert!(matches!(result, Err(RegistrationError::Validation(_))));

        let result = register(&repo, RegistrationRequest::new("Alice", "a@example.com", "pw")).await;
        assert!(matches!(
            result,
            Err(RegistrationError::Validation(ValidationError::PasswordTooShort))
        ));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        register(
            &repo,
            RegistrationRequest::new("Alice", "alice@example.com", "password123"),
        )
        .await
        .unwrap();

        let user = authenticate(&repo, "ALICE@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");

        let wrong = authenticate(&repo, "alice@example.com", "wrong-password").await;
        assert!(matches!(wrong, Err(CabinetError::Auth(_))));

        let unknown = authenticate(&repo, "nobody@example.com", "password123").await;
        assert!(matches!(unknown, Err(CabinetError::Auth(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_once() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        let config = AdminConfig {
            email: Some("root@example.com".to_string()),
            password: Some("rootpassword".to_string()),
            name: "Root".to_string(),
        };

        let created = ensure_admin(&repo, &config).await.unwrap().unwrap();
        assert_eq!(created.role, Role::Admin);
        assert_eq!(created.name, "Root");

        assert!(ensure_admin(&repo, &config).await.unwrap().is_none());
        assert_eq!(repo.count_by_role(Role::Admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_admin_without_credentials() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let result = ensure_admin(&repo, &AdminConfig::default()).await.unwrap();
        assert!(result.is_none());
        assert_eq!(repo.count_by_role(Role::Admin).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_user_rules() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        let admin = register(
            &repo,
            RegistrationRequest::new("Admin", "admin@example.com", "password123")
                .with_role(Role::Admin),
        )
        .await
        .unwrap();
        let client = register(
            &repo,
            RegistrationRequest::new("Client", "client@example.com", "password123"),
        )
        .await
        .unwrap();

        let own = delete_user(&repo, &admin, admin.id).await;
        assert!(matches!(own, Err(CabinetError::Validation(_))));

        let missing = delete_user(&repo, &admin, 999).await;
        assert!(matches!(missing, Err(CabinetError::NotFound(_))));

        let other_admin = register(
            &repo,
            RegistrationRequest::new("Other", "other@example.com", "password123")
                .with_role(Role::Admin),
        )
        .await
        .unwrap();
        sqlx::query("INSERT INTO folders (name, created_by) VALUES ('Docs', ?)")
            .bind(other_admin.id)
            .execute(db.pool())
            .await
            .unwrap();
        let owner = delete_user(&repo, &admin, other_admin.id).await;
        assert!(matches!(owner, Err(CabinetError::Conflict(_))));

        let deleted = delete_user(&repo, &admin, client.id).await.unwrap();
        assert_eq!(deleted.id, client.id);
        assert!(repo.get_by_id(client.id).await.unwrap().is_none());
    }

    #[test]
    fn test_registration_error_conversion() {
        let err: CabinetError = RegistrationError::EmailExists.into();
        assert!(matches!(err, CabinetError::Validation(_)));

        let err: CabinetError = RegistrationError::Database("boom".to_string()).into();
        assert!(matches!(err, CabinetError::Database(_)));
    }
}
