//! Configuration module for Cabinet.

use serde::Deserialize;
use std::path::Path;

use crate::{CabinetError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (empty = allow any origin without credentials).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/cabinet.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Path to the content root. It is also served under `/uploads`.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum size of a single uploaded file in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Maximum number of files accepted in one upload request.
    #[serde(default = "default_max_files_per_upload")]
    pub max_files_per_upload: usize,
    /// Time budget for uploads and archive downloads, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_storage_path() -> String {
    "uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

fn default_max_files_per_upload() -> usize {
    20
}

fn default_request_timeout() -> u64 {
    120
}

impl FilesConfig {
    /// Maximum size of a single file in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }

    /// Maximum size of a whole upload request body in bytes.
    pub fn max_request_body_bytes(&self) -> usize {
        let bytes = self
            .max_file_size_bytes()
            .saturating_mul(self.max_files_per_upload.max(1) as u64);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
            max_files_per_upload: default_max_files_per_upload(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/cabinet.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Token configuration for the Web API.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Secret used to sign JWTs (HS256).
    #[serde(default)]
    pub jwt_secret: String,
    /// Token validity in days.
    #[serde(default = "default_jwt_expiry_days")]
    pub jwt_expiry_days: u64,
}

fn default_jwt_expiry_days() -> u64 {
    30
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiry_days: default_jwt_expiry_days(),
        }
    }
}

/// Initial administrator account, created at startup when no admin exists.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Email of the bootstrap admin.
    #[serde(default)]
    pub email: Option<String>,
    /// Plain-text password of the bootstrap admin.
    #[serde(default)]
    pub password: Option<String>,
    /// Display name of the bootstrap admin.
    #[serde(default = "default_admin_name")]
    pub name: String,
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

impl AdminConfig {
    /// Email and password, if both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().filter(|e| !e.trim().is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((email, password))
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            name: default_admin_name(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Bootstrap admin account.
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(CabinetError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CabinetError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CABINET_JWT_SECRET`: JWT signing secret
    /// - `CABINET_ADMIN_EMAIL`: bootstrap admin email
    /// - `CABINET_ADMIN_PASSWORD`: bootstrap admin password
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = non_empty_env("CABINET_JWT_SECRET") {
            self.web.jwt_secret = secret;
        }
        if let Some(email) = non_empty_env("CABINET_ADMIN_EMAIL") {
            self.admin.email = Some(email);
        }
        if let Some(password) = non_empty_env("CABINET_ADMIN_PASSWORD") {
            self.admin.password = Some(password);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(CabinetError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via the CABINET_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.files.max_upload_size_mb == 0 {
            return Err(CabinetError::Config(
                "files.max_upload_size_mb must be greater than 0".to_string(),
            ));
        }
        if self.files.max_files_per_upload == 0 {
            return Err(CabinetError::Config(
                "files.max_files_per_upload must be greater than 0".to_string(),
            ));
        }
        if self.files.request_timeout_secs == 0 {
            return Err(CabinetError::Config(
                "files.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert!(config.server.cors_origins.is_empty());

        assert_eq!(config.database.path, "data/cabinet.db");

        assert_eq!(config.files.storage_path, "uploads");
        assert_eq!(config.files.max_upload_size_mb, 50);
        assert_eq!(config.files.max_files_per_upload, 20);
        assert_eq!(config.files.request_timeout_secs, 120);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/cabinet.log");

        assert!(config.web.jwt_secret.is_empty());
        assert_eq!(config.web.jwt_expiry_days, 30);

        assert!(config.admin.email.is_none());
        assert!(config.admin.password.is_none());
        assert_eq!(config.admin.name, "Administrator");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:3000"]

[database]
path = "custom/db.sqlite"

[files]
storage_path = "/var/cabinet/uploads"
max_upload_size_mb = 10
max_files_per_upload = 5
request_timeout_secs = 30

[logging]
level = "debug"
file = "custom/cabinet.log"

[web]
jwt_secret = "secret"
jwt_expiry_days = 7

[admin]
email = "root@example.com"
password = "changeme123"
name = "Root"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.files.storage_path, "/var/cabinet/uploads");
        assert_eq!(config.files.max_upload_size_mb, 10);
        assert_eq!(config.files.max_files_per_upload, 5);
        assert_eq!(config.files.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/cabinet.log");
        assert_eq!(config.web.jwt_secret, "secret");
        assert_eq!(config.web.jwt_expiry_days, 7);
        assert_eq!(
            config.admin.credentials(),
            Some(("root@example.com", "changeme123"))
        );
        assert_eq!(config.admin.name, "Root");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 9000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.path, "data/cabinet.db");
        assert_eq!(config.files.max_upload_size_mb, 50);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.web.jwt_expiry_days, 30);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not [valid toml");

        if let Err(CabinetError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(CabinetError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[web]\njwt_secret = \"from-file\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.web.jwt_secret, "from-file");
    }

    #[test]
    fn test_apply_env_overrides_jwt_secret() {
        let original = std::env::var("CABINET_JWT_SECRET").ok();

        std::env::set_var("CABINET_JWT_SECRET", "env-secret-key");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.web.jwt_secret, "env-secret-key");

        // An empty value must not override
        std::env::set_var("CABINET_JWT_SECRET", "");
        let mut config = Config::default();
        config.web.jwt_secret = "original-secret".to_string();
        config.apply_env_overrides();
        assert_eq!(config.web.jwt_secret, "original-secret");

        if let Some(val) = original {
            std::env::set_var("CABINET_JWT_SECRET", val);
        } else {
            std::env::remove_var("CABINET_JWT_SECRET");
        }
    }

    #[test]
    fn test_apply_env_overrides_admin() {
        let original_email = std::env::var("CABINET_ADMIN_EMAIL").ok();
        let original_password = std::env::var("CABINET_ADMIN_PASSWORD").ok();

        std::env::set_var("CABINET_ADMIN_EMAIL", "boss@example.com");
        std::env::set_var("CABINET_ADMIN_PASSWORD", "boss-password");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(
            config.admin.credentials(),
            Some(("boss@example.com", "boss-password"))
        );

        match original_email {
            Some(val) => std::env::set_var("CABINET_ADMIN_EMAIL", val),
            None => std::env::remove_var("CABINET_ADMIN_EMAIL"),
        }
        match original_password {
            Some(val) => std::env::set_var("CABINET_ADMIN_PASSWORD", val),
            None => std::env::remove_var("CABINET_ADMIN_PASSWORD"),
        }
    }

    #[test]
    fn test_admin_credentials_require_both_fields() {
        let mut admin = AdminConfig::default();
        assert!(admin.credentials().is_none());

        admin.email = Some("admin@example.com".to_string());
        assert!(admin.credentials().is_none());

        admin.password = Some(String::new());
        assert!(admin.credentials().is_none());

        admin.password = Some("password123".to_string());
        assert!(admin.credentials().is_some());
    }

    #[test]
    fn test_validate_no_secret() {
        let config = Config::default();

        let result = config.validate();
        if let Err(CabinetError::Config(msg)) = result {
            assert!(msg.contains("jwt_secret"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_with_secret() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.files.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upload_limits() {
        let files = FilesConfig::default();
        assert_eq!(files.max_file_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(files.max_request_body_bytes(), 50 * 1024 * 1024 * 20);
    }
}
