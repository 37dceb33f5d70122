//! Web server for Cabinet.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::FileStorage;
use crate::{CabinetError, Database, Result};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::create_router;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Fully assembled router.
    router: Router,
}

impl WebServer {
    /// Create a new web server from configuration.
    ///
    /// The storage directory is created if missing.
    pub fn new(config: &Config, db: Arc<Database>) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| CabinetError::Config(format!("invalid server address: {e}")))?;

        let storage = FileStorage::new(&config.files.storage_path)?;
        tracing::info!("File storage initialized at: {}", config.files.storage_path);

        let app_state = AppState::new(db, storage, &config.web.jwt_secret)
            .with_token_expiry_days(config.web.jwt_expiry_days)
            .with_upload_limits(
                config.files.max_file_size_bytes(),
                config.files.max_files_per_upload,
            )
            .with_request_timeout(Duration::from_secs(config.files.request_timeout_secs));
        let jwt_state = Arc::new(JwtState::new(&config.web.jwt_secret));

        let router = create_router(
            Arc::new(app_state),
            jwt_state,
            &config.server.cors_origins,
            config.files.max_request_body_bytes(),
        );

        Ok(Self { addr, router })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get a clone of the router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.web.jwt_secret = "test-secret-key".to_string();
        config.files.storage_path = temp.path().join("uploads").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let temp = TempDir::new().unwrap();
        let config = create_test_config(&temp);
        let db = Database::open_in_memory().await.unwrap();

        let server = WebServer::new(&config, Arc::new(db)).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
        assert!(temp.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn test_web_server_invalid_address() {
        let temp = TempDir::new().unwrap();
        let mut config = create_test_config(&temp);
        config.server.host = "not an address".to_string();
        let db = Database::open_in_memory().await.unwrap();

        let result = WebServer::new(&config, Arc::new(db));
        assert!(matches!(result, Err(CabinetError::Config(_))));
    }
}
