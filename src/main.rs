use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use cabinet::web::WebServer;
use cabinet::{ensure_admin, Config, Database, UserRepository};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = cabinet::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        cabinet::logging::init_console_only(&config.logging.level);
    }

    info!("Cabinet file-sharing server");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> cabinet::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    info!(path = %config.database.path, "Database ready");

    if let Some(admin) = ensure_admin(&UserRepository::new(db.pool()), &config.admin).await? {
        info!(email = %admin.email, "Bootstrap admin created");
    }

    let server = WebServer::new(&config, Arc::new(db))?;
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    server.run().await
}
