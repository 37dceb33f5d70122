//! Tracing subscriber setup.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Third-party targets that are too chatty at the application level.
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "tower_http=info"];

/// Level named in the config. Unknown names fall back to `info`.
fn level_of(name: &str) -> Level {
    match name.trim() {
        n if n.eq_ignore_ascii_case("warning") => Level::WARN,
        n => Level::from_str(n).unwrap_or(Level::INFO),
    }
}

/// `RUST_LOG` wins over the configured level.
fn env_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    QUIET_TARGETS
        .iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(
            EnvFilter::default().add_directive(level_of(level).into()),
            EnvFilter::add_directive,
        )
}

fn open_log_file(path: &str) -> Result<fs::File> {
    let path = Path::new(path);
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
        _ => {}
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Log to stdout and append to `config.file`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file = Arc::new(open_log_file(&config.file)?);

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(file))
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    Ok(())
}

/// Stdout only. Used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
