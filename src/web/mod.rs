//! Web API module for Cabinet.
//!
//! This module provides the HTTP JSON API: authentication, admin folder
//! management and client downloads, plus the static `/uploads` route.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
