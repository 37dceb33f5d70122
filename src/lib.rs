//! Cabinet - a small file-sharing backend.
//!
//! Admins create folders, upload files into them and share them with
//! clients at `consult` or `download` level. Clients list their shared
//! folders and download single files or a whole folder as a zip archive.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    authenticate, can_perform, delete_user, ensure_admin, hash_password, register, require,
    validate_password, verify_password, Decision, FolderAccess, Operation, PasswordError,
    RegistrationError, RegistrationRequest, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository, UserSummary};
pub use error::{CabinetError, Result};
pub use file::{
    FileRecord, FileStorage, Folder, FolderDetails, FolderService, FolderUpdate, NewFolder,
    Permission, UploadItem,
};
