//! Folder and file management for Cabinet.
//!
//! This module provides:
//! - Folder metadata, share lists and permission levels
//! - File metadata in upload order
//! - Blob storage with UUID naming
//! - Zip packaging of a folder
//! - The service tying them together

mod archive;
mod folder;
mod metadata;
mod service;
mod storage;

use std::time::Duration;

pub use archive::{archive_name, build_archive, entry_names, Archive};
pub use folder::{
    Folder, FolderRepository, FolderUpdate, NewFolder, ParsePermissionError, Permission,
};
pub use metadata::{FileRecord, FileRepository, NewFile};
pub use service::{
    validate_folder_name, with_timeout, FileDownload, FolderDetails, FolderService, UploadItem,
};
pub use storage::FileStorage;

/// Maximum length for a folder name (in characters).
pub const MAX_FOLDER_NAME_LENGTH: usize = 100;

/// Maximum length for a file display name (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum file size (50MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default time budget of uploads and archive builds.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
