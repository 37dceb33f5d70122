//! Response DTOs for the Web API.

use serde::Serialize;

use crate::db::{User, UserSummary};
use crate::file::{FileRecord, FolderDetails};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Plain message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// User information in responses.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// User role.
    pub role: String,
    /// Account creation timestamp.
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Register/login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Bearer token (JWT).
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    /// The authenticated user.
    pub user: UserResponse,
}

/// Public identity of a user embedded in folder responses.
#[derive(Debug, Serialize)]
pub struct UserSummaryResponse {
    /// User ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl From<&UserSummary> for UserSummaryResponse {
    fn from(user: &UserSummary) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// File metadata in responses.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Folder ID.
    pub folder_id: i64,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// Position in upload order.
    pub position: i64,
    /// Upload timestamp.
    pub created_at: String,
}

impl From<&FileRecord> for FileResponse {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id,
            folder_id: file.folder_id,
            name: file.name.clone(),
            size: file.size,
            position: file.position,
            created_at: file.created_at.clone(),
        }
    }
}

/// Folder with resolved references.
#[derive(Debug, Serialize)]
pub struct FolderResponse {
    /// Folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Permission level of shared recipients.
    pub permission: String,
    /// Creator of the folder.
    pub created_by: UserSummaryResponse,
    /// Users the folder is shared with.
    pub shared_with: Vec<UserSummaryResponse>,
    /// Files in upload order.
    pub files: Vec<FileResponse>,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&FolderDetails> for FolderResponse {
    fn from(details: &FolderDetails) -> Self {
        Self {
            id: details.folder.id,
            name: details.folder.name.clone(),
            permission: details.folder.permission.to_string(),
            created_by: UserSummaryResponse::from(&details.creator),
            shared_with: details
                .shared_with
                .iter()
                .map(UserSummaryResponse::from)
                .collect(),
            files: details.files.iter().map(FileResponse::from).collect(),
            created_at: details.folder.created_at.clone(),
        }
    }
}

/// Folder deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteFolderResponse {
    /// Message text.
    pub message: String,
    /// Number of files removed with the folder.
    pub files_deleted: usize,
}
