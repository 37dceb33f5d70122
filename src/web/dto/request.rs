//! Request DTOs for the Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed, positive_ids};
use crate::db::Role;
use crate::file::{FolderUpdate, NewFolder, Permission};

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name.
    #[validate(
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars"),
        length(max = 100, message = "Must be at most 100 characters")
    )]
    pub name: String,
    /// Login email.
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 8, max = 128, message = "Must be 8 to 128 characters"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login email.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub password: String,
}

/// Admin request to create a user of any role.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    /// Display name.
    #[validate(
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars"),
        length(max = 100, message = "Must be at most 100 characters")
    )]
    pub name: String,
    /// Login email.
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 8, max = 128, message = "Must be 8 to 128 characters"))]
    pub password: String,
    /// Role of the new user (defaults to client).
    #[serde(default)]
    pub role: Role,
}

/// Create folder request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars"),
        length(max = 100, message = "Must be at most 100 characters")
    )]
    pub name: String,
    /// IDs of users to share the folder with.
    #[serde(default, alias = "sharedWith")]
    #[validate(custom(function = "positive_ids"))]
    pub shared_with: Vec<i64>,
    /// Permission level of shared recipients.
    pub permission: Permission,
}

impl From<CreateFolderRequest> for NewFolder {
    fn from(req: CreateFolderRequest) -> Self {
        NewFolder::new(req.name)
            .shared_with(req.shared_with)
            .permission(req.permission)
    }
}

/// Update folder access request. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFolderRequest {
    /// New permission level.
    #[serde(default)]
    pub permission: Option<Permission>,
    /// New share list, replacing the old one.
    #[serde(default, alias = "sharedWith")]
    #[validate(custom(function = "positive_ids"))]
    pub shared_with: Option<Vec<i64>>,
}

impl From<UpdateFolderRequest> for FolderUpdate {
    fn from(req: UpdateFolderRequest) -> Self {
        FolderUpdate {
            permission: req.permission,
            shared_with: req.shared_with,
        }
    }
}
