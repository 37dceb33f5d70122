//! Access control policy for Cabinet.
//!
//! A single pure decision function answers whether a user may perform an
//! operation, optionally on a specific folder. Admins may do everything.
//! Clients may only list folders shared with them, and download from
//! those whose permission level is `download`.

use std::fmt;
use std::str::FromStr;

use crate::db::{Role, User};
use crate::file::Permission;
use crate::{CabinetError, Result};

/// Operations subject to access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a folder.
    CreateFolder,
    /// List every folder regardless of sharing.
    ListAll,
    /// Change a folder's permission level or share list.
    UpdatePermissions,
    /// Delete a folder and its files.
    DeleteFolder,
    /// Upload files into a folder.
    Upload,
    /// Delete a single file.
    DeleteFile,
    /// Create, list or delete user accounts.
    ManageUsers,
    /// See a folder and its file list.
    ListFolder,
    /// Retrieve file bytes, singly or as an archive.
    Download,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Operation; 9] = [
        Operation::CreateFolder,
        Operation::ListAll,
        Operation::UpdatePermissions,
        Operation::DeleteFolder,
        Operation::Upload,
        Operation::DeleteFile,
        Operation::ManageUsers,
        Operation::ListFolder,
        Operation::Download,
    ];

    /// Snake-case name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateFolder => "create_folder",
            Operation::ListAll => "list_all",
            Operation::UpdatePermissions => "update_permissions",
            Operation::DeleteFolder => "delete_folder",
            Operation::Upload => "upload",
            Operation::DeleteFile => "delete_file",
            Operation::ManageUsers => "manage_users",
            Operation::ListFolder => "list_folder",
            Operation::Download => "download",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CabinetError::Validation(format!("unknown operation: {s}")))
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The operation may proceed.
    Allow,
    /// The operation is refused.
    Deny,
}

/// The folder attributes the policy looks at.
pub trait FolderAccess {
    /// The folder's permission level.
    fn permission(&self) -> Permission;

    /// Whether the given user is a shared recipient of the folder.
    fn is_shared_with(&self, user_id: i64) -> bool;
}

/// Decide whether `user` may perform `operation`, optionally on `folder`.
///
/// # Examples
///
/// ```
/// use cabinet::auth::policy::{can_perform, Decision, Operation};
/// use cabinet::db::{Role, User};
///
/// let client = User {
///     id: 2,
///     name: "Client".to_string(),
///     email: "client@example.com".to_string(),
///     password: String::new(),
///     role: Role::Client,
///     created_at: String::new(),
/// };
/// assert_eq!(can_perform(&client, Operation::CreateFolder, None), Decision::Deny);
/// ```
pub fn can_perform(
    user: &User,
    operation: Operation,
    folder: Option<&dyn FolderAccess>,
) -> Decision {
    if user.role == Role::Admin {
        return Decision::Allow;
    }

    let Some(folder) = folder else {
        return Decision::Deny;
    };

    let allowed = match operation {
        Operation::ListFolder => folder.is_shared_with(user.id),
        Operation::Download => {
            folder.is_shared_with(user.id) && folder.permission() == Permission::Download
        }
        _ => false,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Like [`can_perform`], but turns a denial into a permission error.
pub fn require(user: &User, operation: Operation, folder: Option<&dyn FolderAccess>) -> Result<()> {
    match can_perform(user, operation, folder) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(CabinetError::Permission(format!(
            "{operation} is not allowed"
        ))),
    }
}
