//! Folder types and repository for Cabinet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;

use crate::db::UserSummary;
use crate::Result;

/// Permission level granted to a folder's shared recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Recipients may see the folder and preview its files.
    #[default]
    Consult,
    /// Recipients may also download file bytes.
    Download,
}

impl Permission {
    /// Convert permission to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Consult => "consult",
            Permission::Download => "download",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a permission name is not recognized.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown permission: {0}")]
pub struct ParsePermissionError(pub String);

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "consult" => Ok(Permission::Consult),
            "download" => Ok(Permission::Download),
            _ => Err(ParsePermissionError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Permission {
    type Error = ParsePermissionError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// A folder row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// ID of the admin who created the folder.
    pub created_by: i64,
    /// Permission level of shared recipients.
    #[sqlx(try_from = "String")]
    pub permission: Permission,
    /// When the folder was created.
    pub created_at: String,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// IDs of users the folder is shared with.
    pub shared_with: Vec<i64>,
    /// Permission level of shared recipients.
    pub permission: Permission,
}

impl NewFolder {
    /// Create a new unshared folder with consult permission.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_with: Vec::new(),
            permission: Permission::Consult,
        }
    }

    /// Set the shared recipients.
    pub fn shared_with(mut self, user_ids: impl Into<Vec<i64>>) -> Self {
        self.shared_with = user_ids.into();
        self
    }

    /// Set the permission level.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }
}

/// Partial update of a folder's access settings.
#[derive(Debug, Clone, Default)]
pub struct FolderUpdate {
    /// New permission level.
    pub permission: Option<Permission>,
    /// New share list, replacing the old one.
    pub shared_with: Option<Vec<i64>>,
}

impl FolderUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the permission level.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Replace the share list.
    pub fn shared_with(mut self, user_ids: impl Into<Vec<i64>>) -> Self {
        self.shared_with = Some(user_ids.into());
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.permission.is_none() && self.shared_with.is_none()
    }
}

const FOLDER_COLUMNS: &str = "id, name, created_by, permission, created_at";

/// Repository for folder and share rows.
///
/// Reads go through the pool. Writes take a connection so the caller can
/// group them in one transaction.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// List all folders ordered by ID.
    pub async fn list_all(&self) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// List the folders shared with a user, ordered by ID.
    pub async fn list_shared_with(&self, user_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT f.id, f.name, f.created_by, f.permission, f.created_at
             FROM folders f
             JOIN folder_shares s ON s.folder_id = f.id
             WHERE s.user_id = ?
             ORDER BY f.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// List the users a folder is shared with, ordered by user ID.
    pub async fn list_shares(&self, folder_id: i64) -> Result<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.name, u.email
             FROM folder_shares s
             JOIN users u ON u.id = s.user_id
             WHERE s.folder_id = ?
             ORDER BY u.id",
        )
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Insert a folder row and return its ID.
    pub async fn insert(
        conn: &mut SqliteConnection,
        name: &str,
        created_by: i64,
        permission: Permission,
    ) -> Result<i64> {
        let result =
            sqlx::query("INSERT INTO folders (name, created_by, permission) VALUES (?, ?, ?)")
                .bind(name)
                .bind(created_by)
                .bind(permission.as_str())
                .execute(&mut *conn)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Check that a folder exists.
    pub async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM folders WHERE id = ?)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(exists)
    }

    /// Set a folder's permission level. Returns false if the folder is missing.
    pub async fn set_permission(
        conn: &mut SqliteConnection,
        id: i64,
        permission: Permission,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE folders SET permission = ? WHERE id = ?")
            .bind(permission.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a folder's share list.
    pub async fn replace_shares(
        conn: &mut SqliteConnection,
        folder_id: i64,
        user_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM folder_shares WHERE folder_id = ?")
            .bind(folder_id)
            .execute(&mut *conn)
            .await?;

        for user_id in user_ids {
            sqlx::query("INSERT OR IGNORE INTO folder_shares (folder_id, user_id) VALUES (?, ?)")
                .bind(folder_id)
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Delete a folder row. Share rows cascade.
    ///
    /// Returns true if a folder was deleted, false if not found.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, Role, UserRepository};
    use crate::Database;

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());
        let admin = repo
            .create(&NewUser::new("Admin", "admin@example.com", "pw").with_role(Role::Admin))
            .await
            .unwrap();
        let client = repo
            .create(&NewUser::new("Client", "client@example.com", "pw"))
            .await
            .unwrap();
        (db, admin.id, client.id)
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("consult".parse::<Permission>().unwrap(), Permission::Consult);
        assert_eq!("download".parse::<Permission>().unwrap(), Permission::Download);
        assert!("write".parse::<Permission>().is_err());
        assert_eq!(Permission::default(), Permission::Consult);
    }

    #[test]
    fn test_permission_serde() {
        let p: Permission = serde_json::from_str("\"download\"").unwrap();
        assert_eq!(p, Permission::Download);
        assert!(serde_json::from_str::<Permission>("\"DOWNLOAD\"").is_err());
    }

    #[test]
    fn test_folder_update_is_empty() {
        assert!(FolderUpdate::new().is_empty());
        assert!(!FolderUpdate::new().permission(Permission::Download).is_empty());
        assert!(!FolderUpdate::new().shared_with(vec![]).is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (db, admin_id, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = FolderRepository::insert(&mut conn, "Reports", admin_id, Permission::Download)
            .await
            .unwrap();
        drop(conn);

        let repo = FolderRepository::new(db.pool());
        let folder = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(folder.name, "Reports");
        assert_eq!(folder.created_by, admin_id);
        assert_eq!(folder.permission, Permission::Download);
        assert!(repo.get_by_id(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shares_replace_and_list() {
        let (db, admin_id, client_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = FolderRepository::insert(&mut conn, "Shared", admin_id, Permission::Consult)
            .await
            .unwrap();
        FolderRepository::replace_shares(&mut conn, id, &[client_id, admin_id])
            .await
            .unwrap();
        drop(conn);

        let repo = FolderRepository::new(db.pool());
        let shares = repo.list_shares(id).await.unwrap();
        let ids: Vec<i64> = shares.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![admin_id, client_id]);

        let visible = repo.list_shared_with(client_id).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, id);

        let mut conn = db.pool().acquire().await.unwrap();
        FolderRepository::replace_shares(&mut conn, id, &[admin_id])
            .await
            .unwrap();
        drop(conn);
        assert!(repo.list_shared_with(client_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_permission_and_delete() {
        let (db, admin_id, client_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = FolderRepository::insert(&mut conn, "Temp", admin_id, Permission::Consult)
            .await
            .unwrap();
        FolderRepository::replace_shares(&mut conn, id, &[client_id])
            .await
            .unwrap();

        assert!(FolderRepository::set_permission(&mut conn, id, Permission::Download)
            .await
            .unwrap());
        assert!(!FolderRepository::set_permission(&mut conn, id + 10, Permission::Download)
            .await
            .unwrap());

        assert!(FolderRepository::delete(&mut conn, id).await.unwrap());
        assert!(!FolderRepository::exists(&mut conn, id).await.unwrap());
        let share_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folder_shares")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(share_count, 0);
    }

    #[tokio::test]
    async fn test_deleting_user_removes_share() {
        let (db, admin_id, client_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = FolderRepository::insert(&mut conn, "Shared", admin_id, Permission::Consult)
            .await
            .unwrap();
        FolderRepository::replace_shares(&mut conn, id, &[client_id])
            .await
            .unwrap();
        drop(conn);

        UserRepository::new(db.pool()).delete(client_id).await.unwrap();
        let repo = FolderRepository::new(db.pool());
        assert!(repo.list_shares(id).await.unwrap().is_empty());
        assert!(repo.get_by_id(id).await.unwrap().is_some());
    }
}
