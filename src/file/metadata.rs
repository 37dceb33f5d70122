//! File metadata types and repository for Cabinet.

use sqlx::{SqliteConnection, SqlitePool};

use crate::{CabinetError, Result};

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Folder this file belongs to.
    pub folder_id: i64,
    /// Display name (the uploaded filename).
    pub name: String,
    /// Stored filename (UUID.ext format).
    pub stored_name: String,
    /// File size in bytes.
    pub size: i64,
    /// 0-based upload order within the folder.
    pub position: i64,
    /// When the file was uploaded.
    pub created_at: String,
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Folder ID this file belongs to.
    pub folder_id: i64,
    /// Display name.
    pub name: String,
    /// Stored filename.
    pub stored_name: String,
    /// File size in bytes.
    pub size: i64,
}

impl NewFile {
    /// Create a new NewFile.
    pub fn new(
        folder_id: i64,
        name: impl Into<String>,
        stored_name: impl Into<String>,
        size: i64,
    ) -> Self {
        Self {
            folder_id,
            name: name.into(),
            stored_name: stored_name.into(),
            size,
        }
    }
}

const FILE_COLUMNS: &str = "id, folder_id, name, stored_name, size, position, created_at";

/// Repository for file metadata.
///
/// Reads go through the pool. Writes take a connection so the caller can
/// group them in one transaction.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List the files of a folder in upload order.
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE folder_id = ? ORDER BY position, id"
        ))
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Insert a file at the end of its folder.
    ///
    /// The position is computed inside the INSERT itself so concurrent
    /// uploads into the same folder never receive the same position.
    pub async fn insert(conn: &mut SqliteConnection, file: &NewFile) -> Result<FileRecord> {
        let result = sqlx::query(
            "INSERT INTO files (folder_id, name, stored_name, size, position)
             SELECT ?, ?, ?, ?, COALESCE(MAX(position), -1) + 1
             FROM files WHERE folder_id = ?",
        )
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(&file.stored_name)
        .bind(file.size)
        .bind(file.folder_id)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CabinetError::NotFound("file".to_string()))
    }

    /// Delete a file only if it belongs to the given folder.
    ///
    /// Returns true if a row was deleted.
    pub async fn delete_in_folder(
        conn: &mut SqliteConnection,
        folder_id: i64,
        file_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND folder_id = ?")
            .bind(file_id)
            .bind(folder_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every file of a folder and return their stored names.
    pub async fn delete_by_folder(
        conn: &mut SqliteConnection,
        folder_id: i64,
    ) -> Result<Vec<String>> {
        let stored_names: Vec<String> =
            sqlx::query_scalar("DELETE FROM files WHERE folder_id = ? RETURNING stored_name")
                .bind(folder_id)
                .fetch_all(&mut *conn)
                .await?;
        Ok(stored_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, Role, UserRepository};
    use crate::file::{FolderRepository, Permission};
    use crate::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let admin = UserRepository::new(db.pool())
            .create(&NewUser::new("Admin", "admin@example.com", "pw").with_role(Role::Admin))
            .await
            .unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let folder_id = FolderRepository::insert(&mut conn, "Docs", admin.id, Permission::Consult)
            .await
            .unwrap();
        drop(conn);
        (db, folder_id)
    }

    #[tokio::test]
    async fn test_insert_assigns_positions() {
        let (db, folder_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let a = FileRepository::insert(&mut conn, &NewFile::new(folder_id, "a.txt", "u1.txt", 1))
            .await
            .unwrap();
        let b = FileRepository::insert(&mut conn, &NewFile::new(folder_id, "b.txt", "u2.txt", 2))
            .await
            .unwrap();
        drop(conn);

        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_eq!(a.folder_id, folder_id);

        let files = FileRepository::new(db.pool())
            .list_by_folder(folder_id)
            .await
            .unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_positions_continue_after_delete() {
        let (db, folder_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = FileRepository::insert(&mut conn, &NewFile::new(folder_id, "a", "u1", 1))
            .await
            .unwrap();
        FileRepository::insert(&mut conn, &NewFile::new(folder_id, "b", "u2", 1))
            .await
            .unwrap();
        assert!(FileRepository::delete_in_folder(&mut conn, folder_id, first.id)
            .await
            .unwrap());
        let c = FileRepository::insert(&mut conn, &NewFile::new(folder_id, "c", "u3", 1))
            .await
            .unwrap();

        assert_eq!(c.position, 2);
    }

    #[tokio::test]
    async fn test_insert_into_missing_folder_fails() {
        let (db, folder_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let result =
            FileRepository::insert(&mut conn, &NewFile::new(folder_id + 1, "a", "u1", 1)).await;
        assert!(matches!(result, Err(CabinetError::Database(_))));
    }

    #[tokio::test]
    async fn test_delete_in_folder_checks_folder() {
        let (db, folder_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let file = FileRepository::insert(&mut conn, &NewFile::new(folder_id, "a", "u1", 1))
            .await
            .unwrap();

        assert!(!FileRepository::delete_in_folder(&mut conn, folder_id + 1, file.id)
            .await
            .unwrap());
        drop(conn);

        let repo = FileRepository::new(db.pool());
        assert!(repo.get_by_id(file.id).await.unwrap().is_some());
        assert_eq!(repo.list_by_folder(folder_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_folder_returns_stored_names() {
        let (db, folder_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        FileRepository::insert(&mut conn, &NewFile::new(folder_id, "a", "u1.txt", 1))
            .await
            .unwrap();
        FileRepository::insert(&mut conn, &NewFile::new(folder_id, "b", "u2.txt", 1))
            .await
            .unwrap();

        let mut names = FileRepository::delete_by_folder(&mut conn, folder_id)
            .await
            .unwrap();
        drop(conn);
        names.sort();

        assert_eq!(names, vec!["u1.txt".to_string(), "u2.txt".to_string()]);
        let repo = FileRepository::new(db.pool());
        assert!(repo.list_by_folder(folder_id).await.unwrap().is_empty());
    }
}
