//! Folder and file lifecycle service for Cabinet.
//!
//! This module provides the high-level operations behind the Web API:
//! - Folder creation and access updates
//! - All-or-nothing multi-file upload
//! - Folder and file deletion, including stored bytes
//! - Download and archive lookups

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::auth::{require, FolderAccess, Operation};
use crate::db::{Database, User, UserRepository, UserSummary};
use crate::{CabinetError, Result};

use super::archive::{self, Archive};
use super::folder::{Folder, FolderRepository, FolderUpdate, NewFolder, Permission};
use super::metadata::{FileRecord, FileRepository, NewFile};
use super::storage::FileStorage;
use super::{
    DEFAULT_MAX_FILE_SIZE, DEFAULT_REQUEST_TIMEOUT, MAX_FILENAME_LENGTH, MAX_FOLDER_NAME_LENGTH,
};

/// One file of an upload request.
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Display name (the uploaded filename).
    pub name: String,
    /// File content.
    pub content: Bytes,
}

impl UploadItem {
    /// Create a new upload item.
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A folder with its references resolved.
#[derive(Debug, Clone)]
pub struct FolderDetails {
    /// The folder row.
    pub folder: Folder,
    /// The admin who created the folder.
    pub creator: UserSummary,
    /// Shared recipients, ordered by user ID.
    pub shared_with: Vec<UserSummary>,
    /// Files in upload order.
    pub files: Vec<FileRecord>,
}

impl FolderAccess for FolderDetails {
    fn permission(&self) -> Permission {
        self.folder.permission
    }

    fn is_shared_with(&self, user_id: i64) -> bool {
        self.shared_with.iter().any(|u| u.id == user_id)
    }
}

/// An open stored file ready to be streamed.
#[derive(Debug)]
pub struct FileDownload {
    /// File metadata.
    pub file: FileRecord,
    /// Open handle on the stored bytes.
    pub content: tokio::fs::File,
    /// Length of the stored bytes.
    pub size: u64,
}

/// Service for folder and file lifecycle operations.
pub struct FolderService<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
    max_file_size: u64,
    timeout: Duration,
}

impl<'a> FolderService<'a> {
    /// Create a new FolderService.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self {
            db,
            storage,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the maximum size of a single uploaded file in bytes.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Set the time budget of uploads and archive builds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a folder owned by `creator`.
    ///
    /// The folder row and its share rows are inserted in one transaction.
    pub async fn create_folder(&self, creator: &User, folder: &NewFolder) -> Result<FolderDetails> {
        let name = validate_folder_name(&folder.name)?;
        let shared_with = dedup_ids(&folder.shared_with);

        let mut tx = self.db.transaction().await?;
        ensure_users_exist(&mut tx, &shared_with).await?;
        let id = FolderRepository::insert(&mut tx, &name, creator.id, folder.permission).await?;
        FolderRepository::replace_shares(&mut tx, id, &shared_with).await?;
        tx.commit().await?;

        info!(
            folder_id = id,
            name = %name,
            created_by = creator.id,
            shared = shared_with.len(),
            "Folder created"
        );

        self.get_folder(id).await
    }

    /// Store `items` in a folder, all or nothing.
    ///
    /// Every item is validated first. Blobs are then written, and all rows
    /// are inserted in one transaction. On any failure, including timeout,
    /// the transaction is rolled back and every blob written for this
    /// request is removed.
    pub async fn upload_files(&self, folder_id: i64, items: Vec<UploadItem>) -> Result<Vec<FileRecord>> {
        if items.is_empty() {
            return Err(CabinetError::Validation("no files provided".to_string()));
        }
        for item in &items {
            self.validate_item(item)?;
        }

        FolderRepository::new(self.db.pool())
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("folder".to_string()))?;

        let mut written: Vec<String> = Vec::with_capacity(items.len());
        let outcome = with_timeout(
            self.timeout,
            "upload",
            self.persist_uploads(folder_id, &items, &mut written),
        )
        .await;

        match outcome {
            Ok(files) => {
                info!(folder_id, count = files.len(), "Files uploaded");
                Ok(files)
            }
            Err(e) => {
                warn!(folder_id, error = %e, "Upload failed, removing written blobs");
                for stored_name in &written {
                    self.remove_blob(stored_name).await;
                }
                Err(e)
            }
        }
    }

    async fn persist_uploads(
        &self,
        folder_id: i64,
        items: &[UploadItem],
        written: &mut Vec<String>,
    ) -> Result<Vec<FileRecord>> {
        for item in items {
            let stored_name = FileStorage::generate_stored_name(&item.name);
            written.push(stored_name.clone());
            self.storage.save_with_name(&item.content, &stored_name).await?;
        }

        let mut tx = self.db.transaction().await?;
        let mut files = Vec::with_capacity(items.len());
        for (item, stored_name) in items.iter().zip(written.iter()) {
            let new_file = NewFile::new(
                folder_id,
                item.name.trim(),
                stored_name.as_str(),
                item.content.len() as i64,
            );
            files.push(FileRepository::insert(&mut tx, &new_file).await?);
        }
        tx.commit().await?;

        Ok(files)
    }

    fn validate_item(&self, item: &UploadItem) -> Result<()> {
        let name = item.name.trim();
        if name.is_empty() {
            return Err(CabinetError::Validation(
                "file name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_FILENAME_LENGTH {
            return Err(CabinetError::Validation(format!(
                "file name must be at most {MAX_FILENAME_LENGTH} characters"
            )));
        }
        if item.content.len() as u64 > self.max_file_size {
            return Err(CabinetError::Validation(format!(
                "{name} exceeds the maximum file size of {} bytes",
                self.max_file_size
            )));
        }
        Ok(())
    }

    /// Change a folder's permission level and/or share list.
    ///
    /// Only the supplied fields change. Both changes commit together.
    pub async fn update_permissions(&self, folder_id: i64, update: &FolderUpdate) -> Result<FolderDetails> {
        if update.is_empty() {
            return Err(CabinetError::Validation("nothing to update".to_string()));
        }

        let mut tx = self.db.transaction().await?;

        if !FolderRepository::exists(&mut tx, folder_id).await? {
            return Err(CabinetError::NotFound("folder".to_string()));
        }
        if let Some(permission) = update.permission {
            FolderRepository::set_permission(&mut tx, folder_id, permission).await?;
        }
        if let Some(ref user_ids) = update.shared_with {
            let user_ids = dedup_ids(user_ids);
            ensure_users_exist(&mut tx, &user_ids).await?;
            FolderRepository::replace_shares(&mut tx, folder_id, &user_ids).await?;
        }
        tx.commit().await?;

        info!(
            folder_id,
            permission = ?update.permission,
            shared_with = ?update.shared_with,
            "Folder access updated"
        );

        self.get_folder(folder_id).await
    }

    /// List the folders visible to `user`, ordered by ID.
    ///
    /// Admins see every folder; clients see the folders shared with them.
    pub async fn list_folders_visible_to(&self, user: &User) -> Result<Vec<FolderDetails>> {
        let repo = FolderRepository::new(self.db.pool());
        let folders = if user.is_admin() {
            repo.list_all().await?
        } else {
            repo.list_shared_with(user.id).await?
        };

        let mut visible = Vec::with_capacity(folders.len());
        for folder in folders {
            let details = self.resolve(folder).await?;
            if require(user, Operation::ListFolder, Some(&details)).is_ok() {
                visible.push(details);
            }
        }
        Ok(visible)
    }

    /// Delete a folder together with its files.
    ///
    /// Rows are removed in one transaction; stored bytes are removed after
    /// commit. Returns the number of files removed.
    pub async fn delete_folder(&self, folder_id: i64) -> Result<usize> {
        let mut tx = self.db.transaction().await?;
        let stored_names = FileRepository::delete_by_folder(&mut tx, folder_id).await?;
        if !FolderRepository::delete(&mut tx, folder_id).await? {
            return Err(CabinetError::NotFound("folder".to_string()));
        }
        tx.commit().await?;

        for stored_name in &stored_names {
            self.remove_blob(stored_name).await;
        }

        info!(folder_id, files = stored_names.len(), "Folder deleted");
        Ok(stored_names.len())
    }

    /// Delete one file of a folder.
    ///
    /// A file that does not belong to `folder_id` is reported as not found
    /// and left untouched. A missing blob is tolerated.
    pub async fn delete_file(&self, folder_id: i64, file_id: i64) -> Result<FileRecord> {
        FolderRepository::new(self.db.pool())
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("folder".to_string()))?;

        let file = FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .filter(|f| f.folder_id == folder_id)
            .ok_or_else(|| CabinetError::NotFound("file".to_string()))?;

        let mut conn = self.db.pool().acquire().await?;
        let deleted = FileRepository::delete_in_folder(&mut conn, folder_id, file_id).await?;
        drop(conn);
        if !deleted {
            return Err(CabinetError::NotFound("file".to_string()));
        }

        self.remove_blob(&file.stored_name).await;
        info!(folder_id, file_id, name = %file.name, "File deleted");
        Ok(file)
    }

    /// Open a file's stored bytes for download.
    pub async fn fetch_file_for_download(&self, file_id: i64) -> Result<FileDownload> {
        let file = self.get_file(file_id).await?;
        let (content, size) = self.storage.open(&file.stored_name).await?;
        Ok(FileDownload {
            file,
            content,
            size,
        })
    }

    /// Look up a file and its folder, and check `operation` against the folder.
    ///
    /// A missing file or folder is `NotFound`; a policy denial is
    /// `Permission`.
    pub async fn authorize_file(
        &self,
        user: &User,
        file_id: i64,
        operation: Operation,
    ) -> Result<(FileRecord, FolderDetails)> {
        let file = self.get_file(file_id).await?;
        let folder = self.get_folder(file.folder_id).await?;
        require(user, operation, Some(&folder))?;
        Ok((file, folder))
    }

    /// Zip every file of a folder, within the configured time budget.
    pub async fn build_folder_archive(&self, folder: &FolderDetails) -> Result<Archive> {
        with_timeout(
            self.timeout,
            "archive",
            archive::build_archive(self.storage, &folder.folder.name, &folder.files),
        )
        .await
    }

    /// Get a folder with its references resolved.
    pub async fn get_folder(&self, folder_id: i64) -> Result<FolderDetails> {
        let folder = FolderRepository::new(self.db.pool())
            .get_by_id(folder_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("folder".to_string()))?;
        self.resolve(folder).await
    }

    /// Get a file's metadata.
    pub async fn get_file(&self, file_id: i64) -> Result<FileRecord> {
        FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| CabinetError::NotFound("file".to_string()))
    }

    async fn resolve(&self, folder: Folder) -> Result<FolderDetails> {
        let pool = self.db.pool();
        let creator = UserRepository::new(pool)
            .get_by_id(folder.created_by)
            .await?
            .map(|u| UserSummary::from(&u))
            .ok_or_else(|| CabinetError::NotFound("folder creator".to_string()))?;
        let shared_with = FolderRepository::new(pool).list_shares(folder.id).await?;
        let files = FileRepository::new(pool).list_by_folder(folder.id).await?;

        Ok(FolderDetails {
            folder,
            creator,
            shared_with,
            files,
        })
    }

    async fn remove_blob(&self, stored_name: &str) {
        match self.storage.delete(stored_name).await {
            Ok(true) => debug!(stored_name, "Blob removed"),
            Ok(false) => debug!(stored_name, "Blob already missing"),
            Err(e) => warn!(stored_name, error = %e, "Failed to remove blob"),
        }
    }
}

/// Run `future` within `timeout`, mapping expiry to [`CabinetError::Timeout`].
pub async fn with_timeout<T>(
    timeout: Duration,
    label: &str,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation = label, ?timeout, "Operation timed out");
            Err(CabinetError::Timeout(label.to_string()))
        }
    }
}

/// Trim and check a folder name.
pub fn validate_folder_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CabinetError::Validation(
            "folder name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_FOLDER_NAME_LENGTH {
        return Err(CabinetError::Validation(format!(
            "folder name must be at most {MAX_FOLDER_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}

async fn ensure_users_exist(conn: &mut sqlx::SqliteConnection, user_ids: &[i64]) -> Result<()> {
    for &user_id in user_ids {
        if !UserRepository::exists(conn, user_id).await? {
            return Err(CabinetError::NotFound(format!("user {user_id}")));
        }
    }
    Ok(())
}
