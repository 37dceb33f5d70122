//! Blob storage for Cabinet.
//!
//! This module stores uploaded bytes on local disk:
//! - UUID-based file naming
//! - Directory sharding by first 2 characters of UUID
//! - Save, open, and delete operations

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{CabinetError, Result};

/// Blob storage rooted at the content root.
///
/// Files are stored in a sharded directory structure:
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
/// ├── cd/
/// │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under a new UUID-based name.
    ///
    /// The extension of `original_name` is kept. Returns the stored name.
    pub async fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let stored_name = Self::generate_stored_name(original_name);
        self.save_with_name(content, &stored_name).await?;
        Ok(stored_name)
    }

    /// Save content with a specific stored name.
    pub async fn save_with_name(&self, content: &[u8], stored_name: &str) -> Result<()> {
        let file_path = self.get_file_path(stored_name);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                CabinetError::Storage(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let mut file = fs::File::create(&file_path)
            .await
            .map_err(|e| CabinetError::Storage(format!("cannot create {stored_name}: {e}")))?;
        file.write_all(content)
            .await
            .map_err(|e| CabinetError::Storage(format!("cannot write {stored_name}: {e}")))?;
        file.flush()
            .await
            .map_err(|e| CabinetError::Storage(format!("cannot write {stored_name}: {e}")))?;

        Ok(())
    }

    /// Open a stored file for streaming.
    ///
    /// Returns the open file and its length in bytes.
    pub async fn open(&self, stored_name: &str) -> Result<(fs::File, u64)> {
        let file = match fs::File::open(self.get_file_path(stored_name)).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CabinetError::NotFound("file content".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Delete a stored file.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub async fn delete(&self, stored_name: &str) -> Result<bool> {
        match fs::remove_file(self.get_file_path(stored_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a stored file exists.
    pub async fn exists(&self, stored_name: &str) -> bool {
        fs::try_exists(self.get_file_path(stored_name))
            .await
            .unwrap_or(false)
    }

    /// Get the full file path for a stored name.
    ///
    /// The path is constructed as: {base_path}/{shard}/{stored_name}
    pub fn get_file_path(&self, stored_name: &str) -> PathBuf {
        self.base_path
            .join(Self::get_shard(stored_name))
            .join(stored_name)
    }

    /// Path of a stored file relative to the content root, with `/` separators.
    ///
    /// This is the path under which the static `/uploads` route serves it.
    pub fn relative_url_path(stored_name: &str) -> String {
        format!("{}/{}", Self::get_shard(stored_name), stored_name)
    }

    /// Get the shard directory name for a stored name (first 2 characters).
    fn get_shard(stored_name: &str) -> &str {
        stored_name.get(..2).unwrap_or(stored_name)
    }

    /// Extract a safe file extension from a filename.
    ///
    /// Returns "bin" if there is no purely alphanumeric extension.
    fn extract_extension(filename: &str) -> String {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 16)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// Generate a new UUID-based stored name for the given original filename.
    pub fn generate_stored_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name);
        format!("{uuid}.{ext}")
    }
}
