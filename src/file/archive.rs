//! Zip packaging of a folder's files.

use std::collections::HashSet;
use std::io::{self, Cursor};
use std::path::PathBuf;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::metadata::FileRecord;
use super::storage::FileStorage;
use crate::{CabinetError, Result};

/// An in-memory zip archive ready to be sent.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Suggested download filename.
    pub file_name: String,
    /// Zip bytes.
    pub bytes: Vec<u8>,
}

/// Download filename of a folder archive.
pub fn archive_name(folder_name: &str) -> String {
    format!("{folder_name}_files.zip")
}

/// Build a zip archive of `files`, in the given order.
///
/// Every blob is checked before any byte is written, so a missing blob
/// yields `NotFound` and no archive. Compression runs on a blocking thread.
pub async fn build_archive(
    storage: &FileStorage,
    folder_name: &str,
    files: &[FileRecord],
) -> Result<Archive> {
    for file in files {
        if !storage.exists(&file.stored_name).await {
            return Err(CabinetError::NotFound(format!(
                "file content for {}",
                file.name
            )));
        }
    }

    let names = entry_names(files.iter().map(|f| f.name.as_str()));
    let entries: Vec<(String, PathBuf)> = names
        .into_iter()
        .zip(files.iter().map(|f| storage.get_file_path(&f.stored_name)))
        .collect();

    let bytes = tokio::task::spawn_blocking(move || write_zip(&entries))
        .await
        .map_err(|e| CabinetError::Archive(format!("archive task failed: {e}")))??;

    debug!(
        folder = folder_name,
        entries = files.len(),
        size = bytes.len(),
        "Built folder archive"
    );

    Ok(Archive {
        file_name: archive_name(folder_name),
        bytes,
    })
}

fn write_zip(entries: &[(String, PathBuf)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for (name, path) in entries {
        let mut source = std::fs::File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CabinetError::NotFound(format!("file content for {name}")),
            _ => CabinetError::Io(e),
        })?;
        zip.start_file(name.as_str(), options)?;
        io::copy(&mut source, &mut zip)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Make display names usable and unique as zip entry names.
///
/// Path separators become `_`. Repeated names get ` (1)`, ` (2)`, …
/// inserted before the extension, in input order.
pub fn entry_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    let mut result = Vec::new();

    for raw in names {
        let base = sanitize_entry_name(raw);
        let mut candidate = base.clone();
        let mut n = 1;
        while used.contains(&candidate) {
            candidate = numbered_name(&base, n);
            n += 1;
        }
        used.insert(candidate.clone());
        result.push(candidate);
    }

    result
}

fn sanitize_entry_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.trim().is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

fn numbered_name(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => format!("{} ({n}){}", &name[..idx], &name[idx..]),
        _ => format!("{name} ({n})"),
    }
}
