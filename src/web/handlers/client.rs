//! Client handlers: shared folder listing and downloads.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response},
    response::Redirect,
    Json,
};
use tokio_util::io::ReaderStream;

use crate::auth::{require, Operation};
use crate::file::FileStorage;
use crate::web::dto::{ApiResponse, FolderResponse};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// Build a Content-Disposition header value for a download.
///
/// Non-ASCII names get an RFC 5987 `filename*` parameter next to an ASCII
/// fallback.
fn content_disposition_header(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if fallback == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

fn build_response(
    content_type: &str,
    filename: &str,
    length: u64,
    body: Body,
) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(filename),
        )
        .header(header::CONTENT_LENGTH, length)
        .body(body)
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}

/// GET /api/client/folders - List the folders visible to the caller.
pub async fn list_shared_folders(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let user = state.current_user(&claims).await?;

    let folders = state.folder_service().list_folders_visible_to(&user).await?;
    let data = folders.iter().map(FolderResponse::from).collect();

    Ok(Json(ApiResponse::new(data)))
}

/// GET /api/client/files/:id - Download one file.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let user = state.current_user(&claims).await?;
    let service = state.folder_service();

    service
        .authorize_file(&user, file_id, Operation::Download)
        .await?;
    let download = service.fetch_file_for_download(file_id).await?;

    tracing::info!(user_id = user.id, file_id, "File downloaded");

    let content_type = mime_guess::from_path(&download.file.name)
        .first_or_octet_stream()
        .to_string();
    let body = Body::from_stream(ReaderStream::new(download.content));

    build_response(&content_type, &download.file.name, download.size, body)
}

/// GET /api/client/files/preview/:id - Redirect to the stored file.
///
/// Requires only consult access to the file's folder.
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Redirect, ApiError> {
    let user = state.current_user(&claims).await?;

    let (file, _) = state
        .folder_service()
        .authorize_file(&user, file_id, Operation::ListFolder)
        .await?;

    let location = format!("/uploads/{}", FileStorage::relative_url_path(&file.stored_name));
    Ok(Redirect::to(&location))
}

/// GET /api/client/files/folder/:id - Download a folder as a zip archive.
pub async fn download_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(folder_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let user = state.current_user(&claims).await?;
    let service = state.folder_service();

    let folder = service.get_folder(folder_id).await?;
    require(&user, Operation::Download, Some(&folder))?;

    let archive = service.build_folder_archive(&folder).await?;

    tracing::info!(
        user_id = user.id,
        folder_id,
        files = folder.files.len(),
        "Folder archive downloaded"
    );

    let length = archive.bytes.len() as u64;
    build_response(
        "application/zip",
        &archive.file_name,
        length,
        Body::from(archive.bytes),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition_header("été.txt");
        assert!(value.starts_with("attachment; filename=\"_t_.txt\""));
        assert!(value.contains("filename*=UTF-8''%C3%A9t%C3%A9.txt"));
        assert!(value.is_ascii());
    }

    #[test]
    fn test_content_disposition_quotes() {
        let value = content_disposition_header("a\"b.txt");
        assert!(value.starts_with("attachment; filename=\"a_b.txt\""));
        assert!(value.contains("filename*="));
    }
}
