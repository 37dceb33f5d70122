//! Admin handlers: folders, uploads and users.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tokio::time::Instant;

use crate::auth::Operation;
use crate::db::UserRepository;
use crate::error::CabinetError;
use crate::file::{FolderUpdate, NewFolder, UploadItem};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, DeleteFolderResponse, FileResponse, FolderResponse,
    MessageResponse, UpdateFolderRequest, UserResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// POST /api/admin/folders - Create a folder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let admin = state.authorize(&claims, Operation::CreateFolder).await?;

    let folder = state
        .folder_service()
        .create_folder(&admin, &NewFolder::from(req))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FolderResponse::from(&folder))),
    ))
}

/// GET /api/admin/folders - List every folder.
pub async fn list_all_folders(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<FolderResponse>>>, ApiError> {
    let admin = state.authorize(&claims, Operation::ListAll).await?;

    let folders = state.folder_service().list_folders_visible_to(&admin).await?;
    let data = folders.iter().map(FolderResponse::from).collect();

    Ok(Json(ApiResponse::new(data)))
}

/// PATCH /api/admin/folders/:id - Update permission and/or share list.
pub async fn update_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(folder_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateFolderRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    state
        .authorize(&claims, Operation::UpdatePermissions)
        .await?;

    let folder = state
        .folder_service()
        .update_permissions(folder_id, &FolderUpdate::from(req))
        .await?;

    Ok(Json(ApiResponse::new(FolderResponse::from(&folder))))
}

/// DELETE /api/admin/folders/:id - Delete a folder and its files.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteFolderResponse>>, ApiError> {
    state.authorize(&claims, Operation::DeleteFolder).await?;

    let files_deleted = state.folder_service().delete_folder(folder_id).await?;

    Ok(Json(ApiResponse::new(DeleteFolderResponse {
        message: "Folder deleted".to_string(),
        files_deleted,
    })))
}

/// POST /api/admin/files/:folder_id - Upload one or more files.
///
/// Request body: multipart/form-data with one or more `file` or `files` fields.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(folder_id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<FileResponse>>>), ApiError> {
    state.authorize(&claims, Operation::Upload).await?;

    // Reading the body and persisting it share one budget
    let deadline = Instant::now() + state.request_timeout;
    let items = tokio::time::timeout_at(
        deadline,
        collect_uploads(multipart, state.max_files_per_upload),
    )
    .await
    .map_err(|_| CabinetError::Timeout("upload".to_string()))??;

    let files = state
        .folder_service()
        .with_timeout(deadline.saturating_duration_since(Instant::now()))
        .upload_files(folder_id, items)
        .await?;
    let data = files.iter().map(FileResponse::from).collect();

    Ok((StatusCode::CREATED, Json(ApiResponse::new(data))))
}

async fn collect_uploads(
    mut multipart: Multipart,
    max_files: usize,
) -> Result<Vec<UploadItem>, ApiError> {
    let mut items = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" && name != "files" {
            continue;
        }

        if items.len() == max_files {
            return Err(ApiError::bad_request(format!(
                "Too many files (max {max_files} per upload)"
            )));
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::bad_request("File field without a filename"))?;
        let content = field.bytes().await.map_err(multipart_error)?;
        items.push(UploadItem::new(filename, content));
    }

    if items.is_empty() {
        return Err(ApiError::bad_request("No file provided"));
    }

    Ok(items)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Upload exceeds the request size limit");
    }
    tracing::debug!("Failed to read multipart data: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// DELETE /api/admin/files/:folder_id/:file_id - Delete one file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path((folder_id, file_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.authorize(&claims, Operation::DeleteFile).await?;

    let file = state
        .folder_service()
        .delete_file(folder_id, file_id)
        .await?;

    Ok(Json(ApiResponse::new(MessageResponse::new(format!(
        "File {} deleted",
        file.name
    )))))
}

/// GET /api/admin/ and /api/admin/users - List every user.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    state.authorize(&claims, Operation::ManageUsers).await?;

    let users = UserRepository::new(state.db.pool()).list_all().await?;
    let data = users.iter().map(UserResponse::from).collect();

    Ok(Json(ApiResponse::new(data)))
}

/// DELETE /api/admin/users/:id - Delete a user.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let admin = state.authorize(&claims, Operation::ManageUsers).await?;

    let repo = UserRepository::new(state.db.pool());
    let user = crate::auth::delete_user(&repo, &admin, user_id).await?;

    Ok(Json(ApiResponse::new(MessageResponse::new(format!(
        "User {} deleted",
        user.email
    )))))
}
