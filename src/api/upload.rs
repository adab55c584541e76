//! Archive upload endpoint

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use bytes::Bytes;
use tracing::info;

use super::error::{ApiError, ApiResult};
use crate::AppState;
use crate::model::UploadResponse;

/// Name of the multipart field carrying the archive
pub const FILE_FIELD: &str = "file";

/// POST /api/upload
///
/// Forwards the `file` field of a multipart form to the vault as a new
/// archive, using the file name as the archive description. Only the first
/// `file` field is used; other fields are ignored.
pub async fn upload_archive(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::InvalidForm(e.body_text()))?;
    let (name, data) = read_file_field(&mut multipart)
        .await?
        .ok_or(ApiError::MissingFile)?;

    info!("Uploading archive '{}' ({} bytes)", name, data.len());
    let receipt = state.service.upload_archive(&name, data).await?;
    info!(
        "Uploaded archive '{}' as {}",
        name,
        receipt.archive_id.as_deref().unwrap_or("-")
    );

    Ok(Json(UploadResponse {
        success: true,
        archive_id: receipt.archive_id,
        location: receipt.location,
        error: None,
    }))
}

/// Find the `file` field, returning its file name and contents
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<Option<(String, Bytes)>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        return Ok(Some((name, data)));
    }

    Ok(None)
}
