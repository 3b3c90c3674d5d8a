// ABOUTME: Personal certificate endpoints: upload, listing, inline view, download and delete
// ABOUTME: Every operation is scoped to the certificate's owner

use axum::{
    extract::{Multipart, State},
    response::{Json, Response},
};

use crate::blob_store::{self, MAX_RESOURCE_BYTES};
use crate::entities::certificate;
use crate::error::Result;
use crate::handlers::extract::{ApiPath, ApiQuery};
use crate::handlers::{file_response, UploadForm};
use crate::services::certificates::NewCertificate;
use crate::types::*;
use crate::AppState;

pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<certificate::Model>>> {
    let mut form = UploadForm::read(multipart, &state.blobs, MAX_RESOURCE_BYTES).await?;
    let email = form.required("userEmail")?;
    let details = NewCertificate {
        title: form.required("title")?,
        description: form.text("description"),
        kind: form.text("type"),
    };
    let file = form.require_file("file")?;

    let created = state.certificates.upload(&email, details, file).await?;
    Ok(ApiResponse::ok("Certificate uploaded successfully", created))
}

pub async fn my_certificates(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<Vec<certificate::Model>>>> {
    let certificates = state.certificates.mine(&query.user_email).await?;
    Ok(ApiResponse::ok("Certificates retrieved successfully", certificates))
}

pub async fn delete_certificate(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<()>>> {
    state.certificates.delete(id, &query.user_email).await?;
    Ok(ApiResponse::message("Certificate deleted successfully"))
}

pub async fn view(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Response> {
    let (found, handle) = state.certificates.open(id, &query.user_email).await?;
    let disposition = format!("inline; filename=\"{}\"", found.file_path);
    file_response(handle, &found.content_type, &disposition)
}

pub async fn download(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Response> {
    let (found, handle) = state.certificates.open(id, &query.user_email).await?;
    let disposition = format!(
        "attachment; filename=\"{}{}\"",
        blob_store::sanitize_filename(found.title.trim()),
        blob_store::extension_of(&found.file_path)
    );
    file_response(handle, &found.content_type, &disposition)
}
