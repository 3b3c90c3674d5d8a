// ABOUTME: Certification fast-path endpoints: self-declared courses and internships

use axum::{
    extract::{Multipart, State},
    response::Json,
};

use crate::blob_store::MAX_RESOURCE_BYTES;
use crate::error::Result;
use crate::handlers::UploadForm;
use crate::handlers::extract::{ApiPath, ApiQuery};
use crate::services::activities::CertificationSubmission;
use crate::types::*;
use crate::AppState;

pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<CertificationEnvelope>>> {
    let mut form = UploadForm::read(multipart, &state.blobs, MAX_RESOURCE_BYTES).await?;
    let email = form.required("userEmail")?;
    let submission = CertificationSubmission {
        kind: form.required("type")?,
        title: form.required("title")?,
        description: form.text("description"),
        start_date: form.date("startDate")?,
        end_date: form.date("endDate")?,
    };
    let file = form.require_file("file")?;

    let certification = state
        .activities
        .submit_certification(&email, submission, file)
        .await?;
    Ok(ApiResponse::ok("Certification saved", CertificationEnvelope { certification }))
}

pub async fn my_certifications(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<CertificationList>>> {
    let certifications = state.activities.mine_certifications(&query.user_email).await?;
    Ok(ApiResponse::ok("Fetched certifications", CertificationList { certifications }))
}

pub async fn delete_certification(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .activities
        .delete_my_certification(id, &query.user_email)
        .await?;
    Ok(ApiResponse::message("Deleted certification"))
}
