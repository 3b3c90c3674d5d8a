// ABOUTME: Activity endpoints: student submission and listing, faculty review queue and decisions

use axum::{
    extract::{Multipart, State},
    response::Json,
};

use crate::blob_store::MAX_RESOURCE_BYTES;
use crate::error::Result;
use crate::handlers::UploadForm;
use crate::handlers::extract::{ApiPath, ApiQuery};
use crate::services::activities::ActivitySubmission;
use crate::types::*;
use crate::AppState;

pub async fn submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ActivityEnvelope>>> {
    let mut form = UploadForm::read(multipart, &state.blobs, MAX_RESOURCE_BYTES).await?;
    let email = form.required("userEmail")?;
    let submission = ActivitySubmission {
        category: form.required("category")?,
        title: form.required("title")?,
        description: form.text("description"),
        start_date: form.date("startDate")?,
        end_date: form.date("endDate")?,
        credits: form.int("credits")?,
    };
    let certificate = form.take_file("certificate");

    let activity = state.activities.submit(&email, submission, certificate).await?;
    Ok(ApiResponse::ok("Activity submitted for approval", ActivityEnvelope { activity }))
}

pub async fn my_activities(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<ActivityList>>> {
    let activities = state.activities.mine(&query.user_email).await?;
    Ok(ApiResponse::ok("Fetched activities", ActivityList { activities }))
}

pub async fn pending(State(state): State<AppState>) -> Result<Json<ApiResponse<ActivityList>>> {
    let activities = state.activities.pending().await?;
    Ok(ApiResponse::ok("Fetched pending activities", ActivityList { activities }))
}

pub async fn approve(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ApproveQuery>,
) -> Result<Json<ApiResponse<ActivityEnvelope>>> {
    let activity = state.activities.approve(id, &query.faculty_email).await?;
    Ok(ApiResponse::ok("Activity approved", ActivityEnvelope { activity }))
}

pub async fn reject(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RejectQuery>,
) -> Result<Json<ApiResponse<ActivityEnvelope>>> {
    let activity = state
        .activities
        .reject(id, &query.faculty_email, &query.reason)
        .await?;
    Ok(ApiResponse::ok("Activity rejected", ActivityEnvelope { activity }))
}
