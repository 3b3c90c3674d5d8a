// ABOUTME: Profile endpoints: read, edit names, upload and remove the profile picture

use axum::{
    extract::{Multipart, State},
    response::Json,
};

use crate::blob_store::MAX_PROFILE_PICTURE_BYTES;
use crate::error::Result;
use crate::handlers::UploadForm;
use crate::handlers::extract::{ApiJson, ApiQuery};
use crate::types::*;
use crate::AppState;

pub async fn profile(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<UserView>>> {
    let user = state.users.profile(&query.user_email).await?;
    Ok(ApiResponse::ok("Profile retrieved successfully", UserView::from(&user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ProfileUpdateRequest>,
) -> Result<Json<ApiResponse<UserView>>> {
    let user = state
        .users
        .update_profile(&req.user_email, req.first_name, req.last_name)
        .await?;
    Ok(ApiResponse::ok("Profile updated successfully", UserView::from(&user)))
}

pub async fn upload_picture(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ProfilePictureResponse>>> {
    let mut form = UploadForm::read(multipart, &state.blobs, MAX_PROFILE_PICTURE_BYTES).await?;
    let email = form.required("userEmail")?;
    let file = form.require_file("file")?;
    let bytes = tokio::fs::read(file.path()).await?;

    let profile_picture = state
        .users
        .set_profile_picture(&email, file.content_type(), &bytes)
        .await?;
    Ok(ApiResponse::ok(
        "Profile picture uploaded successfully",
        ProfilePictureResponse { profile_picture },
    ))
}

pub async fn remove_picture(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<()>>> {
    state.users.clear_profile_picture(&query.user_email).await?;
    Ok(ApiResponse::message("Profile picture removed successfully"))
}
