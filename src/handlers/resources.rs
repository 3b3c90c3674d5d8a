// ABOUTME: Resource endpoints: multipart upload, filtered listing, streaming, edit and delete
// ABOUTME: Download and view record student access when a userEmail is supplied

use axum::{
    extract::{Multipart, State},
    response::{Json, Response},
};

use crate::blob_store::MAX_RESOURCE_BYTES;
use crate::error::Result;
use crate::handlers::extract::{ApiPath, ApiQuery};
use crate::handlers::{file_response, UploadForm};
use crate::services::resources::{Disposition, NewResource, ResourceChanges, ResourceHealth};
use crate::types::*;
use crate::AppState;

pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedResource>>> {
    let mut form = UploadForm::read(multipart, &state.blobs, MAX_RESOURCE_BYTES).await?;
    let email = form.required("userEmail")?;
    let file = form.require_file("file")?;
    let details = NewResource {
        title: form.required("title")?,
        description: form.text("description").unwrap_or_default(),
        branch: form.required("branch")?,
        subject: form.text("subject"),
    };

    let created = state.resources.upload(&email, details, file).await?;
    Ok(ApiResponse::ok(
        "File uploaded successfully",
        UploadedResource::from(&created),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ResourceListQuery>,
) -> Result<Json<ApiResponse<ResourceList>>> {
    let resources = state.resources.list(query.branch, query.subject).await?;
    Ok(ApiResponse::ok(
        "Resources retrieved successfully",
        ResourceList::from(resources),
    ))
}

pub async fn my_resources(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<ResourceList>>> {
    let resources = state.resources.list_by_uploader(&query.user_email).await?;
    Ok(ApiResponse::ok(
        "Resources retrieved successfully",
        ResourceList::from(resources),
    ))
}

pub async fn recent(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<ResourceList>>> {
    let resources = state.resources.recently_accessed(&query.user_email).await?;
    Ok(ApiResponse::ok(
        "Recently accessed resources retrieved successfully",
        ResourceList::from(resources),
    ))
}

pub async fn get_resource(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<ResourceEnvelope>>> {
    let resource = state.resources.find(id).await?;
    Ok(ApiResponse::ok("Resource retrieved successfully", ResourceEnvelope { resource }))
}

async fn stream(state: AppState, id: i64, disposition: Disposition, viewer: ViewerQuery) -> Result<Response> {
    let file = state
        .resources
        .stream(id, disposition, viewer.user_email.as_deref())
        .await?;
    file_response(file.handle, file.content_type, &file.content_disposition)
}

pub async fn download(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(viewer): ApiQuery<ViewerQuery>,
) -> Result<Response> {
    stream(state, id, Disposition::Attachment, viewer).await
}

pub async fn view(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(viewer): ApiQuery<ViewerQuery>,
) -> Result<Response> {
    stream(state, id, Disposition::Inline, viewer).await
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ResourceEnvelope>>> {
    let mut form = UploadForm::read(multipart, &state.blobs, MAX_RESOURCE_BYTES).await?;
    let email = form.required("userEmail")?;
    let file = form.take_file("file");
    let changes = ResourceChanges {
        title: form.text("title"),
        description: form.raw("description"),
        branch: form.text("branch"),
        subject: form.raw("subject"),
    };

    let resource = state.resources.update(id, &email, changes, file).await?;
    Ok(ApiResponse::ok("Resource updated successfully", ResourceEnvelope { resource }))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<()>>> {
    state.resources.delete(id, &query.user_email).await?;
    Ok(ApiResponse::message("Resource deleted successfully"))
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<ResourceHealth>> {
    let report = state.resources.health().await;
    ApiResponse::ok("Resource service is healthy", report)
}
