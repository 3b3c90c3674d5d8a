// ABOUTME: Type definitions for API requests, responses and the shared JSON envelope
// ABOUTME: Field names are camelCase on the wire

use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{activity, resource, user};

/// `{ success, message, data }` wrapper used by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(ApiResponse {
            success: true,
            message: message.into(),
            data: None,
        })
    }
}

// User related types
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: user::Role,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&user::Model> for UserView {
    fn from(model: &user::Model) -> Self {
        UserView {
            id: model.id,
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            email: model.email.clone(),
            role: model.role,
            profile_picture: model.profile_picture.clone(),
            created_at: model.created_at,
            last_login: model.last_login,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserView,
    pub session_token: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserView,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub user_email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureResponse {
    pub profile_picture: String,
}

// Query strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEmailQuery {
    pub user_email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerQuery {
    pub user_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceListQuery {
    pub branch: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveQuery {
    pub faculty_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectQuery {
    pub faculty_email: String,
    #[serde(default)]
    pub reason: String,
}

// Resource types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedResource {
    pub resource_id: i64,
    pub file_name: String,
    pub title: String,
    pub file_size: i64,
}

impl From<&resource::Model> for UploadedResource {
    fn from(model: &resource::Model) -> Self {
        UploadedResource {
            resource_id: model.id,
            file_name: model.file_name.clone(),
            title: model.title.clone(),
            file_size: model.file_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceList {
    pub resources: Vec<resource::Model>,
    pub count: usize,
}

impl From<Vec<resource::Model>> for ResourceList {
    fn from(resources: Vec<resource::Model>) -> Self {
        ResourceList {
            count: resources.len(),
            resources,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceEnvelope {
    pub resource: resource::Model,
}

// Activity types
#[derive(Debug, Serialize)]
pub struct ActivityEnvelope {
    pub activity: activity::Model,
}

#[derive(Debug, Serialize)]
pub struct ActivityList {
    pub activities: Vec<activity::Model>,
}

#[derive(Debug, Serialize)]
pub struct CertificationEnvelope {
    pub certification: activity::Model,
}

#[derive(Debug, Serialize)]
pub struct CertificationList {
    pub certifications: Vec<activity::Model>,
}

// Summary types
#[derive(Debug, Deserialize)]
pub struct GenerateSummaryRequest {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type")]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSummary {
    pub summary: String,
    #[serde(rename = "type")]
    pub mode: &'static str,
    pub original_length: usize,
    pub summary_length: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummaryResponse {
    pub resource_id: i64,
    pub resource_title: String,
    pub summary: String,
    pub summary_length: usize,
    pub ai_generated: bool,
    pub cohere_configured: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatus {
    pub resource_id: i64,
    pub resource_title: String,
    pub file_name: String,
    pub file_type: String,
    pub cohere_configured: bool,
    pub can_generate_summary: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryHealth {
    pub status: &'static str,
    pub cohere_configured: bool,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub resource_id: i64,
    pub extracted_content: String,
    pub content_length: usize,
}
