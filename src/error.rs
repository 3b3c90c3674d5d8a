// ABOUTME: Centralized error taxonomy for the portal services with envelope rendering
// ABOUTME: Maps each failure to an HTTP status without exposing internal details to clients

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug)]
pub enum AppError {
    Database(sea_orm::DbErr),
    NotFound(String),
    Unauthenticated(String),
    Forbidden(String),
    Conflict(String),
    Validation(FieldErrors),
    EmptyFile,
    UnsupportedMedia(String),
    TooLarge { limit: u64 },
    /// A blob outlived its record. Logged by the caller, never returned to clients.
    BlobLeak { key: String, reason: String },
    ExtractionFailed(String),
    BinaryFile,
    UpstreamClientError { status: u16, body: String },
    UpstreamServerError { status: u16, body: String },
    UpstreamProtocolError(String),
    NotConfigured,
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), message.into());
        AppError::Validation(fields)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) | AppError::BlobLeak { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::EmptyFile => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ExtractionFailed(_) | AppError::BinaryFile => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::UpstreamClientError { .. }
            | AppError::UpstreamServerError { .. }
            | AppError::UpstreamProtocolError(_) => StatusCode::BAD_GATEWAY,
            AppError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Unauthenticated(msg) => write!(f, "{}", msg),
            AppError::Forbidden(msg) => write!(f, "{}", msg),
            AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::Validation(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(field, msg)| format!("{}: {}", field, msg))
                    .collect();
                write!(f, "Validation failed: {}", parts.join(", "))
            }
            AppError::EmptyFile => write!(f, "File is empty"),
            AppError::UnsupportedMedia(msg) => write!(f, "Unsupported media type: {}", msg),
            AppError::TooLarge { limit } => {
                write!(f, "File exceeds the maximum size of {} bytes", limit)
            }
            AppError::BlobLeak { key, reason } => {
                write!(f, "Blob {} left behind after record deletion: {}", key, reason)
            }
            AppError::ExtractionFailed(reason) => write!(f, "Text extraction failed: {}", reason),
            AppError::BinaryFile => {
                write!(f, "File appears to be binary and cannot be read as text")
            }
            AppError::UpstreamClientError { status, body } => {
                write!(f, "Client error from summarization API: {} - {}", status, body)
            }
            AppError::UpstreamServerError { status, body } => {
                write!(f, "Server error from summarization API: {} - {}", status, body)
            }
            AppError::UpstreamProtocolError(msg) => {
                write!(f, "Invalid response from summarization API: {}", msg)
            }
            AppError::NotConfigured => write!(f, "Summarization API key is not configured"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, data) = match &self {
            AppError::Database(_) | AppError::Internal(_) | AppError::BlobLeak { .. } => {
                tracing::error!("{}", self);
                ("Internal server error".to_string(), serde_json::Value::Null)
            }
            AppError::Validation(fields) => {
                tracing::warn!("{}", self);
                ("Validation failed".to_string(), json!(fields))
            }
            AppError::Unauthenticated(_) | AppError::Forbidden(_) => {
                tracing::warn!("Access denied: {}", self);
                (self.to_string(), serde_json::Value::Null)
            }
            AppError::NotFound(_) => {
                tracing::info!("Not found: {}", self);
                (self.to_string(), serde_json::Value::Null)
            }
            AppError::UpstreamClientError { .. }
            | AppError::UpstreamServerError { .. }
            | AppError::UpstreamProtocolError(_) => {
                tracing::error!("{}", self);
                (self.to_string(), serde_json::Value::Null)
            }
            _ => {
                tracing::warn!("Request failed: {}", self);
                (self.to_string(), serde_json::Value::Null)
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "data": data,
        }));

        (status, body).into_response()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::UpstreamProtocolError(err.to_string());
        }
        let status = err
            .status()
            .map(|s| s.as_u16())
            .unwrap_or(if err.is_timeout() { 504 } else { 502 });
        AppError::UpstreamServerError {
            status,
            body: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::UpstreamProtocolError(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::TooLarge {
                limit: crate::blob_store::MAX_RESOURCE_BYTES,
            };
        }
        AppError::validation("file", format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// The field serde complained about, or `fallback` when the message names none.
fn rejected_field(detail: &str, fallback: &str) -> String {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    let re = FIELD.get_or_init(|| {
        Regex::new(r"(?:missing|unknown) field `([^`]+)`").expect("valid field regex")
    });
    re.captures(detail)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        AppError::validation(&rejected_field(&detail, "body"), detail)
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        let detail = rejection.body_text();
        AppError::validation(&rejected_field(&detail, "query"), detail)
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("id", rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
