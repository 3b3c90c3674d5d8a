// ABOUTME: HTTP handlers grouped by area, plus shared multipart and file-streaming helpers
// ABOUTME: Handlers only parse input, call a service and wrap the result in the envelope

pub mod activities;
pub mod certificates;
pub mod certifications;
pub mod extract;
pub mod portfolio;
pub mod resources;
pub mod summary;
pub mod users;

use axum::{
    body::Body,
    extract::Multipart,
    http::{header, StatusCode},
    response::Response,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio_util::io::ReaderStream;

use crate::blob_store::{BlobHandle, BlobStore, StagedBlob};
use crate::error::{AppError, Result};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A parsed multipart body. File parts are staged to disk as they arrive.
#[derive(Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedBlob>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart, blobs: &BlobStore, limit: u64) -> Result<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                // Browsers send an empty, unnamed part when no file was chosen.
                Some(file_name) if file_name.trim().is_empty() => {
                    field.bytes().await?;
                }
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or(DEFAULT_CONTENT_TYPE)
                        .to_string();
                    let staged = blobs
                        .stage(&file_name, &content_type, Box::pin(field), limit)
                        .await?;
                    form.files.insert(name, staged);
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// A text field, trimmed, with blank values treated as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// A raw text field, present even when blank.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn required(&self, name: &str) -> Result<String> {
        self.text(name)
            .ok_or_else(|| AppError::validation(name, format!("{} is required", name)))
    }

    pub fn date(&self, name: &str) -> Result<Option<NaiveDate>> {
        self.text(name)
            .map(|v| {
                NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                    .map_err(|_| AppError::validation(name, "Dates must be formatted as YYYY-MM-DD"))
            })
            .transpose()
    }

    pub fn int(&self, name: &str) -> Result<Option<i32>> {
        self.text(name)
            .map(|v| {
                v.parse::<i32>()
                    .map_err(|_| AppError::validation(name, "Must be a whole number"))
            })
            .transpose()
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedBlob> {
        self.files.remove(name)
    }

    pub fn require_file(&mut self, name: &str) -> Result<StagedBlob> {
        self.take_file(name)
            .ok_or_else(|| AppError::validation(name, "Please select a file to upload"))
    }
}

/// Streams an opened blob with the given type and disposition.
pub fn file_response(handle: BlobHandle, content_type: &str, disposition: &str) -> Result<Response> {
    let body = Body::from_stream(ReaderStream::new(handle.file));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, handle.len)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build file response: {}", e)))
}
