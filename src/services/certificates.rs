// ABOUTME: Personal certificate store: owner-only upload, listing, retrieval and deletion
// ABOUTME: Only images, PDFs and Word documents are accepted as certificate files

use chrono::Utc;
use sea_orm::Set;
use std::sync::Arc;

use crate::blob_store::{BlobHandle, BlobKind, BlobStore, StagedBlob};
use crate::entities::certificate;
use crate::error::{AppError, Result};
use crate::services::{non_blank, UserDirectory};
use crate::storage::Storage;

const WORD_DOC: &str = "application/msword";
const WORD_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub fn is_allowed_certificate_type(content_type: &str) -> bool {
    let content_type = content_type.trim().to_ascii_lowercase();
    content_type.starts_with("image/")
        || content_type == "application/pdf"
        || content_type == WORD_DOC
        || content_type == WORD_DOCX
}

pub fn check_certificate_type(file: &StagedBlob) -> Result<()> {
    if is_allowed_certificate_type(file.content_type()) {
        Ok(())
    } else {
        Err(AppError::UnsupportedMedia(format!(
            "Certificates must be images, PDFs or Word documents, got '{}'",
            file.content_type()
        )))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCertificate {
    pub title: String,
    pub description: Option<String>,
    pub kind: Option<String>,
}

#[derive(Clone)]
pub struct CertificateService {
    storage: Arc<Storage>,
    blobs: BlobStore,
    users: UserDirectory,
}

impl CertificateService {
    pub fn new(storage: Arc<Storage>, blobs: BlobStore, users: UserDirectory) -> Self {
        Self { storage, blobs, users }
    }

    pub async fn upload(
        &self,
        email: &str,
        details: NewCertificate,
        file: StagedBlob,
    ) -> Result<certificate::Model> {
        let actor = self.users.resolve(email).await?;
        let title = details.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        check_certificate_type(&file)?;

        let content_type = file.content_type().to_string();
        let key = self.blobs.commit(file, BlobKind::Certificate).await?;

        let inserted = self
            .storage
            .insert_certificate(certificate::ActiveModel {
                user_id: Set(actor.id),
                title: Set(title),
                description: Set(non_blank(details.description)),
                kind: Set(non_blank(details.kind)),
                file_path: Set(key.clone()),
                content_type: Set(content_type),
                upload_date: Set(Utc::now()),
                ..Default::default()
            })
            .await;

        match inserted {
            Ok(created) => {
                tracing::info!("User {} uploaded certificate {}", actor.id, created.id);
                Ok(created)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&key).await {
                    tracing::warn!("{}", AppError::BlobLeak { key, reason: cleanup.to_string() });
                }
                Err(e)
            }
        }
    }

    pub async fn mine(&self, email: &str) -> Result<Vec<certificate::Model>> {
        let actor = self.users.resolve(email).await?;
        self.storage.list_certificates_by_user(actor.id).await
    }

    async fn owned(&self, id: i64, email: &str) -> Result<certificate::Model> {
        let actor = self.users.resolve(email).await?;
        let found = self
            .storage
            .find_certificate(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certificate not found".to_string()))?;
        if found.user_id != actor.id {
            return Err(AppError::Forbidden(
                "You can only access your own certificates".to_string(),
            ));
        }
        Ok(found)
    }

    pub async fn open(&self, id: i64, email: &str) -> Result<(certificate::Model, BlobHandle)> {
        let found = self.owned(id, email).await?;
        let handle = self.blobs.open(&found.file_path).await?;
        Ok((found, handle))
    }

    /// Removes the blob, then the row. A blob that cannot be removed is logged.
    pub async fn delete(&self, id: i64, email: &str) -> Result<()> {
        let found = self.owned(id, email).await?;
        if let Err(e) = self.blobs.delete(&found.file_path).await {
            tracing::warn!(
                "{}",
                AppError::BlobLeak {
                    key: found.file_path.clone(),
                    reason: e.to_string()
                }
            );
        }
        self.storage.delete_certificate(found.id).await?;
        tracing::info!("User {} deleted certificate {}", found.user_id, found.id);
        Ok(())
    }
}
