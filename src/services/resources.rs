// ABOUTME: Faculty-owned teaching resources: upload, listing, streaming, replacement and deletion
// ABOUTME: Blob and row lifetimes are tied together; student views and downloads are tracked

use chrono::Utc;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::Serialize;
use std::sync::Arc;

use crate::blob_store::{self, BlobHandle, BlobKind, BlobStore, StagedBlob};
use crate::entities::{
    access_log::AccessType,
    resource,
    user::Role,
};
use crate::error::{AppError, Result};
use crate::services::{non_blank, AccessTracker, UserDirectory};
use crate::storage::{ResourceFilter, Storage};

#[derive(Debug, Clone, Default)]
pub struct NewResource {
    pub title: String,
    pub description: String,
    pub branch: String,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub branch: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// An opened resource blob ready to be streamed back.
#[derive(Debug)]
pub struct ResourceFile {
    pub resource: resource::Model,
    pub handle: BlobHandle,
    pub content_type: &'static str,
    pub content_disposition: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHealth {
    pub status: &'static str,
    pub upload_directories_accessible: bool,
    pub upload_directory_info: String,
    pub database_status: String,
    pub resource_count: Option<u64>,
    pub timestamp: i64,
}

/// MIME type for a stored key, chosen by extension.
pub fn content_type_for(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct ResourceService {
    storage: Arc<Storage>,
    blobs: BlobStore,
    users: UserDirectory,
    tracker: AccessTracker,
}

impl ResourceService {
    pub fn new(
        storage: Arc<Storage>,
        blobs: BlobStore,
        users: UserDirectory,
        tracker: AccessTracker,
    ) -> Self {
        Self { storage, blobs, users, tracker }
    }

    pub async fn upload(
        &self,
        actor_email: &str,
        details: NewResource,
        file: StagedBlob,
    ) -> Result<resource::Model> {
        let actor = self
            .users
            .require_role(actor_email, Role::Faculty, "Only faculty members can upload resources")
            .await?;

        let title = details.title.trim().to_string();
        let branch = details.branch.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        if branch.is_empty() {
            return Err(AppError::validation("branch", "Branch is required"));
        }

        let file_size = file.size() as i64;
        let file_type = match file.content_type() {
            "" => "application/octet-stream".to_string(),
            ct => ct.to_string(),
        };
        let key = self.blobs.commit(file, BlobKind::Resource).await?;

        let inserted = self
            .storage
            .insert_resource(resource::ActiveModel {
                title: Set(title),
                description: Set(details.description),
                file_name: Set(key.clone()),
                file_size: Set(file_size),
                file_type: Set(file_type),
                uploaded_by: Set(actor.id),
                uploaded_at: Set(Utc::now()),
                branch: Set(branch),
                subject: Set(non_blank(details.subject)),
                ..Default::default()
            })
            .await;

        match inserted {
            Ok(created) => {
                tracing::info!("Faculty {} uploaded resource {} ({} bytes)", actor.id, created.id, file_size);
                Ok(created)
            }
            Err(e) => {
                self.discard_blob(key).await;
                Err(e)
            }
        }
    }

    /// All resources, newest first. A branch of `All` or blank lifts the branch restriction.
    pub async fn list(&self, branch: Option<String>, subject: Option<String>) -> Result<Vec<resource::Model>> {
        let branch = non_blank(branch).filter(|b| !b.eq_ignore_ascii_case("all"));
        let filter = ResourceFilter {
            branch,
            subject: non_blank(subject),
        };
        self.storage.list_resources(&filter).await
    }

    pub async fn list_by_uploader(&self, actor_email: &str) -> Result<Vec<resource::Model>> {
        let actor = self.users.resolve(actor_email).await?;
        self.storage.list_resources_by_uploader(actor.id).await
    }

    pub async fn find(&self, id: i64) -> Result<resource::Model> {
        self.storage
            .find_resource(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource not found with ID: {}", id)))
    }

    /// Opens a resource for streaming. When `viewer_email` names a student the
    /// access is recorded; tracking problems never block the stream.
    pub async fn stream(
        &self,
        id: i64,
        disposition: Disposition,
        viewer_email: Option<&str>,
    ) -> Result<ResourceFile> {
        let resource = self.find(id).await?;
        let handle = self.blobs.open(&resource.file_name).await?;

        if let Some(email) = viewer_email {
            let access_type = match disposition {
                Disposition::Inline => AccessType::Viewed,
                Disposition::Attachment => AccessType::Downloaded,
            };
            self.record_viewer(email, resource.id, access_type).await;
        }

        let content_type = content_type_for(&resource.file_name);
        let content_disposition = match disposition {
            Disposition::Inline => format!("inline; filename=\"{}\"", resource.file_name),
            Disposition::Attachment => format!(
                "attachment; filename=\"{}{}\"",
                blob_store::sanitize_filename(resource.title.trim()),
                blob_store::extension_of(&resource.file_name)
            ),
        };

        Ok(ResourceFile {
            resource,
            handle,
            content_type,
            content_disposition,
        })
    }

    async fn record_viewer(&self, email: &str, resource_id: i64, access_type: AccessType) {
        let viewer = match self.users.find_by_email(email).await {
            Ok(Some(user)) if user.role == Role::Student => user,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("Could not resolve viewer for access tracking: {}", e);
                return;
            }
        };
        if let Err(e) = self.tracker.track(viewer.id, resource_id, access_type).await {
            tracing::warn!("Failed to record access to resource {}: {}", resource_id, e);
        }
    }

    pub async fn recently_accessed(&self, student_email: &str) -> Result<Vec<resource::Model>> {
        let actor = self.users.resolve(student_email).await?;
        self.tracker.recently_accessed(actor.id).await
    }

    /// Owner-only edit. A new file with the same extension overwrites the blob under
    /// the existing key once the row is saved; any other file gets a fresh key and the
    /// old blob is removed after the row points at it.
    pub async fn update(
        &self,
        id: i64,
        actor_email: &str,
        changes: ResourceChanges,
        file: Option<StagedBlob>,
    ) -> Result<resource::Model> {
        let actor = self.users.resolve(actor_email).await?;
        let existing = self.find(id).await?;
        if existing.uploaded_by != actor.id {
            return Err(AppError::Forbidden("You can only update your own resources".to_string()));
        }

        let mut active: resource::ActiveModel = existing.clone().into();
        if let Some(title) = non_blank(changes.title) {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(branch) = non_blank(changes.branch) {
            active.branch = Set(branch);
        }
        if let Some(subject) = changes.subject {
            active.subject = Set(non_blank(Some(subject)));
        }

        let mut overwrite: Option<StagedBlob> = None;
        let mut new_key: Option<String> = None;
        if let Some(staged) = file {
            active.file_size = Set(staged.size() as i64);
            active.file_type = Set(match staged.content_type() {
                "" => "application/octet-stream".to_string(),
                ct => ct.to_string(),
            });
            if staged.extension() == blob_store::extension_of(&existing.file_name) {
                overwrite = Some(staged);
            } else {
                let key = self.blobs.commit(staged, BlobKind::Resource).await?;
                active.file_name = Set(key.clone());
                new_key = Some(key);
            }
        }

        let updated = match self.storage.update_resource(active).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(key) = new_key {
                    self.discard_blob(key).await;
                }
                return Err(e);
            }
        };

        if let Some(staged) = overwrite {
            if let Err(e) = self.blobs.replace(&existing.file_name, staged).await {
                let restore = existing.clone().into_active_model().reset_all();
                if let Err(restore_err) = self.storage.update_resource(restore).await {
                    tracing::error!("Could not restore resource {} after a failed file swap: {}", id, restore_err);
                }
                return Err(e);
            }
        } else if new_key.is_some() {
            self.discard_blob(existing.file_name).await;
        }

        tracing::info!("Faculty {} updated resource {}", actor.id, updated.id);
        Ok(updated)
    }

    async fn discard_blob(&self, key: String) {
        if let Err(e) = self.blobs.delete(&key).await {
            tracing::warn!("{}", AppError::BlobLeak { key, reason: e.to_string() });
        }
    }

    /// Owner-only delete. The blob goes first; failing to remove it is logged and
    /// does not stop the row from being deleted.
    pub async fn delete(&self, id: i64, actor_email: &str) -> Result<()> {
        let actor = self.users.resolve(actor_email).await?;
        let existing = self.find(id).await?;
        if existing.uploaded_by != actor.id {
            return Err(AppError::Forbidden("You can only delete your own resources".to_string()));
        }

        self.discard_blob(existing.file_name).await;
        self.storage.delete_resource(id).await?;
        tracing::info!("Faculty {} deleted resource {}", actor.id, id);
        Ok(())
    }

    pub async fn health(&self) -> ResourceHealth {
        let (database_status, resource_count) = match self.storage.count_resources().await {
            Ok(count) => ("healthy".to_string(), Some(count)),
            Err(e) => (format!("error: {}", e), None),
        };
        ResourceHealth {
            status: "healthy",
            upload_directories_accessible: self.blobs.healthy().await,
            upload_directory_info: self.blobs.directory_info(),
            database_status,
            resource_count,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::MAX_RESOURCE_BYTES;
    use crate::test_support::{create_test_blobs, create_test_storage, seed_user};
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct Fixture {
        _dir: TempDir,
        service: ResourceService,
        blobs: BlobStore,
        tracker: AccessTracker,
        storage: Arc<Storage>,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = create_test_storage(&dir).await;
        let blobs = create_test_blobs(&dir);
        let users = UserDirectory::new(storage.clone());
        let tracker = AccessTracker::new(storage.clone());
        seed_user(&storage, "prof@x.com", Role::Faculty).await;
        seed_user(&storage, "other@x.com", Role::Faculty).await;
        seed_user(&storage, "alice@x.com", Role::Student).await;
        let service = ResourceService::new(storage.clone(), blobs.clone(), users, tracker.clone());
        Fixture { _dir: dir, service, blobs, tracker, storage }
    }

    async fn staged(blobs: &BlobStore, name: &str, body: &'static [u8]) -> StagedBlob {
        blobs
            .stage_bytes(name, "application/pdf", body, MAX_RESOURCE_BYTES)
            .await
            .unwrap()
    }

    fn details(title: &str, branch: &str, subject: Option<&str>) -> NewResource {
        NewResource {
            title: title.into(),
            description: "Lecture notes".into(),
            branch: branch.into(),
            subject: subject.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_upload_requires_faculty() {
        let f = fixture().await;

        let file = staged(&f.blobs, "notes.pdf", b"%PDF-1.4").await;
        let err = f
            .service
            .upload("alice@x.com", details("Notes", "CSE", None), file)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let file = staged(&f.blobs, "notes.pdf", b"%PDF-1.4").await;
        let err = f
            .service
            .upload("ghost@x.com", details("Notes", "CSE", None), file)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
        assert!(f.service.list(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_and_stream() {
        let f = fixture().await;
        let file = staged(&f.blobs, "notes.pdf", b"%PDF-1.4 body").await;
        let created = f
            .service
            .upload("prof@x.com", details("OS Notes", "CSE", Some("OS")), file)
            .await
            .unwrap();
        assert!(created.file_name.starts_with("resource_"));
        assert!(created.file_name.ends_with(".pdf"));
        assert_eq!(created.file_size, 13);
        assert_eq!(created.subject.as_deref(), Some("OS"));

        let mut download = f
            .service
            .stream(created.id, Disposition::Attachment, None)
            .await
            .unwrap();
        assert_eq!(download.content_type, "application/pdf");
        assert_eq!(download.content_disposition, "attachment; filename=\"OS_Notes.pdf\"");
        let mut body = Vec::new();
        download.handle.file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"%PDF-1.4 body");

        let inline = f.service.stream(created.id, Disposition::Inline, None).await.unwrap();
        assert_eq!(
            inline.content_disposition,
            format!("inline; filename=\"{}\"", created.file_name)
        );
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = fixture().await;
        for (title, branch, subject) in [
            ("A", "CSE", Some("OS")),
            ("B", "CSE", Some("Networks")),
            ("C", "ECE", None),
        ] {
            let file = staged(&f.blobs, "x.pdf", b"data").await;
            f.service
                .upload("prof@x.com", details(title, branch, subject), file)
                .await
                .unwrap();
        }

        let titles = |list: Vec<resource::Model>| list.into_iter().map(|r| r.title).collect::<Vec<_>>();
        assert_eq!(titles(f.service.list(None, None).await.unwrap()), vec!["C", "B", "A"]);
        assert_eq!(f.service.list(Some("All".into()), None).await.unwrap().len(), 3);
        assert_eq!(f.service.list(Some("all".into()), None).await.unwrap().len(), 3);
        assert_eq!(f.service.list(Some("".into()), None).await.unwrap().len(), 3);
        assert_eq!(titles(f.service.list(Some("ECE".into()), None).await.unwrap()), vec!["C"]);
        assert_eq!(
            titles(f.service.list(Some("cse".into()), Some("os".into())).await.unwrap()),
            vec!["A"]
        );
        assert!(f.service.list(Some("MECH".into()), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_owner_only_and_removes_blob() {
        let f = fixture().await;
        let file = staged(&f.blobs, "x.pdf", b"data").await;
        let created = f
            .service
            .upload("prof@x.com", details("Mine", "CSE", None), file)
            .await
            .unwrap();

        let err = f.service.delete(created.id, "other@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(f.blobs.exists(&created.file_name).await);

        f.service.delete(created.id, "prof@x.com").await.unwrap();
        assert!(!f.blobs.exists(&created.file_name).await);
        assert!(f.service.list(None, None).await.unwrap().is_empty());
        assert!(f
            .service
            .stream(created.id, Disposition::Attachment, None)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_with_missing_blob_still_removes_row() {
        let f = fixture().await;
        let file = staged(&f.blobs, "x.pdf", b"data").await;
        let created = f
            .service
            .upload("prof@x.com", details("Gone", "CSE", None), file)
            .await
            .unwrap();
        f.blobs.delete(&created.file_name).await.unwrap();

        f.service.delete(created.id, "prof@x.com").await.unwrap();
        assert!(f.storage.find_resource(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_overwrites_same_format_in_place() {
        let f = fixture().await;
        let file = staged(&f.blobs, "x.pdf", b"version one").await;
        let created = f
            .service
            .upload("prof@x.com", details("Draft", "CSE", None), file)
            .await
            .unwrap();

        let replacement = staged(&f.blobs, "y.pdf", b"v2").await;
        let updated = f
            .service
            .update(
                created.id,
                "prof@x.com",
                ResourceChanges {
                    title: Some("Final".into()),
                    ..Default::default()
                },
                Some(replacement),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.file_size, 2);
        assert_eq!(updated.file_name, created.file_name);

        let mut handle = f.blobs.open(&created.file_name).await.unwrap();
        let mut body = Vec::new();
        handle.file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"v2");

        let err = f
            .service
            .update(created.id, "other@x.com", ResourceChanges::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_update_with_other_format_changes_served_type() {
        let f = fixture().await;
        let file = staged(&f.blobs, "notes.pdf", b"%PDF-1.4").await;
        let created = f
            .service
            .upload("prof@x.com", details("Operating Systems Notes", "CSE", None), file)
            .await
            .unwrap();

        let pptx = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
        let slides = f
            .blobs
            .stage_bytes("slides.pptx", pptx, &b"PK\x03\x04slides"[..], MAX_RESOURCE_BYTES)
            .await
            .unwrap();
        let updated = f
            .service
            .update(created.id, "prof@x.com", ResourceChanges::default(), Some(slides))
            .await
            .unwrap();
        assert!(updated.file_name.ends_with(".pptx"));
        assert_eq!(updated.file_type, pptx);
        assert!(!f.blobs.exists(&created.file_name).await);
        assert!(f.blobs.exists(&updated.file_name).await);

        let download = f
            .service
            .stream(created.id, Disposition::Attachment, None)
            .await
            .unwrap();
        assert_eq!(download.content_type, pptx);
        assert_eq!(
            download.content_disposition,
            "attachment; filename=\"Operating_Systems_Notes.pptx\""
        );
    }

    #[tokio::test]
    async fn test_student_streams_are_tracked() {
        let f = fixture().await;
        let file = staged(&f.blobs, "x.pdf", b"data").await;
        let created = f
            .service
            .upload("prof@x.com", details("Tracked", "CSE", None), file)
            .await
            .unwrap();

        f.service
            .stream(created.id, Disposition::Inline, Some("alice@x.com"))
            .await
            .unwrap();
        f.service
            .stream(created.id, Disposition::Inline, Some("alice@x.com"))
            .await
            .unwrap();
        f.service
            .stream(created.id, Disposition::Attachment, Some("prof@x.com"))
            .await
            .unwrap();

        let alice = f.storage.find_user_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(f.tracker.history(alice.id).await.unwrap().len(), 1);
        let recent = f.service.recently_accessed("alice@x.com").await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, created.id);
    }

    #[test]
    fn test_content_type_table() {
        assert_eq!(content_type_for("resource_1_a.PDF"), "application/pdf");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.mov"), "video/quicktime");
        assert_eq!(content_type_for("a.txt"), "text/plain");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
        assert_eq!(content_type_for("a.zip"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let f = fixture().await;
        let health = f.service.health().await;
        assert!(health.upload_directories_accessible);
        assert_eq!(health.resource_count, Some(0));
        assert_eq!(health.database_status, "healthy");
    }
}
