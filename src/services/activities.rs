// ABOUTME: Student activity submissions and the faculty approval workflow
// ABOUTME: Certifications take a fast path that is approved on submission

use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use std::sync::Arc;

use crate::blob_store::{BlobKind, BlobStore, StagedBlob};
use crate::entities::{
    activity::{self, ActivityStatus, CERT_COURSE, CERT_INTERNSHIP},
    user::Role,
};
use crate::error::{AppError, Result};
use crate::services::certificates::check_certificate_type;
use crate::services::{non_blank, UserDirectory};
use crate::storage::{Review, Storage};

#[derive(Debug, Clone, Default)]
pub struct ActivitySubmission {
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub credits: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct CertificationSubmission {
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// `INTERNSHIP` in any case maps to the internship category; anything else is a course.
pub fn certification_category(kind: &str) -> &'static str {
    if kind.trim().eq_ignore_ascii_case("INTERNSHIP") {
        CERT_INTERNSHIP
    } else {
        CERT_COURSE
    }
}

#[derive(Clone)]
pub struct ActivityService {
    storage: Arc<Storage>,
    blobs: BlobStore,
    users: UserDirectory,
}

impl ActivityService {
    pub fn new(storage: Arc<Storage>, blobs: BlobStore, users: UserDirectory) -> Self {
        Self { storage, blobs, users }
    }

    pub async fn submit(
        &self,
        student_email: &str,
        submission: ActivitySubmission,
        certificate: Option<StagedBlob>,
    ) -> Result<activity::Model> {
        let student = self
            .users
            .require_role(student_email, Role::Student, "Only students can submit activities")
            .await?;

        let category = submission.category.trim().to_string();
        let title = submission.title.trim().to_string();
        if category.is_empty() {
            return Err(AppError::validation("category", "Category is required"));
        }
        if title.is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        if matches!(submission.credits, Some(c) if c < 0) {
            return Err(AppError::validation("credits", "Credits must not be negative"));
        }

        let draft = activity::ActiveModel {
            student_id: Set(student.id),
            category: Set(category),
            title: Set(title),
            description: Set(non_blank(submission.description)),
            start_date: Set(submission.start_date),
            end_date: Set(submission.end_date),
            credits: Set(submission.credits),
            status: Set(ActivityStatus::Pending),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let saved = self.insert_with_blob(draft, certificate).await?;
        tracing::info!("Student {} submitted activity {}", student.id, saved.id);
        Ok(saved)
    }

    async fn insert_with_blob(
        &self,
        mut draft: activity::ActiveModel,
        certificate: Option<StagedBlob>,
    ) -> Result<activity::Model> {
        let key = match certificate {
            Some(file) => {
                check_certificate_type(&file)?;
                Some(self.blobs.commit(file, BlobKind::ActivityCertificate).await?)
            }
            None => None,
        };
        draft.certificate_file = Set(key.clone());

        match self.storage.insert_activity(draft).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                if let Some(key) = key {
                    if let Err(cleanup) = self.blobs.delete(&key).await {
                        tracing::warn!("{}", AppError::BlobLeak { key, reason: cleanup.to_string() });
                    }
                }
                Err(e)
            }
        }
    }

    pub async fn mine(&self, student_email: &str) -> Result<Vec<activity::Model>> {
        let actor = self.users.resolve(student_email).await?;
        self.storage.list_activities_by_student(actor.id).await
    }

    pub async fn pending(&self) -> Result<Vec<activity::Model>> {
        self.storage.list_activities_by_status(ActivityStatus::Pending).await
    }

    pub async fn approve(&self, id: i64, faculty_email: &str) -> Result<activity::Model> {
        let faculty = self
            .users
            .require_role(faculty_email, Role::Faculty, "Only faculty can approve activities")
            .await?;

        let updated = self
            .storage
            .review_activity(
                id,
                Review {
                    status: ActivityStatus::Approved,
                    reviewer_id: faculty.id,
                    rejection_reason: None,
                    at: Utc::now(),
                },
            )
            .await?;
        tracing::info!("Faculty {} approved activity {}", faculty.id, id);
        Ok(updated)
    }

    pub async fn reject(&self, id: i64, faculty_email: &str, reason: &str) -> Result<activity::Model> {
        let faculty = self
            .users
            .require_role(faculty_email, Role::Faculty, "Only faculty can reject activities")
            .await?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason", "Rejection reason is required"));
        }

        let updated = self
            .storage
            .review_activity(
                id,
                Review {
                    status: ActivityStatus::Rejected,
                    reviewer_id: faculty.id,
                    rejection_reason: Some(reason.to_string()),
                    at: Utc::now(),
                },
            )
            .await?;
        tracing::info!("Faculty {} rejected activity {}", faculty.id, id);
        Ok(updated)
    }

    /// Records a completed course or internship. No review step: it is stored approved.
    pub async fn submit_certification(
        &self,
        student_email: &str,
        submission: CertificationSubmission,
        file: StagedBlob,
    ) -> Result<activity::Model> {
        let student = self
            .users
            .require_role(student_email, Role::Student, "Only students can add certifications")
            .await?;
        let title = submission.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }

        let draft = activity::ActiveModel {
            student_id: Set(student.id),
            category: Set(certification_category(&submission.kind).to_string()),
            title: Set(title),
            description: Set(non_blank(submission.description)),
            start_date: Set(submission.start_date),
            end_date: Set(submission.end_date),
            credits: Set(None),
            status: Set(ActivityStatus::Approved),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let saved = self.insert_with_blob(draft, Some(file)).await?;
        tracing::info!("Student {} added certification {}", student.id, saved.id);
        Ok(saved)
    }

    pub async fn mine_certifications(&self, student_email: &str) -> Result<Vec<activity::Model>> {
        let actor = self.users.resolve(student_email).await?;
        self.storage.list_certifications(actor.id).await
    }

    pub async fn delete_my_certification(&self, id: i64, student_email: &str) -> Result<()> {
        let actor = self.users.resolve(student_email).await?;
        let found = self
            .storage
            .find_activity(id)
            .await?
            .filter(|a| a.is_certification())
            .ok_or_else(|| AppError::NotFound("Certification not found".to_string()))?;
        if found.student_id != actor.id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }

        if let Some(key) = &found.certificate_file {
            if let Err(e) = self.blobs.delete(key).await {
                tracing::warn!(
                    "{}",
                    AppError::BlobLeak {
                        key: key.clone(),
                        reason: e.to_string()
                    }
                );
            }
        }
        self.storage.delete_activity(found.id).await?;
        tracing::info!("Student {} deleted certification {}", actor.id, found.id);
        Ok(())
    }
}
