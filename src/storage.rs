// ABOUTME: SQLite persistence layer for users, resources, activities, certificates and access logs
// ABOUTME: Read-modify-write sequences run inside a single transaction per operation

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;

use crate::entities::{
    access_log::{self, AccessType},
    activity::{self, ActivityStatus, CERT_COURSE, CERT_INTERNSHIP},
    certificate, resource,
    user::{self, Role},
};
use crate::error::{AppError, Result};
use crate::migration::Migrator;

pub struct Storage {
    pub db: DatabaseConnection,
}

/// Listing restrictions for resources. `None` means unrestricted.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub branch: Option<String>,
    pub subject: Option<String>,
}

/// Profile fields to overwrite. `profile_picture: Some(None)` clears the picture.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<Option<String>>,
}

/// The outcome of a faculty review applied to an activity.
#[derive(Debug, Clone)]
pub struct Review {
    pub status: ActivityStatus,
    pub reviewer_id: i64,
    pub rejection_reason: Option<String>,
    pub at: DateTime<Utc>,
}

impl Storage {
    /// Connects to `database_url` and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = Database::connect(database_url).await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    // ==================== USERS ====================

    pub async fn insert_user(&self, new_user: user::ActiveModel) -> Result<user::Model> {
        let txn = self.db.begin().await?;

        if let sea_orm::ActiveValue::Set(email) = &new_user.email {
            let existing = user::Entity::find()
                .filter(user::Column::Email.eq(email.as_str()))
                .one(&txn)
                .await?;
            if existing.is_some() {
                return Err(AppError::Conflict(
                    "User with this email already exists".to_string(),
                ));
            }
        }

        let created = new_user.insert(&txn).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Looks a user up by an already-normalized (lower-cased) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_users_by_role(&self, role: Role) -> Result<Vec<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Role.eq(role))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<user::Model> {
        let txn = self.db.begin().await?;
        let found = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let mut active: user::ActiveModel = found.into();
        active.last_login = Set(Some(at));
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn update_password(&self, user_id: i64, password: &str) -> Result<user::Model> {
        let txn = self.db.begin().await?;
        let found = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let mut active: user::ActiveModel = found.into();
        active.password = Set(password.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn update_profile(&self, user_id: i64, changes: ProfileChanges) -> Result<user::Model> {
        let txn = self.db.begin().await?;
        let found = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let mut active: user::ActiveModel = found.into();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(picture) = changes.profile_picture {
            active.profile_picture = Set(picture);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    // ==================== RESOURCES ====================

    pub async fn insert_resource(&self, new_resource: resource::ActiveModel) -> Result<resource::Model> {
        Ok(new_resource.insert(&self.db).await?)
    }

    pub async fn find_resource(&self, id: i64) -> Result<Option<resource::Model>> {
        Ok(resource::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Resources newest first, ties broken by id descending. Branch and subject
    /// comparisons ignore case.
    pub async fn list_resources(&self, filter: &ResourceFilter) -> Result<Vec<resource::Model>> {
        let mut query = resource::Entity::find();
        if let Some(branch) = &filter.branch {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(resource::Column::Branch)))
                    .eq(branch.to_lowercase()),
            );
        }
        if let Some(subject) = &filter.subject {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(resource::Column::Subject)))
                    .eq(subject.to_lowercase()),
            );
        }
        Ok(query
            .order_by_desc(resource::Column::UploadedAt)
            .order_by_desc(resource::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_resources_by_uploader(&self, user_id: i64) -> Result<Vec<resource::Model>> {
        Ok(resource::Entity::find()
            .filter(resource::Column::UploadedBy.eq(user_id))
            .order_by_desc(resource::Column::UploadedAt)
            .order_by_desc(resource::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_resource(&self, changes: resource::ActiveModel) -> Result<resource::Model> {
        Ok(changes.update(&self.db).await?)
    }

    /// Deletes a resource row together with its access history.
    pub async fn delete_resource(&self, id: i64) -> Result<()> {
        let txn = self.db.begin().await?;
        access_log::Entity::delete_many()
            .filter(access_log::Column::ResourceId.eq(id))
            .exec(&txn)
            .await?;
        let result = resource::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Resource not found with ID: {}", id)));
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn count_resources(&self) -> Result<u64> {
        Ok(resource::Entity::find().count(&self.db).await?)
    }

    // ==================== ACTIVITIES ====================

    pub async fn insert_activity(&self, new_activity: activity::ActiveModel) -> Result<activity::Model> {
        Ok(new_activity.insert(&self.db).await?)
    }

    pub async fn find_activity(&self, id: i64) -> Result<Option<activity::Model>> {
        Ok(activity::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn list_activities_by_student(&self, student_id: i64) -> Result<Vec<activity::Model>> {
        Ok(activity::Entity::find()
            .filter(activity::Column::StudentId.eq(student_id))
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_activities_by_status(&self, status: ActivityStatus) -> Result<Vec<activity::Model>> {
        Ok(activity::Entity::find()
            .filter(activity::Column::Status.eq(status))
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_certifications(&self, student_id: i64) -> Result<Vec<activity::Model>> {
        Ok(activity::Entity::find()
            .filter(activity::Column::StudentId.eq(student_id))
            .filter(activity::Column::Category.is_in([CERT_COURSE, CERT_INTERNSHIP]))
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Applies a review to an activity. The last review written wins.
    pub async fn review_activity(&self, id: i64, review: Review) -> Result<activity::Model> {
        let txn = self.db.begin().await?;
        let found = activity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

        let mut active: activity::ActiveModel = found.into();
        active.status = Set(review.status);
        active.approved_by = Set(Some(review.reviewer_id));
        active.approved_at = Set(Some(review.at));
        active.rejection_reason = Set(review.rejection_reason);
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete_activity(&self, id: i64) -> Result<()> {
        activity::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    // ==================== CERTIFICATES ====================

    pub async fn insert_certificate(
        &self,
        new_certificate: certificate::ActiveModel,
    ) -> Result<certificate::Model> {
        Ok(new_certificate.insert(&self.db).await?)
    }

    pub async fn find_certificate(&self, id: i64) -> Result<Option<certificate::Model>> {
        Ok(certificate::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn list_certificates_by_user(&self, user_id: i64) -> Result<Vec<certificate::Model>> {
        Ok(certificate::Entity::find()
            .filter(certificate::Column::UserId.eq(user_id))
            .order_by_desc(certificate::Column::UploadDate)
            .order_by_desc(certificate::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn delete_certificate(&self, id: i64) -> Result<()> {
        certificate::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    // ==================== ACCESS LOGS ====================

    /// Inserts an access row unless the student's latest access to this resource has the
    /// same type and is no older than `window`. Returns the new row when one was written.
    pub async fn record_access(
        &self,
        student_id: i64,
        resource_id: i64,
        access_type: AccessType,
        at: DateTime<Utc>,
        window: Duration,
    ) -> Result<Option<access_log::Model>> {
        let txn = self.db.begin().await?;
        let latest = access_log::Entity::find()
            .filter(access_log::Column::StudentId.eq(student_id))
            .filter(access_log::Column::ResourceId.eq(resource_id))
            .order_by_desc(access_log::Column::AccessedAt)
            .order_by_desc(access_log::Column::Id)
            .one(&txn)
            .await?;

        let coalesced = matches!(
            &latest,
            Some(previous) if previous.access_type == access_type && at - previous.accessed_at <= window
        );
        if coalesced {
            return Ok(None);
        }

        let inserted = access_log::ActiveModel {
            student_id: Set(student_id),
            resource_id: Set(resource_id),
            accessed_at: Set(at),
            access_type: Set(access_type),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(Some(inserted))
    }

    pub async fn access_history(&self, student_id: i64) -> Result<Vec<access_log::Model>> {
        Ok(access_log::Entity::find()
            .filter(access_log::Column::StudentId.eq(student_id))
            .order_by_desc(access_log::Column::AccessedAt)
            .order_by_desc(access_log::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Distinct resources a student accessed, most recent access first.
    pub async fn recently_accessed_resources(&self, student_id: i64) -> Result<Vec<resource::Model>> {
        let history = self.access_history(student_id).await?;

        let mut ordered_ids: Vec<i64> = Vec::new();
        for entry in &history {
            if !ordered_ids.contains(&entry.resource_id) {
                ordered_ids.push(entry.resource_id);
            }
        }
        if ordered_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i64, resource::Model> = resource::Entity::find()
            .filter(resource::Column::Id.is_in(ordered_ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        Ok(ordered_ids
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect())
    }
}
