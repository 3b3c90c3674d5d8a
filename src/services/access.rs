// ABOUTME: Records student views and downloads of resources, coalescing same-type repeats within an hour
// ABOUTME: Also answers which resources a student touched most recently

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::entities::{
    access_log::{self, AccessType},
    resource,
};
use crate::error::Result;
use crate::storage::Storage;

pub fn coalesce_window() -> Duration {
    Duration::hours(1)
}

#[derive(Clone)]
pub struct AccessTracker {
    storage: Arc<Storage>,
}

impl AccessTracker {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Returns true when a new row was written.
    pub async fn track(&self, student_id: i64, resource_id: i64, access_type: AccessType) -> Result<bool> {
        self.track_at(student_id, resource_id, access_type, Utc::now()).await
    }

    pub async fn track_at(
        &self,
        student_id: i64,
        resource_id: i64,
        access_type: AccessType,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let inserted = self
            .storage
            .record_access(student_id, resource_id, access_type, at, coalesce_window())
            .await?;
        if inserted.is_some() {
            tracing::debug!(
                "Recorded {:?} of resource {} by student {}",
                access_type,
                resource_id,
                student_id
            );
        }
        Ok(inserted.is_some())
    }

    pub async fn recently_accessed(&self, student_id: i64) -> Result<Vec<resource::Model>> {
        self.storage.recently_accessed_resources(student_id).await
    }

    pub async fn history(&self, student_id: i64) -> Result<Vec<access_log::Model>> {
        self.storage.access_history(student_id).await
    }
}
