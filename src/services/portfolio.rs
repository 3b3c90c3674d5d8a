// ABOUTME: Read-only projection of a student's profile, activities and approved credit total
// ABOUTME: Null credits count as zero and only approved rows contribute

use serde::Serialize;
use std::sync::Arc;

use crate::entities::{
    activity::{self, ActivityStatus},
    user,
};
use crate::error::Result;
use crate::services::UserDirectory;
use crate::storage::Storage;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub user: user::Model,
    pub activities: Vec<activity::Model>,
    pub approved_activities: usize,
    pub total_credits: i64,
}

impl Portfolio {
    pub fn from_parts(user: user::Model, activities: Vec<activity::Model>) -> Self {
        let approved_activities = activities
            .iter()
            .filter(|a| a.status == ActivityStatus::Approved)
            .count();
        let total_credits = activities.iter().map(activity::Model::earned_credits).sum();
        Portfolio {
            user,
            activities,
            approved_activities,
            total_credits,
        }
    }
}

#[derive(Clone)]
pub struct PortfolioAggregator {
    storage: Arc<Storage>,
    users: UserDirectory,
}

impl PortfolioAggregator {
    pub fn new(storage: Arc<Storage>, users: UserDirectory) -> Self {
        Self { storage, users }
    }

    pub async fn summary(&self, student_email: &str) -> Result<Portfolio> {
        let user = self.users.require_user(student_email).await?;
        let activities = self.storage.list_activities_by_student(user.id).await?;
        Ok(Portfolio::from_parts(user, activities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::Role;
    use crate::error::AppError;
    use crate::services::activities::{ActivityService, ActivitySubmission};
    use crate::test_support::{create_test_blobs, create_test_storage, seed_user};
    use tempfile::TempDir;

    fn submission(title: &str, credits: Option<i32>) -> ActivitySubmission {
        ActivitySubmission {
            category: "WORKSHOP".into(),
            title: title.into(),
            credits,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_only_approved_credits_count() {
        let dir = TempDir::new().unwrap();
        let storage = create_test_storage(&dir).await;
        seed_user(&storage, "alice@x.com", Role::Student).await;
        seed_user(&storage, "prof@x.com", Role::Faculty).await;
        let users = UserDirectory::new(storage.clone());
        let activities = ActivityService::new(storage.clone(), create_test_blobs(&dir), users.clone());
        let portfolio = PortfolioAggregator::new(storage, users);

        let approved = activities.submit("alice@x.com", submission("A", Some(3)), None).await.unwrap();
        let no_credits = activities.submit("alice@x.com", submission("B", None), None).await.unwrap();
        let zero = activities.submit("alice@x.com", submission("C", Some(0)), None).await.unwrap();
        let rejected = activities.submit("alice@x.com", submission("D", Some(10)), None).await.unwrap();
        activities.submit("alice@x.com", submission("E", Some(7)), None).await.unwrap();

        activities.approve(approved.id, "prof@x.com").await.unwrap();
        activities.approve(no_credits.id, "prof@x.com").await.unwrap();
        activities.approve(zero.id, "prof@x.com").await.unwrap();
        activities.reject(rejected.id, "prof@x.com", "no proof").await.unwrap();

        let summary = portfolio.summary("ALICE@x.com").await.unwrap();
        assert_eq!(summary.user.email, "alice@x.com");
        assert_eq!(summary.activities.len(), 5);
        assert_eq!(summary.approved_activities, 3);
        assert_eq!(summary.total_credits, 3);
    }

    #[tokio::test]
    async fn test_empty_portfolio() {
        let dir = TempDir::new().unwrap();
        let storage = create_test_storage(&dir).await;
        seed_user(&storage, "alice@x.com", Role::Student).await;
        let users = UserDirectory::new(storage.clone());
        let portfolio = PortfolioAggregator::new(storage, users);

        let summary = portfolio.summary("alice@x.com").await.unwrap();
        assert!(summary.activities.is_empty());
        assert_eq!(summary.approved_activities, 0);
        assert_eq!(summary.total_credits, 0);

        let err = portfolio.summary("ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[test]
    fn test_serializes_camel_case() {
        let now = chrono::Utc::now();
        let user = user::Model {
            id: 1,
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            email: "alice@x.com".into(),
            password: "secret".into(),
            role: Role::Student,
            profile_picture: None,
            created_at: now,
            updated_at: now,
            last_login: None,
            is_active: true,
        };
        let value = serde_json::to_value(Portfolio::from_parts(user, Vec::new())).unwrap();
        assert_eq!(value["approvedActivities"], 0);
        assert_eq!(value["totalCredits"], 0);
        assert!(value["user"].get("password").is_none());
    }
}
