// ABOUTME: Tests for the storage layer against a throwaway SQLite database
// ABOUTME: Covers uniqueness, filtering, ordering, review stamping, cascades and access coalescing

#[cfg(test)]
mod tests {
    use super::super::storage::*;
    use crate::entities::{
        access_log::AccessType,
        activity::{self, ActivityStatus, CERT_COURSE, CERT_INTERNSHIP},
        certificate, resource,
        user::{self, Role},
    };
    use crate::error::AppError;
    use crate::test_support::{create_test_storage, seed_resource, seed_user};
    use chrono::{Duration, Utc};
    use sea_orm::{ActiveModelTrait, Set};
    use tempfile::TempDir;

    async fn insert_activity(storage: &Storage, student_id: i64, category: &str, credits: Option<i32>) -> activity::Model {
        storage
            .insert_activity(activity::ActiveModel {
                student_id: Set(student_id),
                category: Set(category.to_string()),
                title: Set(format!("{} entry", category)),
                description: Set(None),
                start_date: Set(None),
                end_date: Set(None),
                credits: Set(credits),
                certificate_file: Set(None),
                status: Set(ActivityStatus::Pending),
                approved_by: Set(None),
                approved_at: Set(None),
                rejection_reason: Set(None),
                created_at: Set(Utc::now()),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        seed_user(&storage, "alice@x.com", Role::Student).await;

        let now = Utc::now();
        let duplicate = user::ActiveModel {
            first_name: Set("Other".into()),
            last_name: Set("Alice".into()),
            email: Set("alice@x.com".into()),
            password: Set("pw123456".into()),
            role: Set(Role::Student),
            profile_picture: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            last_login: Set(None),
            is_active: Set(true),
            ..Default::default()
        };
        let err = storage.insert_user(duplicate).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_user_lookups_and_updates() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let alice = seed_user(&storage, "alice@x.com", Role::Student).await;
        seed_user(&storage, "prof@x.com", Role::Faculty).await;

        let by_email = storage.find_user_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, alice.id);
        assert!(storage.find_user_by_email("nobody@x.com").await.unwrap().is_none());

        let faculty = storage.find_users_by_role(Role::Faculty).await.unwrap();
        assert_eq!(faculty.len(), 1);
        assert_eq!(faculty[0].email, "prof@x.com");

        let at = Utc::now();
        let logged_in = storage.record_login(alice.id, at).await.unwrap();
        assert_eq!(logged_in.last_login.map(|t| t.timestamp()), Some(at.timestamp()));

        let changed = storage.update_password(alice.id, "newpass1").await.unwrap();
        assert_eq!(changed.password, "newpass1");

        let pictured = storage
            .update_profile(
                alice.id,
                ProfileChanges {
                    first_name: Some("Alicia".into()),
                    profile_picture: Some(Some("data:image/png;base64,AA==".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(pictured.first_name, "Alicia");
        assert_eq!(pictured.last_name, "User");
        assert!(pictured.profile_picture.is_some());

        let cleared = storage
            .update_profile(
                alice.id,
                ProfileChanges {
                    profile_picture: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.profile_picture.is_none());
        assert_eq!(cleared.first_name, "Alicia");

        let err = storage.record_login(9999, at).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resource_filters_ignore_case() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let prof = seed_user(&storage, "prof@x.com", Role::Faculty).await;

        let os = seed_resource(&storage, prof.id, "resource_1_a.pdf", "OS Notes", "CSE").await;
        let mut active: resource::ActiveModel = os.clone().into();
        active.subject = Set(Some("OS".into()));
        active.update(&storage.db).await.unwrap();
        seed_resource(&storage, prof.id, "resource_2_b.pdf", "Circuits", "ECE").await;

        let all = storage.list_resources(&ResourceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let cse = storage
            .list_resources(&ResourceFilter {
                branch: Some("cse".into()),
                subject: Some("os".into()),
            })
            .await
            .unwrap();
        assert_eq!(cse.len(), 1);
        assert_eq!(cse[0].id, os.id);

        let subject_only = storage
            .list_resources(&ResourceFilter {
                branch: None,
                subject: Some("Os".into()),
            })
            .await
            .unwrap();
        assert_eq!(subject_only.len(), 1);

        let none = storage
            .list_resources(&ResourceFilter {
                branch: Some("MECH".into()),
                subject: None,
            })
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(storage.count_resources().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_resources_newest_first_with_id_tiebreak() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let prof = seed_user(&storage, "prof@x.com", Role::Faculty).await;

        let first = seed_resource(&storage, prof.id, "resource_1_a.pdf", "First", "CSE").await;
        let second = seed_resource(&storage, prof.id, "resource_2_b.pdf", "Second", "CSE").await;
        let third = seed_resource(&storage, prof.id, "resource_3_c.pdf", "Third", "CSE").await;

        // Give the first two the same timestamp so only the id can order them.
        let stamp = Utc::now() + Duration::minutes(5);
        for model in [&first, &second] {
            let mut active: resource::ActiveModel = (*model).clone().into();
            active.uploaded_at = Set(stamp);
            active.update(&storage.db).await.unwrap();
        }

        let ids: Vec<i64> = storage
            .list_resources_by_uploader(prof.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id, third.id]);
    }

    #[tokio::test]
    async fn test_delete_resource_removes_access_logs() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let prof = seed_user(&storage, "prof@x.com", Role::Faculty).await;
        let alice = seed_user(&storage, "alice@x.com", Role::Student).await;
        let r = seed_resource(&storage, prof.id, "resource_1_a.pdf", "Notes", "CSE").await;

        storage
            .record_access(alice.id, r.id, AccessType::Viewed, Utc::now(), Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(storage.access_history(alice.id).await.unwrap().len(), 1);

        storage.delete_resource(r.id).await.unwrap();
        assert!(storage.find_resource(r.id).await.unwrap().is_none());
        assert!(storage.access_history(alice.id).await.unwrap().is_empty());
        assert!(storage.recently_accessed_resources(alice.id).await.unwrap().is_empty());

        let err = storage.delete_resource(r.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_review_stamps_and_clears_reason() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let alice = seed_user(&storage, "alice@x.com", Role::Student).await;
        let prof = seed_user(&storage, "prof@x.com", Role::Faculty).await;
        let pending = insert_activity(&storage, alice.id, "HACKATHON", Some(3)).await;

        let rejected = storage
            .review_activity(
                pending.id,
                Review {
                    status: ActivityStatus::Rejected,
                    reviewer_id: prof.id,
                    rejection_reason: Some("no proof".into()),
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("no proof"));

        let approved = storage
            .review_activity(
                pending.id,
                Review {
                    status: ActivityStatus::Approved,
                    reviewer_id: prof.id,
                    rejection_reason: None,
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.status, ActivityStatus::Approved);
        assert_eq!(approved.approved_by, Some(prof.id));
        assert!(approved.approved_at.is_some());
        assert!(approved.rejection_reason.is_none());

        let pending_rows = storage
            .list_activities_by_status(ActivityStatus::Pending)
            .await
            .unwrap();
        assert!(pending_rows.is_empty());

        let missing = storage
            .review_activity(
                9999,
                Review {
                    status: ActivityStatus::Approved,
                    reviewer_id: prof.id,
                    rejection_reason: None,
                    at: Utc::now(),
                },
            )
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_certifications_filter_by_category() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let alice = seed_user(&storage, "alice@x.com", Role::Student).await;
        let bob = seed_user(&storage, "bob@x.com", Role::Student).await;

        insert_activity(&storage, alice.id, "HACKATHON", None).await;
        insert_activity(&storage, alice.id, CERT_COURSE, None).await;
        insert_activity(&storage, alice.id, CERT_INTERNSHIP, None).await;
        insert_activity(&storage, bob.id, CERT_COURSE, None).await;

        let certs = storage.list_certifications(alice.id).await.unwrap();
        assert_eq!(certs.len(), 2);
        assert!(certs.iter().all(|c| c.is_certification()));
        assert_eq!(storage.list_activities_by_student(alice.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_certificates_are_scoped_per_user() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let alice = seed_user(&storage, "alice@x.com", Role::Student).await;

        let created = storage
            .insert_certificate(certificate::ActiveModel {
                user_id: Set(alice.id),
                title: Set("AWS".into()),
                description: Set(None),
                kind: Set(Some("COURSE".into())),
                file_path: Set("certificate_1_x.pdf".into()),
                content_type: Set("application/pdf".into()),
                upload_date: Set(Utc::now()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(storage.list_certificates_by_user(alice.id).await.unwrap().len(), 1);
        assert_eq!(
            storage.find_certificate(created.id).await.unwrap().unwrap().title,
            "AWS"
        );

        storage.delete_certificate(created.id).await.unwrap();
        assert!(storage.find_certificate(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_access_coalescing_window() {
        let temp_dir = TempDir::new().unwrap();
        let storage = create_test_storage(&temp_dir).await;
        let prof = seed_user(&storage, "prof@x.com", Role::Faculty).await;
        let alice = seed_user(&storage, "alice@x.com", Role::Student).await;
        let r = seed_resource(&storage, prof.id, "resource_1_a.pdf", "Notes", "CSE").await;

        let start = Utc::now() - Duration::hours(2);
        let window = Duration::hours(1);
        let first = storage
            .record_access(alice.id, r.id, AccessType::Viewed, start, window)
            .await
            .unwrap();
        assert!(first.is_some());

        let repeat = storage
            .record_access(alice.id, r.id, AccessType::Viewed, start + Duration::minutes(10), window)
            .await
            .unwrap();
        assert!(repeat.is_none());

        let later = storage
            .record_access(alice.id, r.id, AccessType::Viewed, start + Duration::minutes(65), window)
            .await
            .unwrap();
        assert!(later.is_some());

        let history = storage.access_history(alice.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].accessed_at > history[1].accessed_at);
    }
}
