// ABOUTME: Shared fixtures for unit tests: temp-dir databases, blob stores and seeded rows
// ABOUTME: Compiled only under cfg(test)

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tempfile::TempDir;

use crate::blob_store::BlobStore;
use crate::entities::{resource, user, user::Role};
use crate::storage::Storage;

pub async fn create_test_storage(dir: &TempDir) -> Arc<Storage> {
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    Arc::new(Storage::connect(&db_url).await.unwrap())
}

pub fn create_test_blobs(dir: &TempDir) -> BlobStore {
    BlobStore::new(dir.path().join("uploads")).unwrap()
}

pub async fn seed_user(storage: &Storage, email: &str, role: Role) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        email: Set(email.to_lowercase()),
        password: Set("pw123456".to_string()),
        role: Set(role),
        profile_picture: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        last_login: Set(None),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(&storage.db)
    .await
    .unwrap()
}

pub async fn seed_resource(
    storage: &Storage,
    uploader_id: i64,
    key: &str,
    title: &str,
    branch: &str,
) -> resource::Model {
    resource::ActiveModel {
        title: Set(title.to_string()),
        description: Set("Seeded resource".to_string()),
        file_name: Set(key.to_string()),
        file_size: Set(0),
        file_type: Set("text/plain".to_string()),
        uploaded_by: Set(uploader_id),
        uploaded_at: Set(Utc::now()),
        branch: Set(branch.to_string()),
        subject: Set(None),
        ..Default::default()
    }
    .insert(&storage.db)
    .await
    .unwrap()
}
