// ABOUTME: User directory: registration, login, password reset, profile edits and actor resolution
// ABOUTME: Emails are stored lower-cased so every lookup is case-insensitive

use base64::Engine;
use chrono::Utc;
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::blob_store::MAX_PROFILE_PICTURE_BYTES;
use crate::entities::user::{self, Role};
use crate::error::{AppError, FieldErrors, Result};
use crate::storage::{ProfileChanges, Storage};

const MAX_NAME_CHARS: usize = 50;
const MIN_PASSWORD_CHARS: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// The caller of a service operation, resolved from the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
    pub email: String,
}

impl From<&user::Model> for Actor {
    fn from(model: &user::Model) -> Self {
        Actor {
            id: model.id,
            role: model.role,
            email: model.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"))
}

fn check_name(fields: &mut FieldErrors, field: &str, label: &str, value: &str) {
    if value.trim().is_empty() {
        fields.insert(field.to_string(), format!("{} is required", label));
    } else if value.trim().chars().count() > MAX_NAME_CHARS {
        fields.insert(
            field.to_string(),
            format!("{} must not exceed {} characters", label, MAX_NAME_CHARS),
        );
    }
}

fn check_password(fields: &mut FieldErrors, field: &str, value: &str) {
    if value.chars().count() < MIN_PASSWORD_CHARS {
        fields.insert(
            field.to_string(),
            format!("Password must be at least {} characters", MIN_PASSWORD_CHARS),
        );
    }
}

#[derive(Clone)]
pub struct UserDirectory {
    storage: Arc<Storage>,
}

impl UserDirectory {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn register(&self, registration: Registration) -> Result<user::Model> {
        let mut fields = FieldErrors::new();
        check_name(&mut fields, "firstName", "First name", &registration.first_name);
        check_name(&mut fields, "lastName", "Last name", &registration.last_name);

        let email = normalize_email(&registration.email);
        if email.is_empty() {
            fields.insert("email".into(), "Email is required".into());
        } else if !email_pattern().is_match(&email) {
            fields.insert("email".into(), "Email should be valid".into());
        }
        check_password(&mut fields, "password", &registration.password);

        let role = Role::parse(&registration.role);
        if registration.role.trim().is_empty() {
            fields.insert("role".into(), "Role is required".into());
        } else if role.is_none() {
            fields.insert(
                "role".into(),
                "Invalid role. Must be 'student' or 'faculty'".into(),
            );
        }

        let role = match role {
            Some(role) if fields.is_empty() => role,
            _ => return Err(AppError::Validation(fields)),
        };

        let now = Utc::now();
        let created = self
            .storage
            .insert_user(user::ActiveModel {
                first_name: Set(registration.first_name.trim().to_string()),
                last_name: Set(registration.last_name.trim().to_string()),
                email: Set(email),
                password: Set(registration.password),
                role: Set(role),
                profile_picture: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                last_login: Set(None),
                is_active: Set(true),
                ..Default::default()
            })
            .await?;

        tracing::info!("Registered {} user {}", created.role, created.id);
        Ok(created)
    }

    /// Checks credentials and stamps `last_login`. Every failure reads the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model> {
        let found = self.find_by_email(email).await?;
        let user = match found {
            Some(user) if user.is_active && user.password == password => user,
            _ => {
                tracing::warn!("Rejected login attempt");
                return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
            }
        };

        self.storage.record_login(user.id, Utc::now()).await
    }

    pub async fn reset_password_by_email(&self, email: &str, new_password: &str) -> Result<()> {
        let mut fields = FieldErrors::new();
        check_password(&mut fields, "newPassword", new_password);
        if !fields.is_empty() {
            return Err(AppError::Validation(fields));
        }

        let user = self.find_by_email(email).await?.ok_or_else(|| {
            AppError::NotFound("No account found with this email address".to_string())
        })?;
        self.storage.update_password(user.id, new_password).await?;
        tracing::info!("Password reset for user {}", user.id);
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        self.storage.find_user_by_email(&normalize_email(email)).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<user::Model>> {
        self.storage.find_user_by_id(id).await
    }

    pub async fn find_by_role(&self, role: Role) -> Result<Vec<user::Model>> {
        self.storage.find_users_by_role(role).await
    }

    /// Resolves an actor email to its user row. Unknown emails are unauthenticated.
    pub async fn require_user(&self, email: &str) -> Result<user::Model> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User not found".to_string()))
    }

    pub async fn resolve(&self, email: &str) -> Result<Actor> {
        let user = self.require_user(email).await?;
        Ok(Actor::from(&user))
    }

    /// Resolves an actor and insists on `role`, using `denied` as the 403 message.
    pub async fn require_role(&self, email: &str, role: Role, denied: &str) -> Result<Actor> {
        let actor = self.resolve(email).await?;
        if actor.role != role {
            return Err(AppError::Forbidden(denied.to_string()));
        }
        Ok(actor)
    }

    pub async fn profile(&self, email: &str) -> Result<user::Model> {
        self.require_user(email).await
    }

    pub async fn update_profile(
        &self,
        email: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<user::Model> {
        let user = self.require_user(email).await?;

        let mut fields = FieldErrors::new();
        if let Some(first) = &first_name {
            check_name(&mut fields, "firstName", "First name", first);
        }
        if let Some(last) = &last_name {
            check_name(&mut fields, "lastName", "Last name", last);
        }
        if !fields.is_empty() {
            return Err(AppError::Validation(fields));
        }

        self.storage
            .update_profile(
                user.id,
                ProfileChanges {
                    first_name: first_name.map(|v| v.trim().to_string()),
                    last_name: last_name.map(|v| v.trim().to_string()),
                    profile_picture: None,
                },
            )
            .await
    }

    /// Stores an image inline as a `data:` URI and returns it.
    pub async fn set_profile_picture(
        &self,
        email: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let user = self.require_user(email).await?;

        if bytes.is_empty() {
            return Err(AppError::EmptyFile);
        }
        if bytes.len() as u64 > MAX_PROFILE_PICTURE_BYTES {
            return Err(AppError::TooLarge {
                limit: MAX_PROFILE_PICTURE_BYTES,
            });
        }
        if !content_type.starts_with("image/") {
            return Err(AppError::UnsupportedMedia(
                "Only image files are allowed".to_string(),
            ));
        }

        let data_uri = format!(
            "data:{};base64,{}",
            content_type,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );
        self.storage
            .update_profile(
                user.id,
                ProfileChanges {
                    profile_picture: Some(Some(data_uri.clone())),
                    ..Default::default()
                },
            )
            .await?;
        Ok(data_uri)
    }

    pub async fn clear_profile_picture(&self, email: &str) -> Result<()> {
        let user = self.require_user(email).await?;
        if user.profile_picture.is_some() {
            self.storage
                .update_profile(
                    user.id,
                    ProfileChanges {
                        profile_picture: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(())
    }
}
