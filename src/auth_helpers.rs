// ABOUTME: Authentication helper functions for session validation in endpoints
// ABOUTME: Resolves the presented token to a live session and its current user row

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

use crate::entities::user;
use crate::error::{AppError, Result};
use crate::{session, AppState};

pub fn validate_session(
    headers: &HeaderMap,
    jar: &CookieJar,
    state: &AppState,
) -> Result<(String, session::SessionData)> {
    session::extract_session(headers, jar, &state.sessions)
}

/// The user behind a valid session. A session whose user has since vanished is dropped.
pub async fn session_user(headers: &HeaderMap, jar: &CookieJar, state: &AppState) -> Result<user::Model> {
    let (token, session) = validate_session(headers, jar, state)?;
    match state.users.find_by_id(session.actor.id).await? {
        Some(user) => Ok(user),
        None => {
            state.sessions.remove_session(&token);
            Err(AppError::Unauthenticated("User not found".to_string()))
        }
    }
}
