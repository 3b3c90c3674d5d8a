// ABOUTME: Login sessions keyed by opaque UUID tokens, held in memory for 24 hours
// ABOUTME: Tokens travel as a Bearer header or an HttpOnly cookie

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::services::Actor;

pub const SESSION_COOKIE_NAME: &str = "edusync_session";
const SESSION_MAX_AGE: i64 = 24 * 60 * 60; // 24 hours

#[derive(Debug, Clone)]
pub struct SessionData {
    pub actor: Actor,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::seconds(SESSION_MAX_AGE)
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn create_session(&self, actor: Actor) -> String {
        self.create_session_at(actor, Utc::now())
    }

    fn create_session_at(&self, actor: Actor, created_at: DateTime<Utc>) -> String {
        let token = Uuid::new_v4().to_string();
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(token.clone(), SessionData { actor, created_at });
        }
        token
    }

    /// Returns the live session for `token`. Expired sessions are dropped on lookup.
    pub fn get_session(&self, token: &str) -> Option<SessionData> {
        let now = Utc::now();
        let found = self.sessions.read().ok()?.get(token).cloned()?;
        if found.expired(now) {
            self.remove_session(token);
            return None;
        }
        Some(found)
    }

    pub fn remove_session(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(token);
        }
    }

    pub fn cleanup_expired_sessions(&self) {
        let now = Utc::now();
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, session| !session.expired(now));
        }
    }
}

pub fn create_session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(SESSION_MAX_AGE))
        .path("/")
        .build()
}

pub fn create_logout_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(0))
        .path("/")
        .build()
}

/// The presented token: the Bearer header wins over the cookie.
pub fn presented_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    bearer.or_else(|| jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string()))
}

pub fn extract_session(
    headers: &HeaderMap,
    jar: &CookieJar,
    session_store: &SessionStore,
) -> Result<(String, SessionData)> {
    let token = presented_token(headers, jar)
        .ok_or_else(|| AppError::Unauthenticated("No session token provided".to_string()))?;
    let session = session_store
        .get_session(&token)
        .ok_or_else(|| AppError::Unauthenticated("Invalid or expired session".to_string()))?;
    Ok((token, session))
}
