// ABOUTME: Account endpoints: registration, password login, password reset, session check, logout
// ABOUTME: Login issues an opaque session token returned in the body and as an HttpOnly cookie

use axum::{extract::State, http::HeaderMap, response::Json};
use axum_extra::extract::cookie::CookieJar;

use crate::auth_helpers;
use crate::error::Result;
use crate::handlers::extract::ApiJson;
use crate::services::{users::Registration, Actor};
use crate::types::*;
use crate::{session, AppState};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Registration>,
) -> Result<Json<ApiResponse<RegisterResponse>>> {
    let user = state.users.register(req).await?;
    Ok(ApiResponse::ok(
        "Registration successful",
        RegisterResponse {
            user: UserView::from(&user),
            message: "Account created. You can now sign in.".to_string(),
        },
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    let user = state.users.authenticate(&req.email, &req.password).await?;
    let token = state.sessions.create_session(Actor::from(&user));
    let jar = jar.add(session::create_session_cookie(
        token.clone(),
        state.config.secure_cookies,
    ));
    tracing::info!("User {} signed in", user.id);

    Ok((
        jar,
        ApiResponse::ok(
            "Login successful",
            LoginResponse {
                user: UserView::from(&user),
                session_token: token,
                message: format!("Welcome back, {}!", user.first_name),
            },
        ),
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    state
        .users
        .reset_password_by_email(&req.email, &req.new_password)
        .await?;
    Ok(ApiResponse::message("Password has been reset successfully"))
}

pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Json<ApiResponse<UserEnvelope>>> {
    let user = auth_helpers::session_user(&headers, &jar, &state).await?;
    Ok(ApiResponse::ok(
        "Session valid",
        UserEnvelope {
            user: UserView::from(&user),
        },
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    if let Ok((token, _)) = auth_helpers::validate_session(&headers, &jar, &state) {
        state.sessions.remove_session(&token);
    }
    let jar = jar.add(session::create_logout_cookie());
    (jar, ApiResponse::message("Logged out"))
}
