// ABOUTME: Portfolio summary endpoint

use axum::{
    extract::State,
    response::Json,
};

use crate::error::Result;
use crate::handlers::extract::ApiQuery;
use crate::services::portfolio::Portfolio;
use crate::types::*;
use crate::AppState;

pub async fn summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserEmailQuery>,
) -> Result<Json<ApiResponse<Portfolio>>> {
    let portfolio = state.portfolio.summary(&query.user_email).await?;
    Ok(ApiResponse::ok("Portfolio summary generated", portfolio))
}
