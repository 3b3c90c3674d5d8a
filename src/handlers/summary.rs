// ABOUTME: Summary endpoints: free-text generation, per-resource summaries and extraction probes
// ABOUTME: Resource summaries always answer, falling back to the offline summary

use axum::{
    extract::State,
    response::Json,
};
use chrono::Utc;

use crate::error::Result;
use crate::handlers::extract::{ApiJson, ApiPath};
use crate::summarizer::SummaryMode;
use crate::types::*;
use crate::AppState;

pub async fn generate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateSummaryRequest>,
) -> Result<Json<ApiResponse<GeneratedSummary>>> {
    let mode = SummaryMode::parse(req.mode.as_deref());
    let summary = state.summarizer.summarize(&req.text, mode).await?;
    Ok(ApiResponse::ok(
        "Summary generated successfully",
        GeneratedSummary {
            summary_length: summary.chars().count(),
            original_length: req.text.chars().count(),
            mode: mode.as_str(),
            summary,
        },
    ))
}

pub async fn summarize_resource(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<ResourceSummaryResponse>>> {
    let result = state.summarizer.summarize_resource(id).await?;
    Ok(ApiResponse::ok(
        "Resource summary generated successfully",
        ResourceSummaryResponse {
            resource_id: result.resource.id,
            resource_title: result.resource.title,
            summary_length: result.summary.chars().count(),
            summary: result.summary,
            ai_generated: result.ai_generated,
            cohere_configured: state.summarizer.is_configured(),
        },
    ))
}

/// The offline summary is always available, so any existing resource can be summarized.
pub async fn summary_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<SummaryStatus>>> {
    let resource = state.resources.find(id).await?;
    Ok(ApiResponse::ok(
        "Summary status retrieved successfully",
        SummaryStatus {
            resource_id: resource.id,
            resource_title: resource.title,
            file_name: resource.file_name,
            file_type: resource.file_type,
            cohere_configured: state.summarizer.is_configured(),
            can_generate_summary: true,
        },
    ))
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<SummaryHealth>> {
    ApiResponse::ok(
        "Summary service is healthy",
        SummaryHealth {
            status: "healthy",
            cohere_configured: state.summarizer.is_configured(),
            timestamp: Utc::now().timestamp_millis(),
        },
    )
}

pub async fn test_extraction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<ExtractionResult>>> {
    let content = state.summarizer.test_extraction(id).await?;
    Ok(ApiResponse::ok(
        "Content extraction test successful",
        ExtractionResult {
            resource_id: id,
            content_length: content.chars().count(),
            extracted_content: content,
        },
    ))
}
