// ABOUTME: Document summarization against the Cohere generate API with an offline fallback
// ABOUTME: Resource summaries extract file text first and degrade to a deterministic basic summary

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::blob_store::BlobStore;
use crate::config::Config;
use crate::entities::resource;
use crate::error::{AppError, Result};
use crate::extractor;
use crate::storage::Storage;

pub const MAX_PROMPT_INPUT_CHARS: usize = 4000;
const MODEL: &str = "command";
const STOP_SEQUENCES: [&str; 2] = ["---", "\n\n---"];

const INSTRUCTION: &str = "Please provide a comprehensive educational summary of the following material. \
Focus on:\n\
1. Key concepts and definitions\n\
2. Main topics and themes\n\
3. Important examples and applications\n\
4. Learning objectives and takeaways\n\
5. Practical insights for students\n\n\
Make the summary educational and informative, helping students understand what they will learn from this material:\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    Quick,
    #[default]
    Standard,
    Detailed,
}

impl SummaryMode {
    /// Unknown or missing modes fall back to `standard`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("quick") => SummaryMode::Quick,
            Some("detailed") => SummaryMode::Detailed,
            _ => SummaryMode::Standard,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            SummaryMode::Quick => 200,
            SummaryMode::Standard => 500,
            SummaryMode::Detailed => 800,
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            SummaryMode::Quick => 0.2,
            SummaryMode::Standard => 0.3,
            SummaryMode::Detailed => 0.4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Quick => "quick",
            SummaryMode::Standard => "standard",
            SummaryMode::Detailed => "detailed",
        }
    }
}

/// Body of `POST {base}/generate`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub k: u32,
    pub p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop_sequences: Vec<String>,
}

impl GenerateRequest {
    pub fn new(text: &str, mode: SummaryMode) -> Self {
        GenerateRequest {
            model: MODEL.to_string(),
            prompt: build_prompt(text),
            max_tokens: mode.max_tokens(),
            temperature: mode.temperature(),
            k: 0,
            p: 0.75,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop_sequences: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

pub fn truncate_input(text: &str) -> String {
    if text.chars().count() <= MAX_PROMPT_INPUT_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_PROMPT_INPUT_CHARS - 1).collect();
    cut.push('…');
    cut
}

pub fn build_prompt(text: &str) -> String {
    format!("{}{}\n\nSummary:", INSTRUCTION, truncate_input(text))
}

/// Produces generated text for a fully-formed request.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String>;
}

pub struct CohereClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    permits: Arc<Semaphore>,
}

impl CohereClient {
    /// Builds a client when an API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(config.llm_timeout())
            .build()?;
        Ok(Some(CohereClient {
            http,
            base_url: config.cohere_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            permits: Arc::new(Semaphore::new(config.llm_max_concurrency.max(1))),
        }))
    }
}

#[async_trait]
impl TextGenerator for CohereClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("Summarizer rate limiter closed: {}", e)))?;

        let response = self
            .http
            .post(format!("{}/generate", self.base_url))
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_client_error() {
            return Err(AppError::UpstreamClientError { status: status.as_u16(), body });
        }
        if status.is_server_error() {
            return Err(AppError::UpstreamServerError { status: status.as_u16(), body });
        }
        if !status.is_success() {
            return Err(AppError::UpstreamProtocolError(format!(
                "Unexpected response status {}",
                status
            )));
        }

        parse_generation(&body)
    }
}

fn parse_generation(body: &str) -> Result<String> {
    let parsed: GenerateResponse = serde_json::from_str(body)?;
    parsed
        .generations
        .into_iter()
        .next()
        .map(|g| g.text.trim().to_string())
        .ok_or_else(|| AppError::UpstreamProtocolError("Response has no generations".to_string()))
}

/// A resource summary, the resource it describes, and whether the language model produced it.
#[derive(Debug, Clone)]
pub struct ResourceSummary {
    pub resource: resource::Model,
    pub summary: String,
    pub ai_generated: bool,
}

pub struct Summarizer {
    storage: Arc<Storage>,
    blobs: BlobStore,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Summarizer {
    pub fn new(
        storage: Arc<Storage>,
        blobs: BlobStore,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        Self { storage, blobs, generator }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Summarizes `text` online. Fails with `NotConfigured` when no API key is set.
    pub async fn summarize(&self, text: &str, mode: SummaryMode) -> Result<String> {
        if text.trim().is_empty() {
            return Err(AppError::validation("text", "Text content is required"));
        }
        let generator = self.generator.as_ref().ok_or(AppError::NotConfigured)?;
        let request = GenerateRequest::new(text, mode);
        generator.generate(&request).await
    }

    /// Summarizes a stored resource, degrading to the offline summary when the
    /// file cannot be read or the upstream call fails.
    pub async fn summarize_resource(&self, resource_id: i64) -> Result<ResourceSummary> {
        let resource = self.find_resource(resource_id).await?;

        let source = match self.extract_resource_text(&resource).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Error extracting file content for resource {}: {}",
                    resource_id,
                    e
                );
                fallback_text(&resource)
            }
        };

        if self.generator.is_some() {
            match self.summarize(&source, SummaryMode::Standard).await {
                Ok(summary) => {
                    return Ok(ResourceSummary {
                        resource,
                        summary,
                        ai_generated: true,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Summarization failed for resource {}, using basic summary: {}",
                        resource_id,
                        e
                    );
                }
            }
        }

        Ok(ResourceSummary {
            summary: basic_summary(&source, &resource),
            resource,
            ai_generated: false,
        })
    }

    /// Extracted text for a resource, without summarizing it.
    pub async fn test_extraction(&self, resource_id: i64) -> Result<String> {
        let resource = self.find_resource(resource_id).await?;
        self.extract_resource_text(&resource).await
    }

    async fn find_resource(&self, resource_id: i64) -> Result<resource::Model> {
        self.storage
            .find_resource(resource_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource not found with ID: {}", resource_id)))
    }

    async fn extract_resource_text(&self, resource: &resource::Model) -> Result<String> {
        let path = self.blobs.path_of(&resource.file_name)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!("File not found: {}", resource.file_name)));
        }
        if !extractor::supported(path.clone()).await {
            return Err(AppError::ExtractionFailed(format!(
                "File type not supported for text extraction: {}",
                resource.file_type
            )));
        }

        let text = extractor::extract_text(path).await?;
        if text.trim().is_empty() {
            return Err(AppError::ExtractionFailed(
                "No text content could be extracted from the file".to_string(),
            ));
        }
        tracing::info!(
            "Extracted {} characters from resource {}",
            text.chars().count(),
            resource.id
        );
        Ok(text)
    }
}

/// Metadata-only text used when the file itself yields nothing.
pub fn fallback_text(resource: &resource::Model) -> String {
    let mut text = String::new();
    if !resource.title.trim().is_empty() {
        text.push_str(&format!("Title: {}\n\n", resource.title));
    }
    if !resource.description.trim().is_empty() {
        text.push_str(&format!("Description: {}\n\n", resource.description));
    }
    text.push_str(&format!("File Type: {}\n\n", resource.file_type));
    text.push_str(
        "Note: This summary is based on the resource metadata only, as the file content could not be extracted.",
    );
    text
}

/// Deterministic summary built from the first three sentences of `content`.
pub fn basic_summary(content: &str, resource: &resource::Model) -> String {
    let mut summary = String::from("📚 **Content Summary**\n\n");
    summary.push_str(&format!("**Title:** {}\n\n", resource.title));

    summary.push_str("**Key Content:**\n");
    for sentence in sentence_splitter().split(content).take(3) {
        let sentence = sentence.trim();
        if sentence.chars().count() > 10 {
            summary.push_str(&format!("• {}.\n", sentence));
        }
    }

    let file_type = if resource.file_type.trim().is_empty() {
        "Unknown"
    } else {
        resource.file_type.as_str()
    };
    summary.push_str("\n**File Information:**\n");
    summary.push_str(&format!("• File Type: {}\n", file_type));
    summary.push_str(&format!("• Content Length: {} characters\n", content.chars().count()));
    summary.push_str(
        "\n*Note: This is a basic summary. For AI-powered analysis, please configure the Cohere API key.*",
    );
    summary
}

fn sentence_splitter() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"[.!?]+").expect("valid sentence regex"))
}
