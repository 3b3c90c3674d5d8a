// ABOUTME: Startup configuration parsed from command-line flags and environment variables
// ABOUTME: A single Config value is built once and handed to every service constructor

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COHERE_BASE_URL: &str = "https://api.cohere.ai/v1";
pub const DEFAULT_FRAME_ANCESTORS: [&str; 3] =
    ["'self'", "http://localhost:3000", "http://localhost:5173"];

#[derive(Parser, Debug, Clone)]
#[command(name = "edusync", version, about = "EduSync learning-resource portal backend")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "EDUSYNC_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// SeaORM connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:edusync.db?mode=rwc")]
    pub database_url: String,

    /// Root directory for uploaded files (file.upload-dir)
    #[arg(long, env = "FILE_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Summarization API key (cohere.api.key); summaries run offline when unset
    #[arg(long, env = "COHERE_API_KEY")]
    pub cohere_api_key: Option<String>,

    /// Summarization API base URL (cohere.api.base-url)
    #[arg(long, env = "COHERE_API_BASE_URL", default_value = DEFAULT_COHERE_BASE_URL)]
    pub cohere_base_url: String,

    /// Upper bound on a single summarization request
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 30)]
    pub llm_timeout_secs: u64,

    /// Concurrent summarization requests allowed against the upstream quota
    #[arg(long, env = "LLM_MAX_CONCURRENCY", default_value_t = 4)]
    pub llm_max_concurrency: usize,

    /// Mark session cookies Secure (serve behind HTTPS)
    #[arg(long, env = "EDUSYNC_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Origins allowed to embed inline document views, comma separated
    #[arg(
        long,
        env = "EDUSYNC_FRAME_ANCESTORS",
        value_delimiter = ',',
        default_values = DEFAULT_FRAME_ANCESTORS
    )]
    pub frame_ancestors: Vec<String>,

    /// tracing EnvFilter directive
    #[arg(long, env = "RUST_LOG", default_value = "info,sqlx=warn,sea_orm=warn")]
    pub log_filter: String,
}

impl Config {
    /// Defaults with the given upload root and no API key. Used by tests and tooling.
    pub fn with_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        Config {
            bind: "127.0.0.1:0".to_string(),
            database_url: "sqlite::memory:".to_string(),
            upload_dir: upload_dir.into(),
            cohere_api_key: None,
            cohere_base_url: DEFAULT_COHERE_BASE_URL.to_string(),
            llm_timeout_secs: 30,
            llm_max_concurrency: 4,
            secure_cookies: false,
            frame_ancestors: DEFAULT_FRAME_ANCESTORS.map(str::to_string).to_vec(),
            log_filter: "info".to_string(),
        }
    }

    /// The API key when one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.cohere_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}
