// ABOUTME: Main entry point for the EduSync portal backend
// ABOUTME: Wires configuration, storage and services into the axum router and serves it

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

mod auth;
mod auth_helpers;
mod blob_store;
mod config;
mod entities;
mod error;
mod extractor;
mod handlers;
mod middleware;
mod migration;
mod services;
mod session;
mod storage;
mod summarizer;
mod types;

#[cfg(test)]
mod storage_tests;
#[cfg(test)]
mod test_support;

use blob_store::{BlobStore, MAX_RESOURCE_BYTES};
use config::Config;
use services::{
    AccessTracker, ActivityService, CertificateService, PortfolioAggregator, ResourceService,
    UserDirectory,
};
use session::SessionStore;
use storage::Storage;
use summarizer::{CohereClient, Summarizer, TextGenerator};

/// Multipart framing on top of the largest accepted file.
const BODY_LIMIT_BYTES: usize = MAX_RESOURCE_BYTES as usize + 1024 * 1024;
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub blobs: BlobStore,
    pub sessions: SessionStore,
    pub users: UserDirectory,
    pub resources: ResourceService,
    pub activities: ActivityService,
    pub certificates: CertificateService,
    pub portfolio: PortfolioAggregator,
    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<Storage>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> error::Result<Self> {
        let blobs = BlobStore::new(&config.upload_dir)?;
        let users = UserDirectory::new(storage.clone());
        let tracker = AccessTracker::new(storage.clone());

        Ok(AppState {
            blobs: blobs.clone(),
            sessions: SessionStore::new(),
            resources: ResourceService::new(storage.clone(), blobs.clone(), users.clone(), tracker),
            activities: ActivityService::new(storage.clone(), blobs.clone(), users.clone()),
            certificates: CertificateService::new(storage.clone(), blobs.clone(), users.clone()),
            portfolio: PortfolioAggregator::new(storage.clone(), users.clone()),
            summarizer: Arc::new(Summarizer::new(storage, blobs, generator)),
            users,
            config: Arc::new(config),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    use handlers::{activities, certificates, certifications, portfolio, resources, summary, users};

    let config = state.config.clone();

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/session", get(auth::session))
        .route("/auth/logout", post(auth::logout))
        .route("/api/user/profile", get(users::profile))
        .route("/api/user/profile/update", post(users::update_profile))
        .route(
            "/api/user/profile-picture",
            post(users::upload_picture).delete(users::remove_picture),
        )
        .route("/api/resources/upload", post(resources::upload))
        .route("/api/resources/list", get(resources::list))
        .route("/api/resources/filter", get(resources::list))
        .route("/api/resources/my-resources", get(resources::my_resources))
        .route("/api/resources/recent", get(resources::recent))
        .route("/api/resources/health", get(resources::health))
        .route("/api/resources/download/:id", get(resources::download))
        .route("/api/resources/view/:id", get(resources::view))
        .route(
            "/api/resources/:id",
            get(resources::get_resource)
                .put(resources::update)
                .delete(resources::delete_resource),
        )
        .route("/api/resources/:id/summarize", post(summary::summarize_resource))
        .route("/api/resources/:id/summary-status", get(summary::summary_status))
        .route("/api/activities/submit", post(activities::submit))
        .route("/api/activities/my", get(activities::my_activities))
        .route("/api/activities/pending", get(activities::pending))
        .route("/api/activities/:id/approve", post(activities::approve))
        .route("/api/activities/:id/reject", post(activities::reject))
        .route("/certifications/upload", post(certifications::upload))
        .route("/certifications/my", get(certifications::my_certifications))
        .route("/certifications/:id", delete(certifications::delete_certification))
        .route("/api/certificates/upload", post(certificates::upload))
        .route("/api/certificates/my", get(certificates::my_certificates))
        .route("/api/certificates/:id", delete(certificates::delete_certificate))
        .route("/api/certificates/view/:id", get(certificates::view))
        .route("/api/certificates/download/:id", get(certificates::download))
        .route("/api/portfolio/summary", get(portfolio::summary))
        .route("/api/summary/generate", post(summary::generate))
        .route("/api/summary/resource/:id", post(summary::summarize_resource))
        .route("/api/summary/health", get(summary::health))
        .route("/api/summary/test-extraction/:id", post(summary::test_extraction))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum_middleware::from_fn_with_state(config, middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(config.log_filter.as_str())
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%dT%H:%M:%S".to_string(),
        ))
        .init();

    let storage = Arc::new(Storage::connect(&config.database_url).await?);
    tracing::info!("Database ready at {}", config.database_url);

    let generator = CohereClient::from_config(&config)?
        .map(|client| Arc::new(client) as Arc<dyn TextGenerator>);
    if generator.is_none() {
        tracing::warn!("COHERE_API_KEY is not set; resource summaries will use the offline summary");
    }

    let bind = config.bind.clone();
    let state = AppState::new(config, storage, generator)?;

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sessions.cleanup_expired_sessions();
        }
    });

    let app = build_router(state);
    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("EduSync listening on http://{}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}
