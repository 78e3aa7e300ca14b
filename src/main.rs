//! Math Tutor - self-assessment feedback for math students
//!
//! Students describe what they know about a topic; the server flags thin
//! answers, checks an optional pair of expressions for equivalence, and
//! asks an LLM for structured feedback and follow-up help.

mod algebra;
mod api;
mod auth;
mod config;
mod context;
mod gaps;
mod llm;
mod prompts;
mod tutor;

use api::{create_router, AppState, DynTutor};
use auth::CredentialVerifier;
use config::TutorConfig;
use context::{ContextStore, InMemoryContextStore, SqliteContextStore};
use llm::ModelRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor::{LlmClient, RegistryLlmClient, Tutor};

/// How often expired sessions are swept
const PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "math_tutor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = TutorConfig::from_env()?;

    let credentials = Arc::new(config.credentials()?);
    if credentials.is_empty() {
        tracing::warn!("TUTOR_USERS is empty. Every protected request will be rejected.");
    } else {
        tracing::info!(users = credentials.len(), "Credentials loaded");
    }

    // Session context storage
    let store: Arc<dyn ContextStore> = match &config.session_db {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening session database");
            Arc::new(SqliteContextStore::open(path)?)
        }
        None => {
            tracing::info!("Keeping session context in memory");
            Arc::new(InMemoryContextStore::new())
        }
    };

    if !config.session_ttl.is_zero() {
        spawn_purge_task(store.clone(), config.session_ttl)?;
    }

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));

    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API key configured. Set OPENAI_API_KEY.");
    }

    let llm: Arc<dyn LlmClient> = Arc::new(RegistryLlmClient::new(llm_registry));
    let tutor: DynTutor = Tutor::new(store, llm, config.tutor_settings());
    let verifier: Arc<dyn CredentialVerifier> = credentials;

    // Create application state
    let state = AppState::new(tutor, verifier);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Math tutor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop session contexts older than `ttl`
fn spawn_purge_task(
    store: Arc<dyn ContextStore>,
    ttl: Duration,
) -> Result<(), chrono::OutOfRangeError> {
    let ttl = chrono::Duration::from_std(ttl)?;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match store.purge_expired(ttl).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Purged expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session purge failed"),
            }
        }
    });
    Ok(())
}
