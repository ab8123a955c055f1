//! HTTP Server
//!
//! Axum application wiring: shared state, the `/api` route tree, and the
//! static file service for uploaded photos.

mod error;
mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ai::provider::{self, HuggingFaceDetector};
use crate::ai::{ChainConfig, ProviderChain, SharedProvider};
use crate::config::Config;
use crate::services::{ConversationService, RecognitionService, VideoSearchService};
use crate::storage::{Database, SessionStore, VocabularyStore};
use crate::types::Result;

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub vocabulary: Arc<VocabularyStore>,
    pub sessions: Arc<SessionStore>,
    pub recognition: Arc<RecognitionService>,
    pub conversation: Arc<ConversationService>,
    pub video: Arc<VideoSearchService>,
}

impl AppState {
    /// Wire the full application from configuration: database, provider
    /// chains, detector, and services.
    pub fn from_config(config: Config) -> Result<Self> {
        let db = Arc::new(Database::open(&config.database.path)?);
        db.initialize()?;

        let providers = &config.providers;
        let chat: SharedProvider = Arc::new(ProviderChain::new(
            provider::build_provider_order(&providers.chat_order, providers)?,
            ChainConfig::default(),
        ));
        let vision: SharedProvider = Arc::new(ProviderChain::new(
            provider::build_provider_order(&providers.vision_order, providers)?,
            ChainConfig::default(),
        ));
        let detector = Arc::new(HuggingFaceDetector::new(&providers.huggingface)?);
        let video = Arc::new(VideoSearchService::new(&config.video)?);

        Ok(Self {
            config: Arc::new(config),
            vocabulary: Arc::new(VocabularyStore::new(db.clone())),
            sessions: Arc::new(SessionStore::new(db)),
            recognition: Arc::new(RecognitionService::new(vision, chat.clone(), detector)),
            conversation: Arc::new(ConversationService::new(chat)),
            video,
        })
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let upload_dir = state.config.server.upload_dir.clone();

    let api = Router::new()
        .route("/upload-image", post(routes::images::upload_image))
        .route("/understand-image", post(routes::images::understand_image))
        .route("/segment-objects", post(routes::images::segment_objects))
        .route("/generate-word-info", post(routes::images::generate_word_info))
        .route(
            "/generate-conversation-themes",
            post(routes::images::generate_conversation_themes),
        )
        .route(
            "/vocabulary",
            get(routes::vocabulary::list).post(routes::vocabulary::add),
        )
        .route("/vocabulary/search", get(routes::vocabulary::search))
        .route("/vocabulary/export", get(routes::vocabulary::export))
        .route(
            "/vocabulary/{id}",
            get(routes::vocabulary::get_item)
                .put(routes::vocabulary::update)
                .delete(routes::vocabulary::delete_item),
        )
        .route(
            "/sessions",
            get(routes::sessions::list).post(routes::sessions::create),
        )
        .route("/sessions/{session_id}", delete(routes::sessions::delete_session))
        .route(
            "/sessions/{session_id}/messages",
            get(routes::sessions::get_messages).post(routes::sessions::send_message),
        )
        .route(
            "/recommend",
            get(routes::videos::recommend_query).post(routes::videos::recommend),
        );

    Router::new()
        .nest("/api", api)
        .nest_service("/static/uploads", ServeDir::new(upload_dir))
        .layer(DefaultBodyLimit::max(crate::constants::upload::MAX_IMAGE_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until shutdown.
pub async fn serve(config: Config) -> Result<()> {
    std::fs::create_dir_all(&config.server.upload_dir)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
