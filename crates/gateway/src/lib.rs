//! SalesForge API Gateway
//!
//! The entry point for all external API requests. Handles:
//! - Authentication (register/login, Bearer tokens)
//! - CSV upload intake and synchronous validation
//! - Dataset views: list, status polling, detail, export
//! - Observability (logging, metrics, tracing)

pub mod handlers;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, post},
    Router,
};
use salesforge_common::{auth::JwtManager, config::AppConfig, db::Repository};
use salesforge_ingestion::JobQueue;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub queue: JobQueue,
    pub jwt: Arc<JwtManager>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let body_limit = DefaultBodyLimit::max(state.config.upload.max_upload_bytes);

    // API routes
    let api_routes = Router::new()
        // Auth endpoints
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
        // Upload endpoint
        .route("/upload", post(handlers::datasets::upload))
        // Dataset endpoints
        .route("/datasets", get(handlers::datasets::list_datasets))
        .route("/datasets/{id}", get(handlers::datasets::get_dataset))
        .route("/datasets/{id}", delete(handlers::datasets::delete_dataset))
        .route(
            "/datasets/{id}/status",
            get(handlers::datasets::get_dataset_status),
        )
        .route(
            "/datasets/{id}/export",
            get(handlers::datasets::export_dataset),
        );

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .layer(body_limit)
        .with_state(state)
}
