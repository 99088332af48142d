//! FS API Server
//!
//! HTTP transport for the content engine: routing, the shared-secret
//! gate, and status code mapping.

pub mod error;
pub mod extractors;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use fsapi_core::{ContentEngine, Settings};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ContentEngine>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            engine: Arc::new(ContentEngine::from_settings(&settings)),
            settings: Arc::new(settings),
        }
    }
}

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let max_upload_size = state.settings.server.max_upload_size;

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // File routes, behind the shared secret
        .merge(file_routes(state.clone()))
        // Layers
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn file_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/files", file_methods())
        .route("/api/files/", file_methods())
        .route("/api/files/*path", file_methods())
        .route_layer(middleware::from_fn_with_state(
            state,
            extractors::require_auth_token,
        ))
}

fn file_methods() -> MethodRouter<AppState> {
    use handlers::files;

    get(files::get_content)
        .post(files::create_content)
        .put(files::perform_action)
        .patch(files::move_content)
        .delete(files::delete_content)
}
