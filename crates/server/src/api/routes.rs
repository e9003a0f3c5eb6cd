use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

use super::{convert, files, handlers, jobs};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let output_dir = state.config().storage.output_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Conversions
        .route("/convert", post(convert::convert))
        .route("/convert/async", post(convert::convert_async))
        .route("/extract-audio", post(convert::extract_audio))
        .route("/resize", post(convert::resize))
        .route("/trim", post(convert::trim))
        .route("/rotate", post(convert::rotate))
        .route("/thumbnail", post(convert::thumbnail))
        // Jobs
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        // Uploaded files
        .route("/upload", post(files::upload_file))
        .route("/files", get(files::list_files))
        .route("/files/{id}", delete(files::delete_file))
        .route("/files/{id}/metadata", get(files::file_metadata))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        // Conversion outputs are served straight from the output directory
        .nest_service("/output", ServeDir::new(output_dir))
        .layer(middleware::from_fn(super::middleware::metrics_middleware))
}
