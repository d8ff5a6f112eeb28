use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::{
    error::PreviewError, live::LiveCoordinator, preview::normalize_file_path,
};

use super::{
    file_response, health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct LiveState {
    pub coordinator: Arc<LiveCoordinator>,
    pub api_description_file: Arc<str>,
}

pub fn build_live_router(state: LiveState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(index))
        .route("/{*file}", get(file))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn healthz() -> Response {
    health_response()
}

async fn index(State(state): State<LiveState>) -> Response {
    serve(&state, "").await
}

async fn file(State(state): State<LiveState>, Path(file): Path<String>) -> Response {
    serve(&state, &file).await
}

/// Blocks until no regeneration is pending, then reads the fresh snapshot.
async fn serve(state: &LiveState, path: &str) -> Response {
    let artifacts = match state.coordinator.current().await {
        Ok(artifacts) => artifacts,
        Err(err) => return err.into_response(),
    };

    let requested = normalize_file_path(path);
    match artifacts.lookup(requested) {
        Some((name, body)) => file_response(name, body.clone(), &state.api_description_file),
        None => PreviewError::file_not_found(requested).into_response(),
    }
}
