use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{diff::DiffService, index::IndexService, preview::PreviewService},
    domain::types::RenderVariant,
    presentation::views::{IndexTemplate, render_not_found_response, render_template_response},
};

use super::{
    PLAIN_TEXT, bytes_response, detached, file_response, health_response,
    middleware::{log_responses, set_request_context},
    redirect_found,
};

const HTML: &str = "text/html; charset=utf-8";
const DEFAULT_REVISION_PATH: &str = "/spec/HEAD/";

#[derive(Clone)]
pub struct PreviewState {
    pub preview: Arc<PreviewService>,
    pub diffs: Arc<DiffService>,
    pub index: Arc<IndexService>,
    pub api_description_file: Arc<str>,
}

pub fn build_preview_router(state: PreviewState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/spec", get(spec_root))
        .route("/spec/", get(spec_root))
        .route("/spec/{revision}", get(add_trailing_slash))
        .route("/spec/{revision}/", get(revision_index))
        .route("/spec/{revision}/{*file}", get(revision_file))
        .route("/diff/rst/{number}", get(source_diff))
        .route("/diff/html/{number}", get(add_trailing_slash))
        .route("/diff/html/{number}/", get(html_diff_index))
        .route("/diff/html/{number}/{*file}", get(html_diff_file))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VariantQuery {
    styled: Option<String>,
}

impl VariantQuery {
    fn variant(&self) -> RenderVariant {
        RenderVariant::from_flag(self.styled.as_deref())
    }
}

async fn index(State(state): State<PreviewState>) -> Response {
    match state.index.index().await {
        Ok(view) => render_template_response(IndexTemplate::from(view), StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

async fn healthz() -> Response {
    health_response()
}

async fn fallback() -> Response {
    render_not_found_response()
}

async fn spec_root(uri: Uri) -> Response {
    redirect_found(DEFAULT_REVISION_PATH, uri.query())
}

/// Relative links inside generated documents only resolve under a directory path.
async fn add_trailing_slash(uri: Uri) -> Response {
    redirect_found(&format!("{}/", uri.path()), uri.query())
}

async fn revision_index(
    State(state): State<PreviewState>,
    Path(revision): Path<String>,
    Query(query): Query<VariantQuery>,
) -> Response {
    serve_file(state, revision, String::new(), query.variant()).await
}

async fn revision_file(
    State(state): State<PreviewState>,
    Path((revision, file)): Path<(String, String)>,
    Query(query): Query<VariantQuery>,
) -> Response {
    serve_file(state, revision, file, query.variant()).await
}

async fn serve_file(
    state: PreviewState,
    revision: String,
    file: String,
    variant: RenderVariant,
) -> Response {
    let preview = Arc::clone(&state.preview);
    let served = detached(async move { preview.file(&revision, variant, &file).await }).await;
    match served {
        Ok(served) => file_response(&served.name, served.body, &state.api_description_file),
        Err(err) => err.into_response(),
    }
}

async fn source_diff(State(state): State<PreviewState>, Path(number): Path<u64>) -> Response {
    let diffs = Arc::clone(&state.diffs);
    match detached(async move { diffs.source_diff(number).await }).await {
        Ok(diff) => bytes_response(diff, PLAIN_TEXT),
        Err(err) => err.into_response(),
    }
}

async fn html_diff_index(State(state): State<PreviewState>, Path(number): Path<u64>) -> Response {
    html_diff(state, number, String::new()).await
}

async fn html_diff_file(
    State(state): State<PreviewState>,
    Path((number, file)): Path<(u64, String)>,
) -> Response {
    html_diff(state, number, file).await
}

async fn html_diff(state: PreviewState, number: u64, file: String) -> Response {
    let diffs = Arc::clone(&state.diffs);
    match detached(async move { diffs.html_diff(number, &file).await }).await {
        Ok(diff) => bytes_response(diff, HTML),
        Err(err) => err.into_response(),
    }
}
