mod live;
mod middleware;
mod preview;

pub use live::{LiveState, build_live_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use preview::{PreviewState, build_preview_router};

use std::{future::Future, path::Path};

use axum::{
    body::Body,
    http::{
        HeaderValue, StatusCode,
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::Instrument;

use crate::application::error::{HttpError, PreviewError};

const FALLBACK_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub(crate) const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Serve one generated file; the API description also gets a permissive CORS header.
pub(crate) fn file_response(name: &str, bytes: Bytes, api_description_file: &str) -> Response {
    let content_type = mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE);
    let mut response = bytes_response(bytes, content_type);

    let is_api_description = Path::new(name)
        .file_name()
        .is_some_and(|file| file == api_description_file);
    if is_api_description {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
    response
}

pub(crate) fn bytes_response(bytes: Bytes, content_type: &str) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
}

pub(crate) fn health_response() -> Response {
    bytes_response(Bytes::from_static(b"ok"), PLAIN_TEXT)
}

/// 302 to `path`, carrying the original query string along.
pub(crate) fn redirect_found(path: &str, query: Option<&str>) -> Response {
    let location = match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    };
    match HeaderValue::try_from(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => HttpError::new(
            "infra::http::redirect_found",
            StatusCode::BAD_REQUEST,
            "Invalid redirect target",
            err.to_string(),
        )
        .into_response(),
    }
}

/// Run request work on its own task so a dropped connection does not cancel it.
pub(crate) async fn detached<F, T>(work: F) -> Result<T, PreviewError>
where
    F: Future<Output = Result<T, PreviewError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work.in_current_span())
        .await
        .map_err(|err| PreviewError::generation("request task did not complete", err))?
}
