use crate::application::{
    error::{ErrorReport, HttpError},
    index::{BranchEntry, ChangeEntry, IndexView},
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Plain-text 404 for paths no route claims.
pub fn render_not_found_response() -> Response {
    let mut response = (StatusCode::NOT_FOUND, "Not found").into_response();
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub changes: Vec<ChangeEntry>,
    pub branches: Vec<BranchEntry>,
    pub styled: bool,
    pub api_viewer_url: String,
}

impl From<IndexView> for IndexTemplate {
    fn from(view: IndexView) -> Self {
        Self {
            changes: view.changes,
            branches: view.branches,
            styled: view.styled,
            api_viewer_url: view.api_viewer_url,
        }
    }
}
