use std::{error::Error as StdError, io, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::hosting::HostingError,
    cache::FlightAborted,
    config::LoadError,
    domain::error::DomainError,
    infra::{
        error::InfraError,
        generator::GeneratorError,
        git::RepositoryError,
        process::ProcessError,
        workspace::ProvisionError,
    },
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            let message = inner.to_string();
            // Transparent wrappers repeat their inner message.
            if messages.last() != Some(&message) {
                messages.push(message);
            }
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Error response whose body is a fixed public message; the detail only
/// reaches the logs through the attached [`ErrorReport`].
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Why a request could not be mapped onto a revision or a file.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("invalid revision `{raw}`: {source}")]
    InvalidRevision {
        raw: String,
        #[source]
        source: DomainError,
    },
    #[error("invalid branch name `{name}`")]
    InvalidBranch { name: String },
    #[error("unknown branch `{name}`: {detail}")]
    UnknownBranch { name: String, detail: String },
    #[error("change request #{number} not found")]
    UnknownChangeRequest { number: u64 },
    #[error("change request #{number} has no usable {side} commit")]
    MissingCommit { number: u64, side: &'static str },
    #[error("{path} not found")]
    FileNotFound { path: String },
}

/// Every failure a preview or diff request can end in.
///
/// Clonable so one failed generation can be handed to every request that was
/// waiting on it.
#[derive(Debug, Clone, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("change request #{number} was opened by `{author}`, who is not a trusted author")]
    Unauthorized { number: u64, author: String },
    #[error("{context}")]
    Generation {
        context: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("revision-hosting API request failed")]
    Upstream(#[source] HostingError),
    #[error("{context} timed out")]
    Timeout {
        context: String,
        #[source]
        source: ProcessError,
    },
    #[error("service misconfigured: {0}")]
    Misconfigured(String),
}

impl PreviewError {
    pub fn generation(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Generation {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::Misconfigured(message.into())
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::Resolution(ResolutionError::FileNotFound { path: path.into() })
    }

    /// Classify a failed external command, keeping timeouts distinct.
    pub fn from_process(context: impl Into<String>, error: ProcessError) -> Self {
        match error {
            ProcessError::Timeout { .. } => Self::Timeout {
                context: context.into(),
                source: error,
            },
            other => Self::generation(context, other),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PreviewError::Resolution(ResolutionError::InvalidRevision { .. }) => {
                StatusCode::BAD_REQUEST
            }
            PreviewError::Resolution(_) => StatusCode::NOT_FOUND,
            PreviewError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            PreviewError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PreviewError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PreviewError::Generation { .. }
            | PreviewError::Io { .. }
            | PreviewError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PreviewError::Resolution(_) => "resolution",
            PreviewError::Unauthorized { .. } => "unauthorized",
            PreviewError::Generation { .. } => "generation",
            PreviewError::Io { .. } => "io",
            PreviewError::Upstream(_) => "upstream",
            PreviewError::Timeout { .. } => "timeout",
            PreviewError::Misconfigured(_) => "misconfigured",
        }
    }
}

impl From<HostingError> for PreviewError {
    fn from(error: HostingError) -> Self {
        match error {
            HostingError::NotFound { number } => {
                ResolutionError::UnknownChangeRequest { number }.into()
            }
            other => PreviewError::Upstream(other),
        }
    }
}

impl From<RepositoryError> for PreviewError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::UnknownRevision { name, detail } => {
                ResolutionError::UnknownBranch { name, detail }.into()
            }
            RepositoryError::Command(err) => PreviewError::from_process("repository query", err),
        }
    }
}

impl From<GeneratorError> for PreviewError {
    fn from(error: GeneratorError) -> Self {
        match error {
            GeneratorError::Process(err) => PreviewError::from_process("generator", err),
            GeneratorError::Output { path, source } => PreviewError::Io {
                context: format!("failed to read generator output at {path}"),
                source,
            },
            GeneratorError::EmptyCommand(name) => {
                PreviewError::misconfigured(format!("{name} command is empty"))
            }
        }
    }
}

impl From<ProvisionError> for PreviewError {
    fn from(error: ProvisionError) -> Self {
        match error {
            ProvisionError::Workspace { ref source, .. } => PreviewError::Io {
                context: error.to_string(),
                source: Arc::clone(source),
            },
            ProvisionError::Clone(err) => PreviewError::from_process("cloning workspace", err),
            ProvisionError::Checkout { revision, source } => {
                PreviewError::from_process(format!("checking out {revision}"), source)
            }
            ProvisionError::Generate { source, .. } => source.into(),
        }
    }
}

impl From<FlightAborted> for PreviewError {
    fn from(error: FlightAborted) -> Self {
        PreviewError::generation("generation task", error)
    }
}

impl IntoResponse for PreviewError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let report = ErrorReport::from_error("application::error::PreviewError", status, &self);
        let body = report.messages.join("\n");
        let mut response = (status, body).into_response();
        report.attach(&mut response);
        response
    }
}

/// Top-level failure of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
