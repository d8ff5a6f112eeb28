//! Port for the revision-hosting service that knows about open change requests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::change_request::ChangeRequest;

#[derive(Debug, Clone, Error)]
pub enum HostingError {
    #[error("change request #{number} not found")]
    NotFound { number: u64 },
    #[error("revision-hosting API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("revision-hosting API unreachable: {0}")]
    Transport(String),
    #[error("failed to decode revision-hosting response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ChangeRequestSource: Send + Sync {
    /// All currently open change requests.
    async fn list_open(&self) -> Result<Vec<ChangeRequest>, HostingError>;

    /// One change request by number.
    async fn get(&self, number: u64) -> Result<ChangeRequest, HostingError>;
}
