//! Domain layer types and invariants.

pub mod artifacts;
pub mod change_request;
pub mod error;
pub mod revision;
pub mod types;
