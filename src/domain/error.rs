use thiserror::Error;

/// Why a string could not be accepted as a revision or a selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{what} must not be empty")]
    Empty { what: &'static str },
    #[error("revision id `{value}` contains whitespace")]
    Whitespace { value: String },
    #[error("change request number `{raw}` is out of range")]
    NumberOutOfRange { raw: String },
}

impl DomainError {
    pub fn empty(what: &'static str) -> Self {
        Self::Empty { what }
    }
}
