//! Revision identifiers and the selectors that resolve to them.

use std::fmt;

use super::error::DomainError;
use super::types::RenderVariant;

/// An immutable point in source history, normally a full commit id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionRef(String);

impl RevisionRef {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::empty("revision id"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::Whitespace {
                value: trimmed.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for RevisionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache key for one generated artifact set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub revision: RevisionRef,
    pub variant: RenderVariant,
}

impl ArtifactKey {
    pub fn new(revision: RevisionRef, variant: RenderVariant) -> Self {
        Self { revision, variant }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.revision.short(), self.variant.as_str())
    }
}

/// What a request path names before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSelector {
    /// A numeric change-request (pull request) number.
    ChangeRequest(u64),
    /// The `head` alias for the default branch, matched case-insensitively.
    Head,
    /// A symbolic branch name, without the remote prefix.
    Branch(String),
}

impl RevisionSelector {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::empty("revision selector"));
        }

        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw
                .parse::<u64>()
                .map(Self::ChangeRequest)
                .map_err(|_| DomainError::NumberOutOfRange {
                    raw: raw.to_string(),
                });
        }

        if raw.eq_ignore_ascii_case("head") {
            return Ok(Self::Head);
        }

        Ok(Self::Branch(raw.to_string()))
    }
}

impl fmt::Display for RevisionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionSelector::ChangeRequest(number) => write!(f, "#{number}"),
            RevisionSelector::Head => f.write_str("HEAD"),
            RevisionSelector::Branch(name) => f.write_str(name),
        }
    }
}
