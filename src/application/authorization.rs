//! Gate in front of generation for revisions proposed by outside authors.
//!
//! Generating a change request runs the generator checked into that change
//! request, so only authors on the configured allow-list get that far.
//! Branches of the canonical repository never pass through here.

use std::collections::HashSet;

use tracing::warn;

use crate::config::AuthorizationSettings;
use crate::domain::change_request::ChangeRequest;

use super::error::PreviewError;

const SOURCE: &str = "application::authorization";

#[derive(Debug, Clone, Default)]
pub struct TrustedAuthors {
    logins: HashSet<String>,
}

impl TrustedAuthors {
    pub fn new<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            logins: logins
                .into_iter()
                .map(|login| normalize(login.as_ref()))
                .filter(|login| !login.is_empty())
                .collect(),
        }
    }

    pub fn from_settings(settings: &AuthorizationSettings) -> Self {
        Self::new(&settings.trusted_authors)
    }

    /// Logins are compared case-insensitively, as the hosting service does.
    pub fn is_trusted(&self, login: &str) -> bool {
        self.logins.contains(&normalize(login))
    }

    /// Reject a change request whose author is not on the allow-list.
    pub fn authorize(&self, change: &ChangeRequest) -> Result<(), PreviewError> {
        if self.is_trusted(&change.author.login) {
            return Ok(());
        }
        warn!(
            target = SOURCE,
            op = "authorize",
            result = "rejected",
            change_request = change.number,
            author = %change.author.login,
            "Refusing to generate change request from untrusted author"
        );
        Err(PreviewError::Unauthorized {
            number: change.number,
            author: change.author.login.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

fn normalize(login: &str) -> String {
    login.trim().to_ascii_lowercase()
}
