//! Request-level orchestration: selector → revision → artifacts → file.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::{
    config::RepositorySettings,
    domain::{
        artifacts::INDEX_FILE,
        change_request::ChangeRequest,
        revision::{ArtifactKey, RevisionRef, RevisionSelector},
        types::RenderVariant,
    },
    infra::git::SharedRepository,
};

use super::{
    authorization::TrustedAuthors,
    error::{PreviewError, ResolutionError},
    generation::ArtifactService,
    hosting::ChangeRequestSource,
};

const SOURCE: &str = "application::preview";

/// One file out of a generated artifact set.
#[derive(Debug, Clone)]
pub struct ServedFile {
    /// Name of the entry actually served, which differs from the request when
    /// the legacy index stood in for the modern one.
    pub name: String,
    pub body: Bytes,
}

/// Resolves revision selectors, enforcing the branch policy and the
/// authorization gate.
pub struct RevisionResolver {
    hosting: Arc<dyn ChangeRequestSource>,
    repository: Arc<SharedRepository>,
    authorization: TrustedAuthors,
    settings: RepositorySettings,
}

impl RevisionResolver {
    pub fn new(
        hosting: Arc<dyn ChangeRequestSource>,
        repository: Arc<SharedRepository>,
        authorization: TrustedAuthors,
        settings: RepositorySettings,
    ) -> Self {
        Self {
            hosting,
            repository,
            authorization,
            settings,
        }
    }

    pub fn hosting(&self) -> &Arc<dyn ChangeRequestSource> {
        &self.hosting
    }

    pub fn repository(&self) -> &Arc<SharedRepository> {
        &self.repository
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    pub fn parse(raw: &str) -> Result<RevisionSelector, PreviewError> {
        RevisionSelector::parse(raw).map_err(|source| {
            ResolutionError::InvalidRevision {
                raw: raw.to_string(),
                source,
            }
            .into()
        })
    }

    /// Map a path segment onto the commit to generate.
    pub async fn resolve(&self, raw: &str) -> Result<RevisionRef, PreviewError> {
        let selector = Self::parse(raw)?;
        let revision = match &selector {
            RevisionSelector::ChangeRequest(number) => {
                let change = self.authorized_change(*number).await?;
                commit_of(&change, "head", &change.head.sha)?
            }
            RevisionSelector::Head => {
                let branch = self.settings.default_branch.clone();
                self.resolve_branch(&branch).await?
            }
            RevisionSelector::Branch(name) => {
                if !self.settings.is_allowed_branch(name) {
                    return Err(ResolutionError::InvalidBranch { name: name.clone() }.into());
                }
                self.resolve_branch(name).await?
            }
        };

        debug!(
            target = SOURCE,
            op = "resolve",
            selector = %selector,
            revision = revision.short(),
            "Resolved revision"
        );
        Ok(revision)
    }

    /// Look up a change request and apply the authorization gate.
    pub async fn authorized_change(&self, number: u64) -> Result<ChangeRequest, PreviewError> {
        let change = self.hosting.get(number).await?;
        self.authorization.authorize(&change)?;
        Ok(change)
    }

    /// Base and head commits of an authorized change request.
    pub async fn change_pair(&self, number: u64) -> Result<(RevisionRef, RevisionRef), PreviewError> {
        let change = self.authorized_change(number).await?;
        let base = commit_of(&change, "base", &change.base.sha)?;
        let head = commit_of(&change, "head", &change.head.sha)?;
        Ok((base, head))
    }

    async fn resolve_branch(&self, branch: &str) -> Result<RevisionRef, PreviewError> {
        self.repository.fetch_or_warn().await;
        Ok(self.repository.resolve(branch).await?)
    }
}

fn commit_of(
    change: &ChangeRequest,
    side: &'static str,
    sha: &str,
) -> Result<RevisionRef, PreviewError> {
    RevisionRef::new(sha).map_err(|_| {
        ResolutionError::MissingCommit {
            number: change.number,
            side,
        }
        .into()
    })
}

/// Serves files out of generated artifact sets.
pub struct PreviewService {
    resolver: Arc<RevisionResolver>,
    artifacts: Arc<ArtifactService>,
}

impl PreviewService {
    pub fn new(resolver: Arc<RevisionResolver>, artifacts: Arc<ArtifactService>) -> Self {
        Self {
            resolver,
            artifacts,
        }
    }

    pub fn resolver(&self) -> &Arc<RevisionResolver> {
        &self.resolver
    }

    pub fn artifacts(&self) -> &Arc<ArtifactService> {
        &self.artifacts
    }

    /// Fetch `path` (the index when empty) from `revision` rendered as `variant`.
    pub async fn file(
        &self,
        revision: &str,
        variant: RenderVariant,
        path: &str,
    ) -> Result<ServedFile, PreviewError> {
        let requested = normalize_file_path(path);
        let revision = self.resolver.resolve(revision).await?;
        let set = self
            .artifacts
            .artifacts(ArtifactKey::new(revision, variant))
            .await?;

        let (name, body) = set
            .lookup(requested)
            .ok_or_else(|| PreviewError::file_not_found(requested))?;
        Ok(ServedFile {
            name: name.to_string(),
            body: body.clone(),
        })
    }
}

/// Strip leading slashes; an empty path names the index.
pub fn normalize_file_path(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        INDEX_FILE
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_paths_name_the_index() {
        assert_eq!(normalize_file_path(""), INDEX_FILE);
        assert_eq!(normalize_file_path("/"), INDEX_FILE);
        assert_eq!(normalize_file_path("/css/site.css"), "css/site.css");
        assert_eq!(normalize_file_path("client_server.html"), "client_server.html");
    }

    #[test]
    fn unparsable_selector_is_a_bad_request() {
        let err = RevisionResolver::parse("99999999999999999999999").expect_err("overflow");
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
