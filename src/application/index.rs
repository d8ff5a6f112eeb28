//! Human-facing index of everything that can be previewed.

use std::sync::Arc;

use url::form_urlencoded;

use crate::domain::change_request::ChangeRequest;

use super::{error::PreviewError, preview::RevisionResolver};

const HEAD_ALIAS: &str = "HEAD";

#[derive(Debug, Clone)]
pub struct ChangeEntry {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author_login: String,
    pub author_url: String,
}

impl From<ChangeRequest> for ChangeEntry {
    fn from(change: ChangeRequest) -> Self {
        Self {
            number: change.number,
            title: change.title,
            url: change.html_url,
            author_login: change.author.login,
            author_url: change.author.html_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BranchEntry {
    pub name: String,
    /// Path segment with `/` escaped so the branch stays one segment.
    pub segment: String,
}

impl BranchEntry {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let segment = form_urlencoded::byte_serialize(name.as_bytes()).collect();
        Self { name, segment }
    }
}

#[derive(Debug, Clone)]
pub struct IndexView {
    pub changes: Vec<ChangeEntry>,
    pub branches: Vec<BranchEntry>,
    pub styled: bool,
    pub api_viewer_url: String,
}

pub struct IndexService {
    resolver: Arc<RevisionResolver>,
    api_viewer_url: String,
    styled: bool,
}

impl IndexService {
    pub fn new(resolver: Arc<RevisionResolver>, api_viewer_url: String, styled: bool) -> Self {
        Self {
            resolver,
            api_viewer_url,
            styled,
        }
    }

    /// Open change requests, draft branches and the default branch.
    pub async fn index(&self) -> Result<IndexView, PreviewError> {
        let changes = self.resolver.hosting().list_open().await?;

        let repository = self.resolver.repository();
        repository.fetch_or_warn().await;
        let branches = repository
            .list_branches()
            .await
            .map_err(|err| PreviewError::from_process("listing branches", err))?;

        let prefixes = &self.resolver.settings().draft_prefixes;
        let mut branches: Vec<BranchEntry> = branches
            .into_iter()
            .filter(|branch| prefixes.iter().any(|prefix| branch.starts_with(prefix.as_str())))
            .map(BranchEntry::new)
            .collect();
        branches.push(BranchEntry::new(HEAD_ALIAS));

        Ok(IndexView {
            changes: changes.into_iter().map(ChangeEntry::from).collect(),
            branches,
            styled: self.styled,
            api_viewer_url: self.api_viewer_url.clone(),
        })
    }
}
