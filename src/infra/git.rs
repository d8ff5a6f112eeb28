//! The shared repository: one long-lived local mirror of the canonical source.
//!
//! Every git command against the mirror runs under a single mutex, held only
//! for the duration of that one command. Expensive work (checkout and
//! generation) happens in ephemeral workspaces outside the lock.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::revision::RevisionRef;

use super::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

const SOURCE: &str = "infra::git";
const GIT: &str = "git";
const REMOTE: &str = "origin";

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("unknown revision `{name}`: {detail}")]
    UnknownRevision { name: String, detail: String },
    #[error(transparent)]
    Command(#[from] ProcessError),
}

pub struct SharedRepository {
    path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    lock: Mutex<()>,
}

impl SharedRepository {
    /// Wrap an existing mirror without touching it.
    pub fn open(path: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            path: path.into(),
            runner,
            lock: Mutex::new(()),
        }
    }

    /// Clone `remote_url` into `path`, or reuse and fetch an existing clone there.
    pub async fn establish(
        remote_url: &str,
        path: &Path,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, ProcessError> {
        if path.join(".git").is_dir() {
            info!(
                target = SOURCE,
                op = "git::establish",
                mirror = %path.display(),
                "Reusing existing mirror"
            );
            let repository = Self::open(path, runner);
            repository.fetch_or_warn().await;
            return Ok(repository);
        }

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let spec = CommandSpec::new(GIT, parent)
            .args(["clone", remote_url])
            .path_arg(path);

        let started_at = Instant::now();
        runner.run(&spec).await?;
        info!(
            target = SOURCE,
            op = "git::establish",
            remote = remote_url,
            mirror = %path.display(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Cloned canonical repository"
        );

        Ok(Self::open(path, runner))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn git<I, S>(&self, args: I) -> Result<CommandOutput, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(GIT, &self.path).args(args);
        let _guard = self.lock.lock().await;
        self.runner.run(&spec).await
    }

    /// Update the mirror from the remote.
    pub async fn fetch(&self) -> Result<(), ProcessError> {
        self.git(["fetch"]).await.map(|_| ())
    }

    /// Fetch, degrading to the possibly-stale mirror when the remote is unreachable.
    pub async fn fetch_or_warn(&self) {
        if let Err(err) = self.fetch().await {
            warn!(
                target = SOURCE,
                op = "git::fetch",
                result = "stale",
                error = %err,
                "Fetch failed; continuing with cached branches"
            );
        }
    }

    /// Resolve a remote branch name to its current commit.
    pub async fn resolve(&self, branch: &str) -> Result<RevisionRef, RepositoryError> {
        let name = format!("{REMOTE}/{branch}");
        let output = match self.git(["rev-list", name.as_str(), "-n1"]).await {
            Ok(output) => output,
            Err(ProcessError::Exit { stderr, .. }) => {
                return Err(RepositoryError::UnknownRevision {
                    name,
                    detail: stderr.trim().to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        RevisionRef::new(output.stdout_text()).map_err(|_| RepositoryError::UnknownRevision {
            name,
            detail: "no commit found".to_string(),
        })
    }

    /// Whether `revision` is already present in the mirror's object store.
    pub async fn can_checkout(&self, revision: &RevisionRef) -> bool {
        let object = format!("{}^{{commit}}", revision.as_str());
        self.git(["cat-file", "-e", object.as_str()]).await.is_ok()
    }

    /// Remote-tracking branch names with the remote prefix removed.
    pub async fn list_branches(&self) -> Result<Vec<String>, ProcessError> {
        let output = self.git(["branch", "-r"]).await?;
        Ok(parse_remote_branches(&output.stdout_text()))
    }

    /// Clone the mirror into `dest`, sharing its object storage.
    pub async fn clone_shared_into(&self, dest: &Path) -> Result<(), ProcessError> {
        let spec = CommandSpec::new(GIT, dest)
            .args(["clone", "--shared"])
            .path_arg(&self.path)
            .path_arg(dest);
        let _guard = self.lock.lock().await;
        self.runner.run(&spec).await.map(|_| ())
    }
}

fn parse_remote_branches(listing: &str) -> Vec<String> {
    let prefix = format!("{REMOTE}/");
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.contains(" -> "))
        .filter_map(|line| line.strip_prefix(prefix.as_str()))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_branch_listing_strips_prefix_and_symbolic_refs() {
        let listing = "  origin/HEAD -> origin/master\n  origin/drafts/e2e\n  origin/master\n  upstream/other\n";
        assert_eq!(
            parse_remote_branches(listing),
            vec!["drafts/e2e".to_string(), "master".to_string()]
        );
    }
}
