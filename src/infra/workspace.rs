//! Ephemeral workspaces: an isolated clone of the shared repository, checked
//! out at one revision, in which the generator runs.
//!
//! A [`Workspace`] owns its directory through a [`TempDir`]; dropping it
//! removes the directory, so every exit path of a generation attempt (success,
//! failure, or an early `?`) cleans up. Only a process crash leaks a directory.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::revision::RevisionRef;

use super::generator::{Generator, GeneratorError};
use super::git::SharedRepository;
use super::process::{CommandSpec, ProcessError};

const SOURCE: &str = "infra::workspace";

#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    #[error("failed to create workspace under {root}: {source}")]
    Workspace {
        root: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("failed to clone shared repository: {0}")]
    Clone(#[source] ProcessError),
    #[error("failed to check out {revision}: {source}")]
    Checkout {
        revision: RevisionRef,
        #[source]
        source: ProcessError,
    },
    #[error("failed to generate documentation at {revision}: {source}")]
    Generate {
        revision: RevisionRef,
        #[source]
        source: GeneratorError,
    },
}

/// An exclusively owned checkout at one revision.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    revision: RevisionRef,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn revision(&self) -> &RevisionRef {
        &self.revision
    }

    /// Remove the directory now and report any failure.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().inspect_err(|err| {
            warn!(
                target = SOURCE,
                op = "workspace::close",
                workspace = %path.display(),
                error = %err,
                "Failed to remove workspace"
            );
        })
    }
}

pub struct WorkspaceProvisioner {
    root: PathBuf,
    repository: Arc<SharedRepository>,
    generator: Generator,
}

impl WorkspaceProvisioner {
    pub fn new(root: PathBuf, repository: Arc<SharedRepository>, generator: Generator) -> Self {
        Self {
            root,
            repository,
            generator,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn repository(&self) -> &Arc<SharedRepository> {
        &self.repository
    }

    /// Check out `revision` into a fresh workspace and run the generator there.
    ///
    /// On error the partially built workspace has already been removed.
    pub async fn provision(&self, revision: &RevisionRef) -> Result<Workspace, ProvisionError> {
        let started_at = Instant::now();

        if !self.repository.can_checkout(revision).await {
            self.repository.fetch_or_warn().await;
        }

        let workspace = self.create_workspace(revision)?;
        info!(
            target = SOURCE,
            op = "workspace::provision",
            revision = revision.short(),
            workspace = %workspace.path().display(),
            "Generating in fresh workspace"
        );

        self.repository
            .clone_shared_into(workspace.path())
            .await
            .map_err(ProvisionError::Clone)?;

        let checkout = CommandSpec::new("git", workspace.path())
            .arg("checkout")
            .arg(revision.as_str());
        self.generator
            .runner()
            .run(&checkout)
            .await
            .map_err(|source| ProvisionError::Checkout {
                revision: revision.clone(),
                source,
            })?;

        self.generator
            .generate(workspace.path())
            .await
            .map_err(|source| ProvisionError::Generate {
                revision: revision.clone(),
                source,
            })?;

        info!(
            target = SOURCE,
            op = "workspace::provision",
            result = "ok",
            revision = revision.short(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Workspace ready"
        );
        Ok(workspace)
    }

    fn create_workspace(&self, revision: &RevisionRef) -> Result<Workspace, ProvisionError> {
        let to_error = |source: io::Error| ProvisionError::Workspace {
            root: self.root.display().to_string(),
            source: Arc::new(source),
        };

        std::fs::create_dir_all(&self.root).map_err(to_error)?;
        let dir = tempfile::Builder::new()
            .prefix("ws-")
            .tempdir_in(&self.root)
            .map_err(to_error)?;

        Ok(Workspace {
            dir,
            revision: revision.clone(),
        })
    }
}
