//! Base-versus-head diffs of a change request.
//!
//! Both sides are generated in their own workspaces, concurrently, and the
//! workspaces are dropped (and so removed) when the diff returns.

use std::{path::PathBuf, sync::Arc, time::Instant};

use bytes::Bytes;
use tracing::info;

use crate::{
    config::DiffSettings,
    domain::revision::RevisionRef,
    infra::{
        process::CommandSpec,
        workspace::{Workspace, WorkspaceProvisioner},
    },
};

use super::{
    error::PreviewError,
    preview::{RevisionResolver, normalize_file_path},
};

const SOURCE: &str = "application::diff";

/// Exit status differs use to report that the inputs differ.
const DIFFERENCES_FOUND: i32 = 1;

pub struct DiffService {
    resolver: Arc<RevisionResolver>,
    provisioner: Arc<WorkspaceProvisioner>,
    settings: DiffSettings,
}

impl DiffService {
    pub fn new(
        resolver: Arc<RevisionResolver>,
        provisioner: Arc<WorkspaceProvisioner>,
        settings: DiffSettings,
    ) -> Self {
        Self {
            resolver,
            provisioner,
            settings,
        }
    }

    /// Unified diff of the generator's intermediate sources.
    pub async fn source_diff(&self, number: u64) -> Result<Bytes, PreviewError> {
        let started_at = Instant::now();
        let (base, head) = self.provision_pair(number).await?;
        let source_dir = &self.provisioner.generator().settings().source_dir;

        let spec = CommandSpec::from_argv(&self.settings.source_command, self.provisioner.root())
            .ok_or_else(|| PreviewError::misconfigured("source diff command is empty"))?
            .path_arg(&base.path().join(source_dir))
            .path_arg(&head.path().join(source_dir))
            .allow_exit_code(DIFFERENCES_FOUND);

        let output = self
            .provisioner
            .generator()
            .runner()
            .run(&spec)
            .await
            .map_err(|err| PreviewError::from_process("source diff", err))?;

        info!(
            target = SOURCE,
            op = "source_diff",
            change_request = number,
            bytes = output.stdout.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Diffed intermediate sources"
        );
        Ok(output.stdout)
    }

    /// HTML diff of one generated file, the index when `path` is empty.
    pub async fn html_diff(&self, number: u64, path: &str) -> Result<Bytes, PreviewError> {
        let started_at = Instant::now();
        let requested = normalize_file_path(path);
        if requested.split('/').any(|segment| segment == "..") {
            return Err(PreviewError::file_not_found(requested));
        }
        let differ = self.html_differ()?;
        let (base, head) = self.provision_pair(number).await?;
        let output_dir = &self.provisioner.generator().settings().output_dir;

        let base_file = base.path().join(output_dir).join(requested);
        let head_file = head.path().join(output_dir).join(requested);
        if !base_file.is_file() || !head_file.is_file() {
            return Err(PreviewError::file_not_found(requested));
        }

        let spec = CommandSpec::new(differ.to_string_lossy(), self.provisioner.root())
            .path_arg(&base_file)
            .path_arg(&head_file)
            .allow_exit_code(DIFFERENCES_FOUND);

        let output = self
            .provisioner
            .generator()
            .runner()
            .run(&spec)
            .await
            .map_err(|err| PreviewError::from_process("HTML diff", err))?;

        info!(
            target = SOURCE,
            op = "html_diff",
            change_request = number,
            file = requested,
            bytes = output.stdout.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Diffed generated HTML"
        );
        Ok(output.stdout)
    }

    fn html_differ(&self) -> Result<PathBuf, PreviewError> {
        let differ = std::path::absolute(&self.settings.html_differ).map_err(|err| {
            PreviewError::io(
                format!("resolving {}", self.settings.html_differ.display()),
                err,
            )
        })?;
        if !differ.is_file() {
            return Err(PreviewError::misconfigured(format!(
                "HTML differ not found at {}",
                differ.display()
            )));
        }
        Ok(differ)
    }

    async fn provision_pair(&self, number: u64) -> Result<(Workspace, Workspace), PreviewError> {
        let (base, head) = self.resolver.change_pair(number).await?;
        let (base, head) = tokio::try_join!(self.provision(&base), self.provision(&head))?;
        Ok((base, head))
    }

    async fn provision(&self, revision: &RevisionRef) -> Result<Workspace, PreviewError> {
        Ok(self.provisioner.provision(revision).await?)
    }
}
