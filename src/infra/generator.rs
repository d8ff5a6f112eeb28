//! Invocation of the external document generator and collection of its output.

use std::{
    io,
    path::{Component, Path},
    sync::Arc,
    time::Instant,
};

use bytes::Bytes;
use metrics::histogram;
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

use crate::config::{GeneratorSettings, StylingSettings};
use crate::domain::artifacts::ArtifactSet;

use super::process::{CommandRunner, CommandSpec, ProcessError};

const SOURCE: &str = "infra::generator";

pub(crate) const METRIC_GENERATION_MS: &str = "revdoc_generation_ms";

#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    #[error("{0} command is empty")]
    EmptyCommand(&'static str),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("failed to read generator output at {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: Arc<io::Error>,
    },
}

impl GeneratorError {
    fn output(path: &Path, source: io::Error) -> Self {
        Self::Output {
            path: path.display().to_string(),
            source: Arc::new(source),
        }
    }
}

#[derive(Clone)]
pub struct Generator {
    runner: Arc<dyn CommandRunner>,
    settings: GeneratorSettings,
}

impl Generator {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: GeneratorSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Run the generator (and the optional API-description dump) against a source tree.
    pub async fn generate(&self, tree: &Path) -> Result<(), GeneratorError> {
        let started_at = Instant::now();
        let working_dir = tree.join(&self.settings.working_dir);

        let spec = CommandSpec::from_argv(&self.settings.command, &working_dir)
            .ok_or(GeneratorError::EmptyCommand("generator"))?;
        self.runner.run(&spec).await?;

        if let Some(argv) = self.settings.api_description_command.as_ref() {
            if let Some(spec) = CommandSpec::from_argv(argv, &working_dir) {
                self.runner.run(&spec).await?;
            }
        }

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        histogram!(METRIC_GENERATION_MS).record(elapsed_ms as f64);
        info!(
            target = SOURCE,
            op = "generator::generate",
            tree = %tree.display(),
            elapsed_ms,
            "Generator finished"
        );
        Ok(())
    }

    /// Run the publication-styling command over every generated file in place.
    pub async fn apply_styling(
        &self,
        tree: &Path,
        styling: &StylingSettings,
        includes_dir: &Path,
    ) -> Result<(), GeneratorError> {
        let output_dir = tree.join(&self.settings.output_dir);
        let working_dir = tree.join(&self.settings.working_dir);
        let base = CommandSpec::from_argv(&styling.command, &working_dir)
            .ok_or(GeneratorError::EmptyCommand("styling"))?;
        let files =
            list_files(&output_dir).map_err(|err| GeneratorError::output(&output_dir, err))?;

        for file in files {
            let spec = base.clone().path_arg(includes_dir).path_arg(&file);
            self.runner.run(&spec).await?;
        }
        Ok(())
    }

    /// Read the generator's output tree into memory.
    pub async fn collect(&self, tree: &Path) -> Result<ArtifactSet, GeneratorError> {
        let output_dir = tree.join(&self.settings.output_dir);
        let walk_dir = output_dir.clone();
        tokio::task::spawn_blocking(move || collect_artifacts(&walk_dir))
            .await
            .map_err(io::Error::other)
            .and_then(|result| result)
            .map_err(|err| GeneratorError::output(&output_dir, err))
    }
}

fn list_files(root: &Path) -> io::Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Walk `root` and load every regular file, keyed by its `/`-separated relative path.
pub fn collect_artifacts(root: &Path) -> io::Result<ArtifactSet> {
    let mut files = std::collections::BTreeMap::new();
    for path in list_files(root)? {
        let relative = path
            .strip_prefix(root)
            .map_err(|err| io::Error::other(format!("{}: {err}", path.display())))?;
        let key = relative_key(relative);
        let contents = std::fs::read(&path)?;
        files.insert(key, Bytes::from(contents));
    }
    Ok(ArtifactSet::new(files))
}

fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collects_nested_files_with_slash_keys() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("css")).expect("mkdir");
        std::fs::write(dir.path().join("index.html"), "<html/>").expect("write");
        std::fs::write(dir.path().join("css/site.css"), "body{}").expect("write");

        let artifacts = collect_artifacts(dir.path()).expect("collect");
        assert_eq!(
            artifacts.paths().collect::<Vec<_>>(),
            vec!["css/site.css", "index.html"]
        );
        assert_eq!(
            artifacts.get("css/site.css").expect("css").as_ref(),
            b"body{}"
        );
    }

    #[test]
    fn missing_output_directory_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        assert!(collect_artifacts(&dir.path().join("gen")).is_err());
    }
}
