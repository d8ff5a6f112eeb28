//! Filesystem watching for live regeneration.

use std::path::{Path, PathBuf};

use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::ModifyKind,
};
use tracing::{debug, info, warn};

use super::error::InfraError;

const SOURCE: &str = "infra::watcher";

/// Walk up from `start` to the first directory holding `.git`.
pub fn find_repository_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Decides which changed paths should trigger a regeneration.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    ignored: Vec<PathBuf>,
}

impl ChangeFilter {
    pub fn new(root: &Path, ignored_paths: &[PathBuf]) -> Self {
        Self {
            ignored: ignored_paths.iter().map(|path| root.join(path)).collect(),
        }
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|name| name.to_string_lossy()) else {
            return false;
        };
        if name.starts_with('.') || name.ends_with('~') || name.ends_with(".swp") {
            return false;
        }
        !self.ignored.iter().any(|ignored| path.starts_with(ignored))
    }

    /// Writes and creations count; reads, removals and metadata changes do not.
    pub fn accepts(&self, event: &Event) -> bool {
        let is_write = matches!(
            event.kind,
            EventKind::Create(_)
                | EventKind::Modify(ModifyKind::Data(_))
                | EventKind::Modify(ModifyKind::Name(_))
                | EventKind::Modify(ModifyKind::Any)
        );
        is_write && event.paths.iter().any(|path| self.is_relevant(path))
    }
}

/// Keeps the OS watch registrations alive; dropping it stops watching.
pub struct TreeWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl TreeWatcher {
    pub fn start<F>(
        root: &Path,
        watch_paths: &[PathBuf],
        ignored_paths: &[PathBuf],
        on_change: F,
    ) -> Result<Self, InfraError>
    where
        F: Fn() + Send + 'static,
    {
        let filter = ChangeFilter::new(root, ignored_paths);
        let mut watcher = RecommendedWatcher::new(
            move |event: notify::Result<Event>| match event {
                Ok(event) if filter.accepts(&event) => {
                    debug!(
                        target = SOURCE,
                        op = "watcher::event",
                        kind = ?event.kind,
                        paths = ?event.paths,
                        "Change detected"
                    );
                    on_change();
                }
                Ok(_) => {}
                Err(err) => warn!(
                    target = SOURCE,
                    op = "watcher::event",
                    result = "error",
                    error = %err,
                    "Watch error"
                ),
            },
            Config::default(),
        )?;

        let mut watched = 0usize;
        for relative in watch_paths {
            let path = root.join(relative);
            if !path.is_dir() {
                warn!(
                    target = SOURCE,
                    op = "watcher::start",
                    path = %path.display(),
                    "Watch path missing; skipping"
                );
                continue;
            }
            watcher.watch(&path, RecursiveMode::Recursive)?;
            watched += 1;
        }

        if watched == 0 {
            return Err(InfraError::configuration(format!(
                "none of the watch paths exist under {}",
                root.display()
            )));
        }

        info!(
            target = SOURCE,
            op = "watcher::start",
            root = %root.display(),
            watched,
            "Watching source tree"
        );
        Ok(Self {
            _watcher: watcher,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use tempfile::TempDir;

    use super::*;

    fn filter() -> ChangeFilter {
        ChangeFilter::new(
            Path::new("/tree"),
            &[PathBuf::from("scripts/gen"), PathBuf::from("scripts/tmp")],
        )
    }

    #[test]
    fn editor_droppings_are_ignored() {
        let filter = filter();
        assert!(filter.is_relevant(Path::new("/tree/api/client.yaml")));
        assert!(!filter.is_relevant(Path::new("/tree/api/.client.yaml.swx")));
        assert!(!filter.is_relevant(Path::new("/tree/api/client.yaml.swp")));
        assert!(!filter.is_relevant(Path::new("/tree/api/client.yaml~")));
    }

    #[test]
    fn generator_output_does_not_retrigger() {
        let filter = filter();
        assert!(!filter.is_relevant(Path::new("/tree/scripts/gen/index.html")));
        assert!(!filter.is_relevant(Path::new("/tree/scripts/tmp/a.rst")));
        assert!(filter.is_relevant(Path::new("/tree/scripts/gendoc.py")));
    }

    #[test]
    fn only_writes_are_accepted() {
        let filter = filter();
        let path = PathBuf::from("/tree/specification/intro.rst");
        let write = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.clone());
        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path(path);
        assert!(filter.accepts(&write));
        assert!(filter.accepts(&create));
        assert!(!filter.accepts(&remove));
    }

    #[test]
    fn repository_root_is_found_from_a_subdirectory() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(".git")).expect("git dir");
        std::fs::create_dir_all(dir.path().join("scripts/nested")).expect("nested");

        let found = find_repository_root(&dir.path().join("scripts/nested")).expect("root");
        assert_eq!(found, dir.path());
    }

    #[test]
    fn missing_watch_paths_are_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let result = TreeWatcher::start(dir.path(), &[PathBuf::from("api")], &[], || {});
        assert!(matches!(result, Err(InfraError::Configuration { .. })));
    }
}
