#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use bytes::Bytes;
use revdoc::{
    application::{
        authorization::TrustedAuthors,
        diff::DiffService,
        generation::ArtifactService,
        hosting::{ChangeRequestSource, HostingError},
        index::IndexService,
        preview::{PreviewService, RevisionResolver},
    },
    cache::ArtifactCache,
    config::{DiffSettings, GeneratorSettings, RepositorySettings, StylingSettings},
    domain::change_request::{Author, ChangeRequest, CommitRef},
    infra::{
        generator::Generator,
        git::SharedRepository,
        http::{PreviewState, build_preview_router},
        process::{CommandOutput, CommandRunner, CommandSpec, ProcessError},
        workspace::WorkspaceProvisioner,
    },
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const MASTER_SHA: &str = "1111111111111111111111111111111111111111";
pub const DRAFT_SHA: &str = "2222222222222222222222222222222222222222";
pub const LEGACY_SHA: &str = "legacy3333333333333333333333333333333333";
pub const BASE_SHA: &str = "4444444444444444444444444444444444444444";
pub const HEAD_SHA: &str = "5555555555555555555555555555555555555555";

pub const GENERATOR: &str = "generate";
pub const STYLER: &str = "style";
pub const STYLE_MARKER: &str = "<!-- styled -->";

/// Stands in for git, the generator, the styler and both differs.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<CommandSpec>>,
    checkouts: Mutex<HashMap<PathBuf, String>>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls()
            .iter()
            .filter(|spec| spec.program == program)
            .count()
    }

    fn git(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        match spec.args.first().map(String::as_str) {
            Some("rev-list") => {
                let name = spec.args.get(1).cloned().unwrap_or_default();
                let sha = match name.as_str() {
                    "origin/master" => MASTER_SHA,
                    "origin/drafts/e2e" => DRAFT_SHA,
                    "origin/drafts/legacy" => LEGACY_SHA,
                    _ => {
                        return Err(ProcessError::Exit {
                            command: spec.to_string(),
                            exit_code: Some(128),
                            stderr: format!("fatal: bad revision '{name}'"),
                        });
                    }
                };
                Ok(stdout(format!("{sha}\n")))
            }
            Some("branch") => Ok(stdout(
                "  origin/HEAD -> origin/master\n  origin/drafts/e2e\n  origin/master\n  origin/feature/x\n",
            )),
            Some("checkout") => {
                let sha = spec.args.get(1).cloned().unwrap_or_default();
                self.checkouts
                    .lock()
                    .expect("checkouts lock")
                    .insert(spec.cwd.clone(), sha);
                Ok(CommandOutput::default())
            }
            _ => Ok(CommandOutput::default()),
        }
    }

    /// Writes `scripts/gen` the way the real generator would.
    fn generate(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let workspace = spec.cwd.parent().unwrap_or(Path::new("/")).to_path_buf();
        let sha = self
            .checkouts
            .lock()
            .expect("checkouts lock")
            .get(&workspace)
            .cloned()
            .unwrap_or_default();

        let output = spec.cwd.join("gen");
        std::fs::create_dir_all(output.join("css")).expect("create output");
        let index = if sha.starts_with("legacy") {
            "specification.html"
        } else {
            "index.html"
        };
        std::fs::write(output.join(index), format!("generated {sha}")).expect("write index");
        std::fs::write(output.join("css/site.css"), "body{}").expect("write css");
        std::fs::write(output.join("api-docs.json"), "{}").expect("write api docs");
        std::fs::create_dir_all(spec.cwd.join("tmp")).expect("create sources");
        Ok(CommandOutput::default())
    }

    fn style(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let file = spec.args.last().expect("styled file");
        let mut contents = std::fs::read_to_string(file).expect("read styled file");
        contents.push_str(STYLE_MARKER);
        std::fs::write(file, contents).expect("write styled file");
        Ok(CommandOutput::default())
    }
}

fn stdout(text: impl Into<String>) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        stdout: Bytes::from(text.into()),
        stderr: String::new(),
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().expect("calls lock").push(spec.clone());
        match spec.program.as_str() {
            "git" => self.git(spec),
            GENERATOR => self.generate(spec),
            STYLER => self.style(spec),
            "diff" => Ok(CommandOutput {
                exit_code: Some(1),
                stdout: Bytes::from_static(b"--- base\n+++ head\n"),
                stderr: String::new(),
            }),
            program if program.ends_with("htmldiff.pl") => Ok(stdout("<html>diff</html>")),
            other => panic!("unexpected program {other}"),
        }
    }
}

#[derive(Default)]
pub struct FakeHosting {
    changes: HashMap<u64, ChangeRequest>,
}

impl FakeHosting {
    pub fn with(mut self, change: ChangeRequest) -> Self {
        self.changes.insert(change.number, change);
        self
    }
}

#[async_trait]
impl ChangeRequestSource for FakeHosting {
    async fn list_open(&self) -> Result<Vec<ChangeRequest>, HostingError> {
        let mut changes: Vec<_> = self.changes.values().cloned().collect();
        changes.sort_by_key(|change| change.number);
        Ok(changes)
    }

    async fn get(&self, number: u64) -> Result<ChangeRequest, HostingError> {
        self.changes
            .get(&number)
            .cloned()
            .ok_or(HostingError::NotFound { number })
    }
}

pub fn change_request(number: u64, author: &str) -> ChangeRequest {
    ChangeRequest {
        number,
        title: format!("Change {number}"),
        html_url: format!("https://example.test/pull/{number}"),
        author: Author {
            login: author.to_string(),
            html_url: format!("https://example.test/{author}"),
        },
        head: CommitRef {
            sha: HEAD_SHA.to_string(),
            repo: None,
        },
        base: CommitRef {
            sha: BASE_SHA.to_string(),
            repo: None,
        },
    }
}

pub struct Harness {
    pub router: Router,
    pub runner: Arc<FakeRunner>,
    pub cache: Arc<ArtifactCache>,
    pub workspace_root: PathBuf,
    _dirs: Vec<TempDir>,
}

#[derive(Default)]
pub struct HarnessOptions {
    pub styled: bool,
    pub single_flight: bool,
}

impl Harness {
    pub fn new(options: HarnessOptions) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let workspace_root = temp.path().join("workspaces");
        let mirror = temp.path().join("mirror");
        std::fs::create_dir_all(&mirror).expect("mirror dir");
        let includes = temp.path().join("includes");
        std::fs::create_dir_all(&includes).expect("includes dir");
        let differ = temp.path().join("htmldiff.pl");
        std::fs::write(&differ, "#!/bin/sh\n").expect("differ");

        let runner = FakeRunner::new();
        let dyn_runner: Arc<dyn CommandRunner> = runner.clone();
        let repository = Arc::new(SharedRepository::open(&mirror, Arc::clone(&dyn_runner)));
        let generator = Generator::new(
            dyn_runner,
            GeneratorSettings {
                command: vec![GENERATOR.to_string()],
                api_description_command: None,
                ..GeneratorSettings::default()
            },
        );
        let provisioner = Arc::new(WorkspaceProvisioner::new(
            workspace_root.clone(),
            Arc::clone(&repository),
            generator,
        ));

        let cache = Arc::new(ArtifactCache::new(
            std::num::NonZeroUsize::new(8).expect("non-zero"),
        ));
        let styling = StylingSettings {
            includes_dir: options.styled.then(|| includes.clone()),
            command: vec![STYLER.to_string()],
        };
        let artifacts = Arc::new(ArtifactService::new(
            Arc::clone(&cache),
            Arc::clone(&provisioner),
            styling,
            options.single_flight,
        ));

        let hosting = FakeHosting::default()
            .with(change_request(42, "Alice"))
            .with(change_request(7, "mallory"));
        let resolver = Arc::new(RevisionResolver::new(
            Arc::new(hosting),
            repository,
            TrustedAuthors::new(["alice"]),
            RepositorySettings {
                remote_url: None,
                mirror_dir: None,
                default_branch: "master".to_string(),
                draft_prefixes: vec!["drafts/".to_string()],
            },
        ));

        let state = PreviewState {
            preview: Arc::new(PreviewService::new(
                Arc::clone(&resolver),
                Arc::clone(&artifacts),
            )),
            diffs: Arc::new(DiffService::new(
                Arc::clone(&resolver),
                provisioner,
                DiffSettings {
                    html_differ: differ,
                    ..DiffSettings::default()
                },
            )),
            index: Arc::new(IndexService::new(
                resolver,
                "https://viewer.test/?url=".to_string(),
                artifacts.styling_enabled(),
            )),
            api_description_file: Arc::from("api-docs.json"),
        };

        Self {
            router: build_preview_router(state),
            runner,
            cache,
            workspace_root,
            _dirs: vec![temp],
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    /// Workspaces still present under the provisioner's root.
    pub fn leftover_workspaces(&self) -> usize {
        match std::fs::read_dir(&self.workspace_root) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}
