//! Provisioning against a real git repository with shell stand-ins for the generator.

use std::{path::Path, process::Command, sync::Arc, time::Duration};

use revdoc::{
    config::GeneratorSettings,
    domain::revision::RevisionRef,
    infra::{
        generator::Generator,
        git::SharedRepository,
        process::{CommandRunner, SystemRunner},
        workspace::{ProvisionError, WorkspaceProvisioner},
    },
};
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=revdoc", "-c", "user.email=revdoc@example.test"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git should run");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A canonical repository with one commit on `master`.
fn canonical_repository(root: &Path) -> (std::path::PathBuf, String) {
    let source = root.join("canonical");
    std::fs::create_dir_all(source.join("scripts")).expect("scripts dir");
    git(&source, &["init", "-q"]);
    git(&source, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    std::fs::write(source.join("scripts/README"), "generator lives here\n").expect("readme");
    git(&source, &["add", "."]);
    git(&source, &["commit", "-q", "-m", "initial"]);
    let sha = git(&source, &["rev-parse", "HEAD"]);
    (source, sha)
}

fn shell_generator(script: &str) -> GeneratorSettings {
    GeneratorSettings {
        command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        api_description_command: None,
        ..GeneratorSettings::default()
    }
}

async fn provisioner(
    temp: &TempDir,
    generator: GeneratorSettings,
) -> (WorkspaceProvisioner, String) {
    let (source, sha) = canonical_repository(temp.path());
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(Duration::from_secs(60)));
    let repository = SharedRepository::establish(
        &source.to_string_lossy(),
        &temp.path().join("mirror"),
        Arc::clone(&runner),
    )
    .await
    .expect("mirror should clone");

    let provisioner = WorkspaceProvisioner::new(
        temp.path().join("workspaces"),
        Arc::new(repository),
        Generator::new(runner, generator),
    );
    (provisioner, sha)
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn provisioned_workspace_is_removed_after_use() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let (provisioner, sha) = provisioner(
        &temp,
        shell_generator("mkdir -p gen && git rev-parse HEAD > gen/index.html"),
    )
    .await;

    let resolved = provisioner
        .repository()
        .resolve("master")
        .await
        .expect("master resolves");
    assert_eq!(resolved.as_str(), sha);

    let workspace = provisioner.provision(&resolved).await.expect("provision");
    let path = workspace.path().to_path_buf();
    let artifacts = provisioner
        .generator()
        .collect(&path)
        .await
        .expect("collect");
    assert_eq!(
        artifacts.get("index.html").expect("index").as_ref(),
        format!("{sha}\n").as_bytes()
    );

    workspace.close().expect("close");
    assert!(!path.exists());
    assert_eq!(entries(provisioner.root()), 0);
}

#[tokio::test]
async fn failed_generation_removes_workspace_and_keeps_stderr() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let (provisioner, sha) =
        provisioner(&temp, shell_generator("echo 'boom: bad template' >&2; exit 3")).await;
    let revision = RevisionRef::new(sha).expect("revision");

    let err = provisioner
        .provision(&revision)
        .await
        .expect_err("generator fails");

    assert!(matches!(err, ProvisionError::Generate { .. }));
    assert!(err.to_string().contains("failed to generate"));
    let chain = format!("{err:?}");
    assert!(chain.contains("boom: bad template"), "{chain}");
    assert_eq!(entries(provisioner.root()), 0);
}

#[tokio::test]
async fn unknown_revision_fails_checkout_and_cleans_up() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let (provisioner, _) = provisioner(&temp, shell_generator("true")).await;
    let missing = RevisionRef::new("0123456789abcdef0123456789abcdef01234567").expect("revision");

    let err = provisioner
        .provision(&missing)
        .await
        .expect_err("checkout fails");

    assert!(matches!(err, ProvisionError::Checkout { .. }));
    assert_eq!(entries(provisioner.root()), 0);
}

#[tokio::test]
async fn generating_twice_yields_identical_artifacts() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let (provisioner, sha) = provisioner(
        &temp,
        shell_generator("mkdir -p gen/css && cat README > gen/index.html && echo body > gen/css/site.css"),
    )
    .await;
    let revision = RevisionRef::new(sha).expect("revision");

    let mut sets = Vec::new();
    for _ in 0..2 {
        let workspace = provisioner.provision(&revision).await.expect("provision");
        sets.push(
            provisioner
                .generator()
                .collect(workspace.path())
                .await
                .expect("collect"),
        );
    }

    assert_eq!(sets[0], sets[1]);
    assert_eq!(sets[0].len(), 2);
    assert_eq!(entries(provisioner.root()), 0);
}

#[tokio::test]
async fn unknown_branch_is_reported_with_git_stderr() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let (provisioner, _) = provisioner(&temp, shell_generator("true")).await;

    let err = provisioner
        .repository()
        .resolve("drafts/missing")
        .await
        .expect_err("unknown branch");

    assert!(err.to_string().contains("origin/drafts/missing"));
}

#[tokio::test]
async fn existing_mirror_is_reused() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let temp = TempDir::new().expect("temp dir");
    let (source, sha) = canonical_repository(temp.path());
    let mirror = temp.path().join("mirror");
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(Duration::from_secs(60)));

    SharedRepository::establish(&source.to_string_lossy(), &mirror, Arc::clone(&runner))
        .await
        .expect("first clone");
    let repository = SharedRepository::establish(&source.to_string_lossy(), &mirror, runner)
        .await
        .expect("reuse");

    let branches = repository.list_branches().await.expect("branches");
    assert!(branches.contains(&"master".to_string()));
    let revision = RevisionRef::new(sha).expect("revision");
    assert!(repository.can_checkout(&revision).await);
}
