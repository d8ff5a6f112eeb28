use std::{
    env,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use revdoc::{
    application::{
        authorization::TrustedAuthors,
        diff::DiffService,
        error::AppError,
        generation::ArtifactService,
        hosting::ChangeRequestSource,
        index::IndexService,
        live::{LiveCoordinator, LiveGenerator},
        preview::{PreviewService, RevisionResolver},
    },
    cache::ArtifactCache,
    config::{self, Settings},
    infra::{
        error::InfraError,
        generator::Generator,
        git::SharedRepository,
        hosting::HostingClient,
        http::{LiveState, PreviewState, build_live_router, build_preview_router},
        process::{CommandRunner, SystemRunner},
        telemetry,
        watcher::{TreeWatcher, find_repository_root},
        workspace::WorkspaceProvisioner,
    },
};
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SOURCE: &str = "revdoc::main";
const MIRROR_DIRNAME: &str = "mirror";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Watch(_) => run_watch(settings).await,
    }
}

async fn run_serve(mut settings: Settings) -> Result<(), AppError> {
    settings.workspace.root = absolute(&settings.workspace.root)?;
    if let Some(includes_dir) = settings.styling.includes_dir.take() {
        settings.styling.includes_dir = Some(absolute(&includes_dir)?);
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(settings.process.timeout));
    let repository = Arc::new(establish_repository(&settings, Arc::clone(&runner)).await?);

    let api_base = settings
        .hosting
        .api_base
        .as_ref()
        .ok_or_else(|| InfraError::configuration("hosting.api_base is not set"))?;
    let hosting: Arc<dyn ChangeRequestSource> = Arc::new(
        HostingClient::new(api_base, &settings.hosting).map_err(|err| {
            InfraError::configuration(format!("revision-hosting client: {err}"))
        })?,
    );

    let authorization = TrustedAuthors::from_settings(&settings.authorization);
    if authorization.is_empty() {
        warn!(
            target = SOURCE,
            op = "serve",
            "No trusted authors configured; every pull request preview will be refused"
        );
    }

    let generator = Generator::new(Arc::clone(&runner), settings.generator.clone());
    let provisioner = Arc::new(WorkspaceProvisioner::new(
        settings.workspace.root.clone(),
        Arc::clone(&repository),
        generator,
    ));
    let artifacts = Arc::new(ArtifactService::new(
        Arc::new(ArtifactCache::from_settings(&settings.cache)),
        Arc::clone(&provisioner),
        settings.styling.clone(),
        settings.cache.single_flight,
    ));
    let resolver = Arc::new(RevisionResolver::new(
        hosting,
        repository,
        authorization,
        settings.repository.clone(),
    ));

    let state = PreviewState {
        preview: Arc::new(PreviewService::new(
            Arc::clone(&resolver),
            Arc::clone(&artifacts),
        )),
        diffs: Arc::new(DiffService::new(
            Arc::clone(&resolver),
            provisioner,
            settings.diff.clone(),
        )),
        index: Arc::new(IndexService::new(
            resolver,
            settings.server.api_viewer_url.clone(),
            artifacts.styling_enabled(),
        )),
        api_description_file: Arc::from(settings.generator.api_description_file.as_str()),
    };

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = SOURCE,
        op = "serve",
        addr = %settings.server.addr,
        cache_capacity = settings.cache.capacity.get(),
        single_flight = settings.cache.single_flight,
        styled = artifacts.styling_enabled(),
        "Preview server listening"
    );

    axum::serve(listener, build_preview_router(state).into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn establish_repository(
    settings: &Settings,
    runner: Arc<dyn CommandRunner>,
) -> Result<SharedRepository, InfraError> {
    let remote_url = settings
        .repository
        .remote_url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("repository.remote_url is required to serve"))?;

    let mirror = match settings.repository.mirror_dir.as_ref() {
        Some(dir) => absolute(dir)?,
        None => settings.workspace.root.join(MIRROR_DIRNAME),
    };
    if let Some(parent) = mirror.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    SharedRepository::establish(remote_url, &mirror, runner)
        .await
        .map_err(InfraError::Repository)
}

async fn run_watch(settings: Settings) -> Result<(), AppError> {
    let root = match settings.live.root.as_ref() {
        Some(root) => absolute(root)?,
        None => {
            let cwd = env::current_dir().map_err(InfraError::from)?;
            find_repository_root(&cwd).ok_or_else(|| {
                InfraError::configuration(format!(
                    "no git repository found at or above {}",
                    cwd.display()
                ))
            })?
        }
    };

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(settings.process.timeout));
    let generator = Generator::new(runner, settings.generator.clone());
    let coordinator = Arc::new(LiveCoordinator::start(
        Arc::new(LiveGenerator::new(generator, root.clone())),
        settings.live.debounce,
    ));

    let trigger = coordinator.trigger_handle();
    let _watcher = TreeWatcher::start(
        &root,
        &settings.live.watch_paths,
        &settings.live.ignored_paths,
        move || trigger.trigger(),
    )?;

    let state = LiveState {
        coordinator,
        api_description_file: Arc::from(settings.generator.api_description_file.as_str()),
    };
    let listener = TcpListener::bind(settings.live.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = SOURCE,
        op = "watch",
        addr = %settings.live.addr,
        root = %root.display(),
        debounce_ms = settings.live.debounce.as_millis() as u64,
        "Live server listening"
    );

    axum::serve(listener, build_live_router(state).into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

fn absolute(path: &Path) -> Result<PathBuf, InfraError> {
    Ok(std::path::absolute(path)?)
}
