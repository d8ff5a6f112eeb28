//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    env,
    net::SocketAddr,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{
    CliArgs, Command, LoggingOverrides, ServeArgs, ServeOverrides, WatchArgs, WatchOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "revdoc";
const ENV_PREFIX: &str = "REVDOC";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: u16 = 9000;
const DEFAULT_LIVE_PORT: u16 = 8000;
const DEFAULT_LIVE_DEBOUNCE_MS: u64 = 10;
const DEFAULT_API_VIEWER_URL: &str = "https://matrix.org/docs/api/client-server/?url=";
const DEFAULT_BRANCH: &str = "master";
const DEFAULT_DRAFT_PREFIXES: [&str; 2] = ["drafts/", "attic/drafts/"];
const DEFAULT_HOSTING_API_BASE: &str = "https://api.github.com/repos/matrix-org/matrix-doc/";
const DEFAULT_HOSTING_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_CAPACITY: u64 = 50;
const DEFAULT_PROCESS_TIMEOUT_SECS: u64 = 900;
const DEFAULT_WORKSPACE_DIRNAME: &str = "revdoc";
const DEFAULT_HTML_DIFFER: &str = "htmldiff.pl";
const DEFAULT_GENERATOR_WORKING_DIR: &str = "scripts";
const DEFAULT_GENERATOR_OUTPUT_DIR: &str = "scripts/gen";
const DEFAULT_GENERATOR_SOURCE_DIR: &str = "scripts/tmp";
const DEFAULT_API_DESCRIPTION_FILE: &str = "api-docs.json";
pub(crate) const DEFAULT_WATCH_PATHS: [&str; 6] = [
    "api",
    "changelogs",
    "event-schemas",
    "scripts",
    "specification",
    "templating",
];
pub(crate) const DEFAULT_IGNORED_PATHS: [&str; 3] = ["api/node_modules", "scripts/gen", "scripts/tmp"];

fn default_generator_command() -> Vec<String> {
    argv(&["python", "gendoc.py", "--nodelete"])
}

fn default_api_description_command() -> Vec<String> {
    argv(&["python", "dump-swagger.py", "-o", "gen/api-docs.json"])
}

fn default_styling_command() -> Vec<String> {
    argv(&["./add-matrix-org-stylings.pl"])
}

fn default_source_diff_command() -> Vec<String> {
    argv(&["diff", "-r", "-u"])
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| (*part).to_string()).collect()
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub live: LiveSettings,
    pub logging: LoggingSettings,
    pub repository: RepositorySettings,
    pub hosting: HostingSettings,
    pub authorization: AuthorizationSettings,
    pub generator: GeneratorSettings,
    pub styling: StylingSettings,
    pub diff: DiffSettings,
    pub cache: CacheSettings,
    pub process: ProcessSettings,
    pub workspace: WorkspaceSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    /// Viewer the index page links API descriptions through.
    pub api_viewer_url: String,
}

#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub addr: SocketAddr,
    /// Tree to watch; discovered from the working directory when unset.
    pub root: Option<PathBuf>,
    pub watch_paths: Vec<PathBuf>,
    pub ignored_paths: Vec<PathBuf>,
    pub debounce: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RepositorySettings {
    pub remote_url: Option<String>,
    pub mirror_dir: Option<PathBuf>,
    pub default_branch: String,
    pub draft_prefixes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HostingSettings {
    pub api_base: Option<Url>,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationSettings {
    pub trusted_authors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub command: Vec<String>,
    pub api_description_command: Option<Vec<String>>,
    /// File name the API-description command writes into the output tree.
    pub api_description_file: String,
    /// Relative to the checked-out tree.
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Intermediate sources compared by the source diff.
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StylingSettings {
    pub includes_dir: Option<PathBuf>,
    pub command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DiffSettings {
    pub html_differ: PathBuf,
    pub source_command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub capacity: NonZeroUsize,
    pub single_flight: bool,
}

#[derive(Debug, Clone)]
pub struct ProcessSettings {
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    pub root: PathBuf,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            command: default_generator_command(),
            api_description_command: Some(default_api_description_command()),
            api_description_file: DEFAULT_API_DESCRIPTION_FILE.to_string(),
            working_dir: PathBuf::from(DEFAULT_GENERATOR_WORKING_DIR),
            output_dir: PathBuf::from(DEFAULT_GENERATOR_OUTPUT_DIR),
            source_dir: PathBuf::from(DEFAULT_GENERATOR_SOURCE_DIR),
        }
    }
}

impl Default for StylingSettings {
    fn default() -> Self {
        Self {
            includes_dir: None,
            command: default_styling_command(),
        }
    }
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            html_differ: PathBuf::from(DEFAULT_HTML_DIFFER),
            source_command: default_source_diff_command(),
        }
    }
}

impl RepositorySettings {
    /// Whether `branch` may be resolved against the shared repository.
    pub fn is_allowed_branch(&self, branch: &str) -> bool {
        branch == self.default_branch
            || self
                .draft_prefixes
                .iter()
                .any(|prefix| branch.starts_with(prefix.as_str()) && branch.len() > prefix.len())
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("authorization.trusted_authors")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Watch(args)) => raw.apply_watch_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    live: RawLiveSettings,
    logging: RawLoggingSettings,
    repository: RawRepositorySettings,
    hosting: RawHostingSettings,
    authorization: RawAuthorizationSettings,
    generator: RawGeneratorSettings,
    styling: RawStylingSettings,
    diff: RawDiffSettings,
    cache: RawCacheSettings,
    process: RawProcessSettings,
    workspace: RawWorkspaceSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_logging_overrides(&overrides.logging);
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(url) = overrides.remote_url.as_ref() {
            self.repository.remote_url = Some(url.clone());
        }
        if let Some(dir) = overrides.mirror_dir.as_ref() {
            self.repository.mirror_dir = Some(dir.clone());
        }
        if let Some(base) = overrides.hosting_api_base.as_ref() {
            self.hosting.api_base = Some(base.clone());
        }
        if let Some(token) = overrides.access_token.as_ref() {
            self.hosting.access_token = Some(token.clone());
        }
        if !overrides.trusted_authors.is_empty() {
            self.authorization
                .trusted_authors
                .get_or_insert_with(Vec::new)
                .extend(overrides.trusted_authors.iter().cloned());
        }
        if let Some(dir) = overrides.includes_dir.as_ref() {
            self.styling.includes_dir = Some(dir.clone());
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.cache.capacity = Some(capacity);
        }
        if let Some(single_flight) = overrides.single_flight {
            self.cache.single_flight = Some(single_flight);
        }
        if let Some(seconds) = overrides.process_timeout_seconds {
            self.process.timeout_seconds = Some(seconds);
        }
        if let Some(root) = overrides.workspace_root.as_ref() {
            self.workspace.root = Some(root.clone());
        }
    }

    fn apply_watch_overrides(&mut self, overrides: &WatchOverrides) {
        self.apply_logging_overrides(&overrides.logging);
        if let Some(host) = overrides.live_host.as_ref() {
            self.live.host = Some(host.clone());
        }
        if let Some(port) = overrides.live_port {
            self.live.port = Some(port);
        }
        if let Some(root) = overrides.root.as_ref() {
            self.live.root = Some(root.clone());
        }
        if let Some(millis) = overrides.debounce_ms {
            self.live.debounce_ms = Some(millis);
        }
        if let Some(seconds) = overrides.process_timeout_seconds {
            self.process.timeout_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            live,
            logging,
            repository,
            hosting,
            authorization,
            generator,
            styling,
            diff,
            cache,
            process,
            workspace,
        } = raw;

        let server = build_server_settings(server)?;
        let live = build_live_settings(live)?;
        let logging = build_logging_settings(logging)?;
        let repository = build_repository_settings(repository)?;
        let hosting = build_hosting_settings(hosting)?;
        let authorization = build_authorization_settings(authorization);
        let generator = build_generator_settings(generator)?;
        let styling = build_styling_settings(styling)?;
        let diff = build_diff_settings(diff)?;
        let cache = build_cache_settings(cache)?;
        let process = build_process_settings(process)?;
        let workspace = build_workspace_settings(workspace);

        Ok(Self {
            server,
            live,
            logging,
            repository,
            hosting,
            authorization,
            generator,
            styling,
            diff,
            cache,
            process,
            workspace,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_SERVER_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let api_viewer_url = non_empty(server.api_viewer_url)
        .unwrap_or_else(|| DEFAULT_API_VIEWER_URL.to_string());

    Ok(ServerSettings {
        addr,
        api_viewer_url,
    })
}

fn build_live_settings(live: RawLiveSettings) -> Result<LiveSettings, LoadError> {
    let host = live.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = live.port.unwrap_or(DEFAULT_LIVE_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "live.port",
            "port must be greater than zero",
        ));
    }
    let addr =
        parse_socket_addr(&host, port).map_err(|reason| LoadError::invalid("live.addr", reason))?;

    let debounce_ms = live.debounce_ms.unwrap_or(DEFAULT_LIVE_DEBOUNCE_MS);
    if debounce_ms == 0 {
        return Err(LoadError::invalid(
            "live.debounce_ms",
            "must be greater than zero",
        ));
    }

    let watch_paths = relative_paths(
        live.watch_paths,
        &DEFAULT_WATCH_PATHS,
        "live.watch_paths",
    )?;
    if watch_paths.is_empty() {
        return Err(LoadError::invalid(
            "live.watch_paths",
            "at least one directory must be watched",
        ));
    }
    let ignored_paths = relative_paths(
        live.ignored_paths,
        &DEFAULT_IGNORED_PATHS,
        "live.ignored_paths",
    )?;

    Ok(LiveSettings {
        addr,
        root: live.root,
        watch_paths,
        ignored_paths,
        debounce: Duration::from_millis(debounce_ms),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_repository_settings(
    repository: RawRepositorySettings,
) -> Result<RepositorySettings, LoadError> {
    let default_branch =
        non_empty(repository.default_branch).unwrap_or_else(|| DEFAULT_BRANCH.to_string());

    let draft_prefixes = match repository.draft_prefixes {
        Some(prefixes) => prefixes,
        None => DEFAULT_DRAFT_PREFIXES
            .iter()
            .map(|prefix| (*prefix).to_string())
            .collect(),
    };
    if draft_prefixes.iter().any(|prefix| prefix.trim().is_empty()) {
        return Err(LoadError::invalid(
            "repository.draft_prefixes",
            "prefixes must not be empty",
        ));
    }

    Ok(RepositorySettings {
        remote_url: non_empty(repository.remote_url),
        mirror_dir: repository.mirror_dir,
        default_branch,
        draft_prefixes,
    })
}

fn build_hosting_settings(hosting: RawHostingSettings) -> Result<HostingSettings, LoadError> {
    let api_base = match non_empty(hosting.api_base) {
        Some(raw) => Some(parse_api_base(&raw)?),
        None => Some(parse_api_base(DEFAULT_HOSTING_API_BASE)?),
    };

    let timeout_secs = hosting
        .request_timeout_seconds
        .unwrap_or(DEFAULT_HOSTING_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "hosting.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(HostingSettings {
        api_base,
        access_token: non_empty(hosting.access_token),
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_api_base(raw: &str) -> Result<Url, LoadError> {
    // Url::join drops the last segment unless the base ends with a slash.
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|err| LoadError::invalid("hosting.api_base", format!("invalid URL: {err}")))
}

fn build_authorization_settings(authorization: RawAuthorizationSettings) -> AuthorizationSettings {
    let mut trusted_authors: Vec<String> = authorization
        .trusted_authors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|login| non_empty(Some(login)))
        .collect();
    trusted_authors.sort();
    trusted_authors.dedup();
    AuthorizationSettings { trusted_authors }
}

fn build_generator_settings(generator: RawGeneratorSettings) -> Result<GeneratorSettings, LoadError> {
    let defaults = GeneratorSettings::default();

    let command = generator.command.unwrap_or(defaults.command);
    if command.is_empty() {
        return Err(LoadError::invalid(
            "generator.command",
            "command must name a program",
        ));
    }

    // An explicitly empty list disables the API-description step.
    let api_description_command = match generator.api_description_command {
        Some(argv) if argv.is_empty() => None,
        Some(argv) => Some(argv),
        None => defaults.api_description_command,
    };

    let api_description_file =
        non_empty(generator.api_description_file).unwrap_or(defaults.api_description_file);

    Ok(GeneratorSettings {
        command,
        api_description_command,
        api_description_file,
        working_dir: relative_path(
            generator.working_dir,
            defaults.working_dir,
            "generator.working_dir",
        )?,
        output_dir: relative_path(
            generator.output_dir,
            defaults.output_dir,
            "generator.output_dir",
        )?,
        source_dir: relative_path(
            generator.source_dir,
            defaults.source_dir,
            "generator.source_dir",
        )?,
    })
}

fn build_styling_settings(styling: RawStylingSettings) -> Result<StylingSettings, LoadError> {
    let command = styling.command.unwrap_or_else(default_styling_command);
    if command.is_empty() {
        return Err(LoadError::invalid(
            "styling.command",
            "command must name a program",
        ));
    }
    Ok(StylingSettings {
        includes_dir: styling.includes_dir,
        command,
    })
}

fn build_diff_settings(diff: RawDiffSettings) -> Result<DiffSettings, LoadError> {
    let source_command = diff.source_command.unwrap_or_else(default_source_diff_command);
    if source_command.is_empty() {
        return Err(LoadError::invalid(
            "diff.source_command",
            "command must name a program",
        ));
    }
    Ok(DiffSettings {
        html_differ: diff
            .html_differ
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HTML_DIFFER)),
        source_command,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = non_zero_usize(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "cache.capacity",
    )?;
    Ok(CacheSettings {
        capacity,
        single_flight: cache.single_flight.unwrap_or(true),
    })
}

fn build_process_settings(process: RawProcessSettings) -> Result<ProcessSettings, LoadError> {
    let seconds = process
        .timeout_seconds
        .unwrap_or(DEFAULT_PROCESS_TIMEOUT_SECS);
    if seconds == 0 {
        return Err(LoadError::invalid(
            "process.timeout_seconds",
            "must be greater than zero",
        ));
    }
    Ok(ProcessSettings {
        timeout: Duration::from_secs(seconds),
    })
}

fn build_workspace_settings(workspace: RawWorkspaceSettings) -> WorkspaceSettings {
    let root = workspace
        .root
        .unwrap_or_else(|| env::temp_dir().join(DEFAULT_WORKSPACE_DIRNAME));
    WorkspaceSettings { root }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    api_viewer_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLiveSettings {
    host: Option<String>,
    port: Option<u16>,
    root: Option<PathBuf>,
    watch_paths: Option<Vec<PathBuf>>,
    ignored_paths: Option<Vec<PathBuf>>,
    debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRepositorySettings {
    remote_url: Option<String>,
    mirror_dir: Option<PathBuf>,
    default_branch: Option<String>,
    draft_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHostingSettings {
    api_base: Option<String>,
    access_token: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthorizationSettings {
    trusted_authors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGeneratorSettings {
    command: Option<Vec<String>>,
    api_description_command: Option<Vec<String>>,
    api_description_file: Option<String>,
    working_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    source_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStylingSettings {
    includes_dir: Option<PathBuf>,
    command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDiffSettings {
    html_differ: Option<PathBuf>,
    source_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    capacity: Option<u64>,
    single_flight: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawProcessSettings {
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWorkspaceSettings {
    root: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn relative_path(
    value: Option<PathBuf>,
    default: PathBuf,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or(default);
    ensure_relative(&path, key)?;
    Ok(path)
}

fn relative_paths(
    value: Option<Vec<PathBuf>>,
    defaults: &[&str],
    key: &'static str,
) -> Result<Vec<PathBuf>, LoadError> {
    let paths = value.unwrap_or_else(|| defaults.iter().map(PathBuf::from).collect());
    for path in &paths {
        ensure_relative(path, key)?;
    }
    Ok(paths)
}

fn ensure_relative(path: &Path, key: &'static str) -> Result<(), LoadError> {
    if path.is_absolute() {
        return Err(LoadError::invalid(
            key,
            format!("`{}` must be relative to the source tree", path.display()),
        ));
    }
    Ok(())
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
