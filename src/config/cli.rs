use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the revdoc binary.
#[derive(Debug, Parser)]
#[command(
    name = "revdoc",
    version,
    about = "Preview generated documentation at any branch or pull request"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "REVDOC_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve previews and diffs of arbitrary revisions.
    Serve(Box<ServeArgs>),
    /// Regenerate the working tree on change and serve the latest output.
    Watch(WatchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub overrides: WatchOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the preview listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the preview listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the canonical repository clone URL.
    #[arg(long = "repository-remote-url", value_name = "URL")]
    pub remote_url: Option<String>,

    /// Keep the shared mirror in this directory instead of a temporary one.
    #[arg(long = "repository-mirror-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub mirror_dir: Option<PathBuf>,

    /// Override the revision-hosting API base URL.
    #[arg(long = "hosting-api-base", value_name = "URL")]
    pub hosting_api_base: Option<String>,

    /// Access token appended to revision-hosting API requests.
    #[arg(long = "hosting-access-token", env = "REVDOC_ACCESS_TOKEN", value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Add a trusted change-request author (repeatable).
    #[arg(long = "trusted-author", value_name = "LOGIN")]
    pub trusted_authors: Vec<String>,

    /// Directory of include files enabling the styled render variant.
    #[arg(long = "styling-includes-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub includes_dir: Option<PathBuf>,

    /// Override the number of cached revisions per render variant.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<u64>,

    /// Toggle sharing one generation between concurrent requests for the same revision.
    #[arg(
        long = "cache-single-flight",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub single_flight: Option<bool>,

    /// Override the deadline applied to every external command.
    #[arg(long = "process-timeout-seconds", value_name = "SECONDS")]
    pub process_timeout_seconds: Option<u64>,

    /// Override the directory under which workspaces are created.
    #[arg(long = "workspace-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub workspace_root: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct WatchOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the live listener host.
    #[arg(long = "live-host", value_name = "HOST")]
    pub live_host: Option<String>,

    /// Override the live listener port.
    #[arg(long = "live-port", value_name = "PORT")]
    pub live_port: Option<u16>,

    /// Source tree to watch; defaults to the enclosing git checkout.
    #[arg(long = "live-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Override the debounce window in milliseconds.
    #[arg(long = "live-debounce-ms", value_name = "MILLIS")]
    pub debounce_ms: Option<u64>,

    /// Override the deadline applied to every external command.
    #[arg(long = "process-timeout-seconds", value_name = "SECONDS")]
    pub process_timeout_seconds: Option<u64>,
}
