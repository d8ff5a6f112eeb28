use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        logging: LoggingOverrides {
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_describe_the_reference_deployment() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 9000);
    assert_eq!(settings.live.addr.port(), 8000);
    assert_eq!(settings.live.debounce, Duration::from_millis(10));
    assert_eq!(settings.live.watch_paths.len(), DEFAULT_WATCH_PATHS.len());
    assert_eq!(settings.cache.capacity.get(), 50);
    assert!(settings.cache.single_flight);
    assert_eq!(settings.process.timeout, Duration::from_secs(900));
    assert_eq!(settings.repository.default_branch, "master");
    assert!(settings.repository.remote_url.is_none());
    assert!(settings.authorization.trusted_authors.is_empty());
    assert!(settings.styling.includes_dir.is_none());
    assert_eq!(settings.diff.source_command, ["diff", "-r", "-u"]);
    assert!(settings.workspace.root.ends_with("revdoc"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        logging: LoggingOverrides {
            log_json: Some(true),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.capacity = Some(0);

    let err = Settings::from_raw(raw).expect_err("capacity must be positive");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.capacity",
            ..
        }
    ));
}

#[test]
fn zero_process_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.process.timeout_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("timeout must be positive");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "process.timeout_seconds",
            ..
        }
    ));
}

#[test]
fn absolute_generator_output_is_rejected() {
    let mut raw = RawSettings::default();
    raw.generator.output_dir = Some(PathBuf::from("/var/out"));

    let err = Settings::from_raw(raw).expect_err("output must be relative");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "generator.output_dir",
            ..
        }
    ));
}

#[test]
fn empty_api_description_command_disables_the_step() {
    let mut raw = RawSettings::default();
    raw.generator.api_description_command = Some(Vec::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.generator.api_description_command.is_none());
}

#[test]
fn hosting_base_gains_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.hosting.api_base = Some("https://api.example.test/repos/acme/docs".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    let base = settings.hosting.api_base.expect("base configured");
    assert_eq!(base.as_str(), "https://api.example.test/repos/acme/docs/");
}

#[test]
fn trusted_authors_are_trimmed_and_deduplicated() {
    let mut raw = RawSettings::default();
    raw.authorization.trusted_authors = Some(vec![
        " alice ".to_string(),
        "bob".to_string(),
        String::new(),
    ]);

    let overrides = ServeOverrides {
        trusted_authors: vec!["alice".to_string(), "carol".to_string()],
        ..Default::default()
    };
    raw.apply_serve_overrides(&overrides);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.authorization.trusted_authors,
        ["alice", "bob", "carol"]
    );
}

#[test]
fn branch_allowlist_covers_default_and_drafts() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let repository = &settings.repository;

    assert!(repository.is_allowed_branch("master"));
    assert!(repository.is_allowed_branch("drafts/e2e"));
    assert!(repository.is_allowed_branch("attic/drafts/old"));
    assert!(!repository.is_allowed_branch("drafts/"));
    assert!(!repository.is_allowed_branch("feature/x"));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["revdoc"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "revdoc",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--trusted-author",
        "alice",
        "--trusted-author",
        "bob",
        "--cache-single-flight=false",
        "--log-json=true",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.trusted_authors, ["alice", "bob"]);
            assert_eq!(serve.overrides.single_flight, Some(false));
            assert_eq!(serve.overrides.logging.log_json, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_watch_overrides() {
    let args = CliArgs::parse_from([
        "revdoc",
        "watch",
        "--live-port",
        "8080",
        "--live-root",
        "/src/docs",
        "--live-debounce-ms",
        "25",
    ]);

    let Some(Command::Watch(watch)) = args.command else {
        panic!("wrong command parsed");
    };

    let mut raw = RawSettings::default();
    raw.apply_watch_overrides(&watch.overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.live.addr.port(), 8080);
    assert_eq!(settings.live.root.as_deref(), Some(Path::new("/src/docs")));
    assert_eq!(settings.live.debounce, Duration::from_millis(25));
}

const ENV_KEYS: [&str; 2] = [
    "REVDOC__CACHE__CAPACITY",
    "REVDOC__AUTHORIZATION__TRUSTED_AUTHORS",
];

fn clear_env() {
    for key in ENV_KEYS {
        // SAFETY: every test touching the process environment is #[serial].
        unsafe { env::remove_var(key) };
    }
}

#[test]
#[serial_test::serial]
fn environment_overrides_config_file() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let file = dir.path().join("revdoc.toml");
    std::fs::write(
        &file,
        "[cache]\ncapacity = 3\nsingle_flight = false\n\n[repository]\nremote_url = \"https://example.test/docs.git\"\n",
    )
    .expect("write config");

    clear_env();
    // SAFETY: serialized with every other test that touches the environment.
    unsafe {
        env::set_var("REVDOC__CACHE__CAPACITY", "7");
        env::set_var("REVDOC__AUTHORIZATION__TRUSTED_AUTHORS", "alice,bob");
    }

    let cli = CliArgs {
        config_file: Some(file),
        command: None,
    };
    let result = load(&cli);
    clear_env();
    let settings = result.expect("settings load");

    assert_eq!(settings.cache.capacity.get(), 7);
    assert!(!settings.cache.single_flight);
    assert_eq!(
        settings.repository.remote_url.as_deref(),
        Some("https://example.test/docs.git")
    );
    assert_eq!(settings.authorization.trusted_authors, ["alice", "bob"]);
}

#[test]
#[serial_test::serial]
fn missing_explicit_config_file_is_an_error() {
    clear_env();
    let cli = CliArgs {
        config_file: Some(PathBuf::from("/nonexistent/revdoc.toml")),
        command: None,
    };

    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}
