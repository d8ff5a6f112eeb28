//! Tracing subscriber installation and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::{
        generation::METRIC_SINGLE_FLIGHT_JOIN,
        live::{METRIC_LIVE_REGENERATION, METRIC_LIVE_REGENERATION_MS},
    },
    cache::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS},
    config::{LogFormat, LoggingSettings},
};

use super::{error::InfraError, generator::METRIC_GENERATION_MS, process::METRIC_COMMAND_FAILURE};

static METRIC_DESCRIPTIONS: Once = Once::new();

const COUNTERS: [(&str, &str); 6] = [
    (
        METRIC_CACHE_HIT,
        "Artifact cache hits, labelled by render variant.",
    ),
    (
        METRIC_CACHE_MISS,
        "Artifact cache misses, labelled by render variant.",
    ),
    (
        METRIC_CACHE_EVICT,
        "Artifact sets evicted to make room, labelled by render variant.",
    ),
    (
        METRIC_SINGLE_FLIGHT_JOIN,
        "Requests that joined a generation already in flight.",
    ),
    (
        METRIC_COMMAND_FAILURE,
        "External commands that failed to spawn, exited badly or timed out.",
    ),
    (
        METRIC_LIVE_REGENERATION,
        "Live-mode regenerations, labelled by result.",
    ),
];

const HISTOGRAMS: [(&str, &str); 2] = [
    (
        METRIC_GENERATION_MS,
        "Generator run latency in milliseconds, API-description dump included.",
    ),
    (
        METRIC_LIVE_REGENERATION_MS,
        "Live-mode regeneration latency in milliseconds.",
    ),
];

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let (fmt_layer, format) = match logging.format {
        LogFormat::Json => (
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .boxed(),
            "json",
        ),
        LogFormat::Compact => (fmt::layer().compact().with_target(true).boxed(), "compact"),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })?;

    info!(
        target = "infra::telemetry",
        op = "telemetry::init",
        level = %logging.level,
        format,
        version = env!("CARGO_PKG_VERSION"),
        "Logging initialised"
    );
    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(name, Unit::Count, description);
        }
        for (name, description) in HISTOGRAMS {
            describe_histogram!(name, Unit::Milliseconds, description);
        }
    });
}
