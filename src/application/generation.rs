//! Regenerate-or-reuse: the single path from an [`ArtifactKey`] to its files.

use std::{sync::Arc, time::Instant};

use metrics::counter;
use tracing::{debug, info};

use crate::{
    cache::{ArtifactCache, FlightRole, SingleFlight},
    config::StylingSettings,
    domain::{artifacts::ArtifactSet, revision::ArtifactKey, types::RenderVariant},
    infra::workspace::WorkspaceProvisioner,
};

use super::error::PreviewError;

const SOURCE: &str = "application::generation";

pub(crate) const METRIC_SINGLE_FLIGHT_JOIN: &str = "revdoc_single_flight_join_total";

type GenerationResult = Result<Arc<ArtifactSet>, PreviewError>;

pub struct ArtifactService {
    cache: Arc<ArtifactCache>,
    flights: SingleFlight<ArtifactKey, GenerationResult>,
    provisioner: Arc<WorkspaceProvisioner>,
    styling: StylingSettings,
    single_flight: bool,
}

impl ArtifactService {
    pub fn new(
        cache: Arc<ArtifactCache>,
        provisioner: Arc<WorkspaceProvisioner>,
        styling: StylingSettings,
        single_flight: bool,
    ) -> Self {
        Self {
            cache,
            flights: SingleFlight::new(),
            provisioner,
            styling,
            single_flight,
        }
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    pub fn provisioner(&self) -> &Arc<WorkspaceProvisioner> {
        &self.provisioner
    }

    pub fn styling_enabled(&self) -> bool {
        self.styling.includes_dir.is_some()
    }

    /// Serve `key` from the cache, generating it on a miss.
    ///
    /// Generation runs on its own task and stores its result in the cache
    /// before completing, so it finishes even if every caller has gone away.
    pub async fn artifacts(&self, key: ArtifactKey) -> GenerationResult {
        if key.variant == RenderVariant::Styled && !self.styling_enabled() {
            return Err(PreviewError::misconfigured(
                "styled rendering requested but no styling includes directory is configured",
            ));
        }

        if let Some(hit) = self.cache.get(&key) {
            debug!(
                target = SOURCE,
                op = "artifacts",
                result = "hit",
                key = %key,
                "Serving cached artifact set"
            );
            return Ok(hit);
        }

        let job = GenerationJob {
            cache: Arc::clone(&self.cache),
            provisioner: Arc::clone(&self.provisioner),
            styling: self.styling.clone(),
            key: key.clone(),
        };

        if !self.single_flight {
            return tokio::spawn(job.run()).await.map_err(|err| {
                PreviewError::generation(format!("generation of {key} did not complete"), err)
            })?;
        }

        let (result, role) = self.flights.run(key.clone(), move || job.run()).await;
        if role == FlightRole::Follower {
            counter!(METRIC_SINGLE_FLIGHT_JOIN, "variant" => key.variant.as_str()).increment(1);
            debug!(
                target = SOURCE,
                op = "artifacts",
                result = "joined",
                key = %key,
                "Joined in-flight generation"
            );
        }
        result?
    }
}

/// Everything one detached generation needs, owned.
struct GenerationJob {
    cache: Arc<ArtifactCache>,
    provisioner: Arc<WorkspaceProvisioner>,
    styling: StylingSettings,
    key: ArtifactKey,
}

impl GenerationJob {
    async fn run(self) -> GenerationResult {
        let started_at = Instant::now();
        let GenerationJob {
            cache,
            provisioner,
            styling,
            key,
        } = self;

        let workspace = provisioner.provision(&key.revision).await?;
        let generator = provisioner.generator();

        if key.variant == RenderVariant::Styled {
            let includes_dir = styling.includes_dir.as_deref().ok_or_else(|| {
                PreviewError::misconfigured("styling includes directory is not configured")
            })?;
            generator
                .apply_styling(workspace.path(), &styling, includes_dir)
                .await?;
        }

        let artifacts = Arc::new(generator.collect(workspace.path()).await?);
        // Removal failures are logged by close; the files are already in memory.
        let _ = workspace.close();

        if artifacts.is_empty() {
            return Err(PreviewError::generation(
                format!("generator produced no output for {key}"),
                std::io::Error::other("output directory is empty"),
            ));
        }

        cache.put(key.clone(), Arc::clone(&artifacts));
        info!(
            target = SOURCE,
            op = "generate",
            result = "ok",
            key = %key,
            files = artifacts.len(),
            bytes = artifacts.total_bytes(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Generated artifact set"
        );
        Ok(artifacts)
    }
}
