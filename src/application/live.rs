//! Live regeneration of a working tree.
//!
//! One background loop owns regeneration. Triggers bump a pending counter
//! before they are queued, and the loop only lowers it once the
//! regeneration covering them has published its snapshot, so a reader that
//! waits for the counter to reach zero always sees output at least as new as
//! the last change it could have observed.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{domain::artifacts::ArtifactSet, infra::generator::Generator};

use super::error::PreviewError;

const SOURCE: &str = "application::live";

pub(crate) const METRIC_LIVE_REGENERATION: &str = "revdoc_live_regeneration_total";
pub(crate) const METRIC_LIVE_REGENERATION_MS: &str = "revdoc_live_regeneration_ms";

pub type Snapshot = Result<Arc<ArtifactSet>, PreviewError>;

#[async_trait]
pub trait Regenerate: Send + Sync + 'static {
    async fn regenerate(&self) -> Result<ArtifactSet, PreviewError>;
}

/// Runs the generator in place over the watched tree.
pub struct LiveGenerator {
    generator: Generator,
    root: PathBuf,
}

impl LiveGenerator {
    pub fn new(generator: Generator, root: PathBuf) -> Self {
        Self { generator, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Regenerate for LiveGenerator {
    async fn regenerate(&self) -> Result<ArtifactSet, PreviewError> {
        self.generator.generate(&self.root).await?;
        Ok(self.generator.collect(&self.root).await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePhase {
    Idle,
    Pending,
    Regenerating,
}

impl LivePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            LivePhase::Idle => "idle",
            LivePhase::Pending => "pending",
            LivePhase::Regenerating => "regenerating",
        }
    }
}

#[derive(Debug, Clone)]
struct LiveState {
    pending: usize,
    phase: LivePhase,
    snapshot: Option<Snapshot>,
    generation: u64,
}

/// Cloneable handle for reporting changes, safe to use from non-async threads.
#[derive(Clone)]
pub struct LiveTrigger {
    state: Arc<watch::Sender<LiveState>>,
    events: mpsc::UnboundedSender<()>,
}

impl LiveTrigger {
    pub fn trigger(&self) {
        self.state.send_modify(|state| {
            state.pending += 1;
            if state.phase == LivePhase::Idle {
                state.phase = LivePhase::Pending;
            }
        });
        if self.events.send(()).is_err() {
            // Loop is gone; undo so readers are not stranded.
            self.state
                .send_modify(|state| state.pending = state.pending.saturating_sub(1));
        }
    }
}

pub struct LiveCoordinator {
    trigger: LiveTrigger,
    task: JoinHandle<()>,
}

impl LiveCoordinator {
    /// Start the loop; the first regeneration begins immediately and readers
    /// wait for it.
    pub fn start<R: Regenerate>(regenerator: Arc<R>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(LiveState {
            pending: 1,
            phase: LivePhase::Regenerating,
            snapshot: None,
            generation: 0,
        });
        let state = Arc::new(state);
        let (events, receiver) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_loop(
            regenerator,
            Arc::clone(&state),
            receiver,
            debounce,
        ));

        Self {
            trigger: LiveTrigger { state, events },
            task,
        }
    }

    pub fn trigger(&self) {
        self.trigger.trigger();
    }

    pub fn trigger_handle(&self) -> LiveTrigger {
        self.trigger.clone()
    }

    pub fn phase(&self) -> LivePhase {
        self.trigger.state.borrow().phase
    }

    pub fn pending(&self) -> usize {
        self.trigger.state.borrow().pending
    }

    /// Number of regenerations completed so far.
    pub fn generation(&self) -> u64 {
        self.trigger.state.borrow().generation
    }

    /// Wait for outstanding triggers to drain, then read the snapshot.
    pub async fn current(&self) -> Snapshot {
        let mut receiver = self.trigger.state.subscribe();
        let state = receiver
            .wait_for(|state| state.pending == 0)
            .await
            .map_err(|err| PreviewError::generation("live regeneration stopped", err))?;
        match &state.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => Err(PreviewError::misconfigured(
                "live regeneration has not produced a snapshot",
            )),
        }
    }
}

impl Drop for LiveCoordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_loop<R: Regenerate>(
    regenerator: Arc<R>,
    state: Arc<watch::Sender<LiveState>>,
    mut events: mpsc::UnboundedReceiver<()>,
    debounce: Duration,
) {
    // Initial build, covering the counter's starting value.
    regenerate_once(regenerator.as_ref(), &state, 1).await;

    while events.recv().await.is_some() {
        // Sliding window: every further event restarts it.
        loop {
            match tokio::time::timeout(debounce, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) | Err(_) => break,
            }
        }
        while events.try_recv().is_ok() {}

        let claimed = state.borrow().pending;
        regenerate_once(regenerator.as_ref(), &state, claimed).await;
    }

    debug!(target = SOURCE, op = "live::loop", "Trigger channel closed");
}

async fn regenerate_once<R: Regenerate>(
    regenerator: &R,
    state: &watch::Sender<LiveState>,
    claimed: usize,
) {
    state.send_modify(|state| state.phase = LivePhase::Regenerating);
    let started_at = Instant::now();

    let snapshot = regenerator.regenerate().await.map(Arc::new);
    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    let result = if snapshot.is_ok() { "ok" } else { "error" };
    counter!(METRIC_LIVE_REGENERATION, "result" => result).increment(1);
    histogram!(METRIC_LIVE_REGENERATION_MS).record(elapsed_ms as f64);

    match &snapshot {
        Ok(artifacts) => info!(
            target = SOURCE,
            op = "live::regenerate",
            result,
            triggers = claimed,
            files = artifacts.len(),
            elapsed_ms,
            "Regenerated working tree"
        ),
        Err(err) => warn!(
            target = SOURCE,
            op = "live::regenerate",
            result,
            triggers = claimed,
            elapsed_ms,
            error = %err,
            "Regeneration failed; serving the error until the next change"
        ),
    }

    state.send_modify(|state| {
        state.snapshot = Some(snapshot);
        state.generation += 1;
        state.pending = state.pending.saturating_sub(claimed);
        state.phase = if state.pending > 0 {
            LivePhase::Pending
        } else {
            LivePhase::Idle
        };
    });
}
