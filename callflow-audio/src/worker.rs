//! Synthesis worker: run the engine into a temporary file, then publish it
//! under its final name with one rename. A reader polling the final name sees
//! either nothing or the complete file.

use crate::engine::SpeechSynthesizer;
use crate::{Result, SynthesisError};
use callflow_core::{ArtifactStore, SynthesisJob};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Published,
    Abandoned,
}

pub struct SynthesisWorker {
    engine: Arc<dyn SpeechSynthesizer>,
    store: ArtifactStore,
    failure_markers: bool,
}

impl SynthesisWorker {
    pub fn new(engine: Arc<dyn SpeechSynthesizer>, store: ArtifactStore) -> Self {
        Self {
            engine,
            store,
            failure_markers: false,
        }
    }

    /// Leave a `.failed` marker next to abandoned artifacts so pollers can stop early
    pub fn with_failure_markers(mut self, enabled: bool) -> Self {
        self.failure_markers = enabled;
        self
    }

    /// Never returns an error: failures are logged and leave no final file
    pub async fn run(&self, job: SynthesisJob) -> JobOutcome {
        let start = Instant::now();
        match self.synthesize(&job).await {
            Ok(bytes) => {
                info!(
                    target = "synth",
                    file = %job.artifact,
                    engine = self.engine.name(),
                    bytes,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Artifact published"
                );
                JobOutcome::Published
            }
            Err(e) => {
                warn!(
                    target = "synth",
                    file = %job.artifact,
                    engine = self.engine.name(),
                    error = %e,
                    "Synthesis failed; artifact abandoned"
                );
                if let Err(e) = self.store.discard_temp(&job.artifact).await {
                    warn!(target = "synth", file = %job.artifact, error = %e, "Failed to remove temp file");
                }
                if self.failure_markers {
                    if let Err(e) = self.store.mark_failed(&job.artifact).await {
                        warn!(target = "synth", file = %job.artifact, error = %e, "Failed to write failure marker");
                    }
                }
                JobOutcome::Abandoned
            }
        }
    }

    async fn synthesize(&self, job: &SynthesisJob) -> Result<u64> {
        let tmp = self.store.temp_path(&job.artifact);
        debug!(target = "synth", file = %job.artifact, voice = %job.voice, "Synthesizing");

        let engine = Arc::clone(&self.engine);
        let text = job.text.clone();
        let voice = job.voice.clone();
        let out = tmp.clone();
        task::spawn_blocking(move || engine.synthesize(&text, &voice, &out))
            .await
            .map_err(|e| SynthesisError::Join(e.to_string()))??;

        let len = tokio::fs::metadata(&tmp).await?.len();
        if len == 0 {
            return Err(SynthesisError::EmptyOutput);
        }
        self.store.publish(&job.artifact).await?;
        Ok(len)
    }
}
