//! Bounded worker pool behind the [`JobSink`] seam.
//!
//! `dispatch` never waits: a full queue is rejected immediately and the
//! caller decides what that means for the call.

use crate::worker::SynthesisWorker;
use callflow_core::{DispatchError, JobSink, SynthesisJob};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_depth: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: std::env::var("SYNTH_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(4),
            queue_depth: std::env::var("SYNTH_QUEUE_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(64),
        }
    }
}

pub struct JobDispatcher {
    tx: mpsc::Sender<SynthesisJob>,
    handles: Vec<JoinHandle<()>>,
    queue_depth: usize,
}

impl JobDispatcher {
    /// Spawn the worker loops. Must be called inside a tokio runtime.
    pub fn start(worker: Arc<SynthesisWorker>, cfg: DispatcherConfig) -> Self {
        let workers = cfg.workers.max(1);
        let queue_depth = cfg.queue_depth.max(1);
        let (tx, rx) = mpsc::channel::<SynthesisJob>(queue_depth);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers)
            .map(|id| {
                let rx = Arc::clone(&rx);
                let worker = Arc::clone(&worker);
                tokio::spawn(async move {
                    loop {
                        let job = { rx.lock().await.recv().await };
                        let Some(job) = job else { break };
                        debug!(target = "dispatch", worker = id, file = %job.artifact, "Job picked up");
                        worker.run(job).await;
                    }
                    debug!(target = "dispatch", worker = id, "Worker stopped");
                })
            })
            .collect();

        info!(target = "dispatch", workers, queue_depth, "Synthesis pool started");
        Self {
            tx,
            handles,
            queue_depth,
        }
    }

    /// Jobs accepted but not yet picked up by a worker
    pub fn queued(&self) -> usize {
        self.queue_depth - self.tx.capacity()
    }

    /// Stop accepting jobs and wait for queued ones to finish
    pub async fn shutdown(self) {
        drop(self.tx);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!(target = "dispatch", "Synthesis pool drained");
    }
}

impl JobSink for JobDispatcher {
    fn dispatch(&self, job: SynthesisJob) -> Result<(), DispatchError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                Err(DispatchError::QueueFull(job.artifact.file_name()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }
}
