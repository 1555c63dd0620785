//! Synthesis jobs and the non-blocking seam the controller hands them to.

use crate::artifact::ArtifactName;
use thiserror::Error;

/// One text → audio unit of work. Its destination is unique per turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisJob {
    pub text: String,
    pub language: String,
    pub voice: String,
    pub artifact: ArtifactName,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("synthesis queue full, rejected {0}")]
    QueueFull(String),

    #[error("synthesis pool is shut down")]
    Closed,
}

/// Accepts a job and returns at once. Implementations must never wait for the
/// job to run; completion is observable only through the artifact store.
pub trait JobSink: Send + Sync {
    fn dispatch(&self, job: SynthesisJob) -> Result<(), DispatchError>;
}
