// Speech synthesis jobs: engines, the worker that publishes artifacts, and the
// bounded pool that runs workers off the request path

pub mod dispatcher;
pub mod engine;
pub mod worker;

pub use callflow_core::{DispatchError, JobSink, SynthesisJob};
pub use dispatcher::{DispatcherConfig, JobDispatcher};
pub use engine::{select_engine, EdgeTtsEngine, EngineConfig, EspeakEngine, SpeechSynthesizer};
pub use worker::{JobOutcome, SynthesisWorker};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("No synthesis engine found: {0}")]
    EngineMissing(String),

    #[error("Synthesis engine failed: {0}")]
    EngineFailed(String),

    #[error("Synthesis produced no audio")]
    EmptyOutput,

    #[error("Synthesis task panicked: {0}")]
    Join(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Artifact store error: {0}")]
    Store(#[from] callflow_core::CallflowError),
}
pub type Result<T> = std::result::Result<T, SynthesisError>;
