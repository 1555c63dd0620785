// Callflow Core Library
// Turn-based voice dialog over stateless call-control callbacks

pub mod artifact;
pub mod document;
pub mod flow;
pub mod job;
pub mod language;
pub mod links;
pub mod poll;
pub mod responder;
pub mod signing;

// Export core types
pub use artifact::{ArtifactName, ArtifactState, ArtifactStore, AudioFormat};
pub use document::{CallDocument, Gather, GatherInput, Verb};
pub use flow::CallFlow;
pub use job::{DispatchError, JobSink, SynthesisJob};
pub use language::LanguageMap;
pub use links::Links;
pub use poll::{PollDecision, PollPolicy};
pub use responder::{LlmResponder, LlmResponderConfig, Responder, NO_INPUT};
pub use signing::ParamSigner;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallflowError {
    #[error("Language table error: {0}")]
    LanguageTable(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Invalid artifact name: {0}")]
    InvalidArtifact(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Responder error: {0}")]
    Responder(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, CallflowError>;
