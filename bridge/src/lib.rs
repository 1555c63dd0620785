//! HTTP surface for the call flow: telephony callbacks, published media and
//! health, wired over one shared [`CallFlow`].

pub mod config;
pub mod media;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use callflow_core::{CallFlow, JobSink, Responder};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::{BridgeConfig, ServerConfig};

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("call flow error: {0}")]
    Core(#[from] callflow_core::CallflowError),
    #[error("synthesis error: {0}")]
    Synthesis(#[from] callflow_audio::SynthesisError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Shared by every request. Nothing per-call lives here.
#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<CallFlow>,
    pub responder: Arc<dyn Responder>,
    pub jobs: Arc<dyn JobSink>,
}

impl AppState {
    pub fn new(flow: CallFlow, responder: Arc<dyn Responder>, jobs: Arc<dyn JobSink>) -> Self {
        Self {
            flow: Arc::new(flow),
            responder,
            jobs,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/voice", get(routes::voice).post(routes::voice))
        .route("/set_language", get(routes::set_language).post(routes::set_language))
        .route("/ask_query", get(routes::ask_query).post(routes::ask_query))
        .route("/process", get(routes::process).post(routes::process))
        .route("/play", get(routes::play).post(routes::play))
        .route("/media/:filename", get(media::serve_media))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target = "callflow", addr = %addr, "Callflow server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(target = "callflow", "Shutdown signal received");
        })
        .await?;
    Ok(())
}
