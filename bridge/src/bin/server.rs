use std::net::SocketAddr;
use std::sync::Arc;

use callflow_audio::{select_engine, JobDispatcher, SynthesisWorker};
use callflow_bridge::{start_server, AppState, BridgeConfig, BridgeError};
use callflow_core::{ArtifactStore, CallFlow, LanguageMap, Links, LlmResponder, ParamSigner};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "info,callflow_core=info,callflow_audio=info,callflow_bridge=info".to_string()
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Defaults + env + optional TOML overlay
    let cfg = BridgeConfig::load();

    let languages = match &cfg.languages_file {
        Some(path) => {
            info!(target = "callflow", path = ?path, "Loading language table");
            LanguageMap::load(path)?
        }
        None => LanguageMap::default(),
    };

    let signer = match &cfg.server.secret_key {
        Some(secret) => ParamSigner::new(secret),
        None => {
            warn!(
                target = "callflow",
                "SECRET_KEY not set; using a per-process secret, links will not survive a restart"
            );
            ParamSigner::ephemeral()
        }
    };
    let base_url = cfg.server.base_url();
    if cfg.server.public_base_url.is_none() {
        warn!(target = "callflow", base_url = %base_url, "PUBLIC_BASE_URL not set; callbacks use the local address");
    }
    let links = Links::new(&base_url, signer)?;

    let store = ArtifactStore::new(&cfg.server.media_root);
    store.ensure_root().await?;

    let responder = Arc::new(LlmResponder::new(cfg.responder.clone())?);
    info!(
        target = "callflow",
        base_url = %cfg.responder.base_url,
        model = %cfg.responder.model,
        "Responder ready"
    );

    let engine = select_engine(&cfg.engine)?;
    let format = engine.format();
    let worker = Arc::new(
        SynthesisWorker::new(engine, store.clone()).with_failure_markers(cfg.poll.fail_fast),
    );
    let dispatcher = Arc::new(JobDispatcher::start(worker, cfg.dispatcher.clone()));

    info!(
        target = "poll",
        max_attempts = cfg.poll.max_attempts,
        delay_secs = cfg.poll.delay_secs,
        fail_fast = cfg.poll.fail_fast,
        worst_case_secs = cfg.poll.worst_case_latency().as_secs(),
        "Poll policy"
    );
    let flow = CallFlow::new(languages, links, cfg.poll.clone(), store, format);
    let state = AppState::new(flow, responder, dispatcher.clone());

    let addr: SocketAddr = cfg
        .server
        .bind_addr()
        .parse()
        .map_err(|e| BridgeError::Config(format!("invalid bind address: {e}")))?;
    let served = start_server(addr, state).await;

    match Arc::try_unwrap(dispatcher) {
        Ok(dispatcher) => dispatcher.shutdown().await,
        Err(_) => warn!(target = "dispatch", "Synthesis pool still shared; skipping drain"),
    }

    served.map_err(|e| e.into())
}
