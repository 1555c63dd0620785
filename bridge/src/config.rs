use std::fs;
use std::path::{Path, PathBuf};

use callflow_audio::{DispatcherConfig, EngineConfig};
use callflow_core::{LlmResponderConfig, PollPolicy};

/// High-level configuration for the callflow server
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub poll: PollPolicy,
    pub dispatcher: DispatcherConfig,
    pub responder: LlmResponderConfig,
    pub engine: EngineConfig,
    /// Optional TOML language table replacing the built-in one
    pub languages_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL the telephony platform calls back on
    pub public_base_url: Option<String>,
    pub secret_key: Option<String>,
    pub media_root: PathBuf,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_nonempty(key).and_then(|v| v.trim().parse::<T>().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_nonempty(key).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env_nonempty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("PORT").unwrap_or(5000),
            public_base_url: env_nonempty("PUBLIC_BASE_URL").or_else(|| env_nonempty("NGROK_HOST")),
            secret_key: env_nonempty("SECRET_KEY"),
            media_root: env_nonempty("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public base URL, or a local one built from the bind address
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.clone(),
            Some(host) => format!("https://{}", host.trim_end_matches('/')),
            None => {
                let host = if self.host == "0.0.0.0" {
                    "127.0.0.1"
                } else {
                    self.host.as_str()
                };
                format!("http://{}:{}", host, self.port)
            }
        }
    }
}

fn poll_from_env() -> PollPolicy {
    let d = PollPolicy::default();
    PollPolicy {
        max_attempts: env_parse("MAX_ATTEMPTS").unwrap_or(d.max_attempts),
        delay_secs: env_parse("POLL_DELAY_SECS").unwrap_or(d.delay_secs),
        initial_pause_secs: env_parse("INITIAL_PAUSE_SECS").unwrap_or(d.initial_pause_secs),
        fail_fast: env_bool("FAIL_FAST").unwrap_or(d.fail_fast),
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        // Every section already considers its env vars
        Self {
            server: ServerConfig::default(),
            poll: poll_from_env(),
            dispatcher: DispatcherConfig::default(),
            responder: LlmResponderConfig::default(),
            engine: EngineConfig::from_env(),
            languages_file: env_nonempty("LANGUAGES_FILE").map(PathBuf::from),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file (path via CALLFLOW_CONFIG or ./callflow.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("CALLFLOW_CONFIG").unwrap_or_else(|_| "callflow.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target = "callflow", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => Self::overlay_str(&s, default),
            Err(e) => {
                tracing::warn!(target = "callflow", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Overlay a TOML document onto `base`. Parse errors keep `base`.
    pub fn overlay_str(s: &str, base: Self) -> Self {
        match toml::from_str::<CallflowToml>(s) {
            Ok(t) => t.overlay(base),
            Err(e) => {
                tracing::warn!(target = "callflow", error = %e, "Failed to parse TOML; using defaults");
                base
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct CallflowToml {
    pub languages_file: Option<PathBuf>,
    pub server: Option<ServerToml>,
    pub poll: Option<PollToml>,
    pub dispatcher: Option<DispatcherToml>,
    pub responder: Option<ResponderToml>,
    pub engine: Option<EngineToml>,
}

impl CallflowToml {
    fn overlay(self, mut base: BridgeConfig) -> BridgeConfig {
        if let Some(p) = self.languages_file {
            base.languages_file = Some(p);
        }
        if let Some(s) = self.server {
            s.apply(&mut base.server);
        }
        if let Some(p) = self.poll {
            p.apply(&mut base.poll);
        }
        if let Some(d) = self.dispatcher {
            d.apply(&mut base.dispatcher);
        }
        if let Some(r) = self.responder {
            r.apply(&mut base.responder);
        }
        if let Some(e) = self.engine {
            e.apply(&mut base.engine);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ServerToml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub secret_key: Option<String>,
    pub media_root: Option<PathBuf>,
}
impl ServerToml {
    fn apply(self, s: &mut ServerConfig) {
        if let Some(x) = self.host {
            s.host = x;
        }
        if let Some(x) = self.port {
            s.port = x;
        }
        if let Some(x) = self.public_base_url {
            s.public_base_url = Some(x);
        }
        if let Some(x) = self.secret_key {
            s.secret_key = Some(x);
        }
        if let Some(x) = self.media_root {
            s.media_root = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct PollToml {
    pub max_attempts: Option<u32>,
    pub delay_secs: Option<u32>,
    pub initial_pause_secs: Option<u32>,
    pub fail_fast: Option<bool>,
}
impl PollToml {
    fn apply(self, p: &mut PollPolicy) {
        if let Some(x) = self.max_attempts {
            p.max_attempts = x;
        }
        if let Some(x) = self.delay_secs {
            p.delay_secs = x;
        }
        if let Some(x) = self.initial_pause_secs {
            p.initial_pause_secs = x;
        }
        if let Some(x) = self.fail_fast {
            p.fail_fast = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct DispatcherToml {
    pub workers: Option<usize>,
    pub queue_depth: Option<usize>,
}
impl DispatcherToml {
    fn apply(self, d: &mut DispatcherConfig) {
        if let Some(x) = self.workers {
            d.workers = x.max(1);
        }
        if let Some(x) = self.queue_depth {
            d.queue_depth = x.max(1);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ResponderToml {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub temperature: Option<f32>,
}
impl ResponderToml {
    fn apply(self, r: &mut LlmResponderConfig) {
        if let Some(x) = self.base_url {
            r.base_url = x;
        }
        if let Some(x) = self.model {
            r.model = x;
        }
        if let Some(x) = self.api_key {
            r.api_key = Some(x);
        }
        if let Some(x) = self.request_timeout_ms {
            r.request_timeout_ms = x;
        }
        if let Some(x) = self.temperature {
            r.temperature = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct EngineToml {
    pub edge_tts_bin: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
}
impl EngineToml {
    fn apply(self, e: &mut EngineConfig) {
        if let Some(x) = self.edge_tts_bin {
            e.edge_tts_bin = Some(x);
        }
        if let Some(x) = self.espeak_bin {
            e.espeak_bin = Some(x);
        }
    }
}
