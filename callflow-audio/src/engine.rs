//! Out-of-process speech synthesis engines.
//!
//! Engines are local CLIs run to completion on a blocking thread:
//! - Prefer edge-tts (neural voices, mp3 output)
//! - Fallback to espeak-ng (widely available, wav output)
//!
//! Env overrides:
//! - EDGE_TTS_BIN
//! - ESPEAK_BIN

use crate::{Result, SynthesisError};
use callflow_core::AudioFormat;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info};

/// Writes the audio for `text` to `out`. Called on a blocking thread.
pub trait SpeechSynthesizer: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Encoding of the files this engine writes
    fn format(&self) -> AudioFormat;

    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub edge_tts_bin: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            edge_tts_bin: get_from_env_or_path("EDGE_TTS_BIN", "edge-tts"),
            espeak_bin: get_from_env_or_path("ESPEAK_BIN", "espeak-ng")
                .or_else(|| get_from_path("espeak")),
        }
    }
}

fn get_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    get_from_path(default_bin)
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    let paths = std::env::var_os("PATH")?;
    find_in(&paths, bin)
}

/// First `dir/bin` that exists in a PATH-style list
fn find_in(paths: &OsStr, bin: &str) -> Option<PathBuf> {
    std::env::split_paths(paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

/// Pick the best available engine, edge-tts first
pub fn select_engine(cfg: &EngineConfig) -> Result<Arc<dyn SpeechSynthesizer>> {
    if let Some(bin) = &cfg.edge_tts_bin {
        info!(target = "synth", bin = ?bin, "Detected edge-tts binary");
        return Ok(Arc::new(EdgeTtsEngine::new(bin.clone())));
    }
    if let Some(bin) = &cfg.espeak_bin {
        info!(target = "synth", bin = ?bin, "Detected espeak-ng binary");
        return Ok(Arc::new(EspeakEngine::new(bin.clone())));
    }
    Err(SynthesisError::EngineMissing(
        "install edge-tts or espeak-ng, or set EDGE_TTS_BIN / ESPEAK_BIN".into(),
    ))
}

fn run(mut cmd: Command, engine: &str) -> Result<()> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    debug!(target = "synth", command = ?cmd, "Running {}", engine);
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(SynthesisError::EngineFailed(format!(
            "{} failed: {}",
            engine,
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

/// `edge-tts --voice <voice> --text=<text> --write-media <out>`
#[derive(Clone, Debug)]
pub struct EdgeTtsEngine {
    bin: PathBuf,
}

impl EdgeTtsEngine {
    pub fn new(bin: PathBuf) -> Self {
        Self { bin }
    }

    /// Text is passed as `--text=<text>` so a leading `-` is never read as a flag
    fn command(&self, text: &str, voice: &str, out: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--voice").arg(voice);
        cmd.arg(format!("--text={text}"));
        cmd.arg("--write-media").arg(out);
        cmd
    }
}

impl SpeechSynthesizer for EdgeTtsEngine {
    fn name(&self) -> &'static str {
        "edge-tts"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
        run(self.command(text, voice, out), self.name())
    }
}

/// espeak-ng takes a language code rather than a neural voice name
#[derive(Clone, Debug)]
pub struct EspeakEngine {
    bin: PathBuf,
}

impl EspeakEngine {
    pub fn new(bin: PathBuf) -> Self {
        Self { bin }
    }

    fn command(&self, text: &str, voice: &str, out: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        let v = espeak_voice(voice);
        if !v.is_empty() {
            cmd.arg("-v").arg(v);
        }
        cmd.arg("-w").arg(out);
        // End of options: reply text may start with '-'
        cmd.arg("--").arg(text);
        cmd
    }
}

pub(crate) fn espeak_voice(voice: &str) -> &str {
    voice.split('-').next().unwrap_or(voice)
}

impl SpeechSynthesizer for EspeakEngine {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
        run(self.command(text, voice, out), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn espeak_voice_uses_primary_subtag() {
        assert_eq!(espeak_voice("hi-IN-SwaraNeural"), "hi");
        assert_eq!(espeak_voice("en"), "en");
    }

    #[test]
    fn no_engine_is_an_error() {
        let err = select_engine(&EngineConfig::default()).err().expect("no engine");
        assert!(matches!(err, SynthesisError::EngineMissing(_)));
    }

    #[test]
    fn edge_tts_preferred_over_espeak() {
        let cfg = EngineConfig {
            edge_tts_bin: Some(PathBuf::from("/usr/bin/edge-tts")),
            espeak_bin: Some(PathBuf::from("/usr/bin/espeak-ng")),
        };
        let engine = select_engine(&cfg).expect("engine");
        assert_eq!(engine.name(), "edge-tts");
        assert_eq!(engine.format(), AudioFormat::Mp3);

        let cfg = EngineConfig {
            edge_tts_bin: None,
            ..cfg
        };
        let engine = select_engine(&cfg).expect("engine");
        assert_eq!(engine.format(), AudioFormat::Wav);
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn path_lookup_walks_every_entry() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("espeak-ng"), b"#!/bin/sh\n").unwrap();
        let paths =
            std::env::join_paths([first.path(), Path::new("/nonexistent-dir"), second.path()])
                .unwrap();

        assert_eq!(
            find_in(&paths, "espeak-ng"),
            Some(second.path().join("espeak-ng"))
        );
        assert_eq!(find_in(&paths, "edge-tts"), None);
        // Directories are not binaries
        std::fs::create_dir(first.path().join("edge-tts")).unwrap();
        assert_eq!(find_in(&paths, "edge-tts"), None);
    }

    #[test]
    fn explicit_paths_skip_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("edge-tts");
        std::fs::write(&bin, b"").unwrap();
        assert_eq!(get_from_path(bin.to_str().unwrap()), Some(bin.clone()));
        let missing = dir.path().join("espeak-ng");
        assert_eq!(get_from_path(missing.to_str().unwrap()), None);
    }

    #[test]
    fn espeak_ends_options_before_text() {
        let engine = EspeakEngine::new(PathBuf::from("espeak-ng"));
        let cmd = engine.command("-Drink ginger tea", "hi-IN-SwaraNeural", Path::new("o.wav.tmp"));
        assert_eq!(
            args(&cmd),
            ["-v", "hi", "-w", "o.wav.tmp", "--", "-Drink ginger tea"]
        );
    }

    #[test]
    fn edge_tts_binds_text_to_its_flag() {
        let engine = EdgeTtsEngine::new(PathBuf::from("edge-tts"));
        let cmd = engine.command("-Drink ginger tea", "hi-IN-SwaraNeural", Path::new("o.mp3.tmp"));
        assert_eq!(
            args(&cmd),
            [
                "--voice",
                "hi-IN-SwaraNeural",
                "--text=-Drink ginger tea",
                "--write-media",
                "o.mp3.tmp"
            ]
        );
    }

    #[test]
    fn failing_binary_reports_engine_failure() {
        // `false` exits non-zero without writing anything
        let Some(bin) = get_from_path("false") else {
            return;
        };
        let engine = EdgeTtsEngine::new(bin);
        let dir = tempfile::tempdir().unwrap();
        let err = engine
            .synthesize("hello", "en-IN-NeerjaNeural", &dir.path().join("x.mp3.tmp"))
            .unwrap_err();
        assert!(matches!(err, SynthesisError::EngineFailed(_)));
    }
}
