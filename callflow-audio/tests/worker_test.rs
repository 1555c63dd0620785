use callflow_audio::{JobOutcome, SpeechSynthesizer, SynthesisError, SynthesisWorker};
use callflow_core::{ArtifactName, ArtifactState, ArtifactStore, AudioFormat, SynthesisJob};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Writes `chunks` pieces of `chunk` bytes, sleeping between them
struct ChunkedEngine {
    chunk: usize,
    chunks: usize,
    pause: Duration,
}

impl SpeechSynthesizer for ChunkedEngine {
    fn name(&self) -> &'static str {
        "chunked"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn synthesize(&self, _text: &str, _voice: &str, out: &Path) -> callflow_audio::Result<()> {
        let mut file = std::fs::File::create(out)?;
        for _ in 0..self.chunks {
            file.write_all(&vec![0xAB; self.chunk])?;
            file.flush()?;
            std::thread::sleep(self.pause);
        }
        Ok(())
    }
}

/// Leaves a partial file behind, then fails
struct BrokenEngine;

impl SpeechSynthesizer for BrokenEngine {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn synthesize(&self, _text: &str, _voice: &str, out: &Path) -> callflow_audio::Result<()> {
        std::fs::write(out, b"partial")?;
        Err(SynthesisError::EngineFailed("voice not available".into()))
    }
}

struct SilentEngine;

impl SpeechSynthesizer for SilentEngine {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn synthesize(&self, _text: &str, _voice: &str, out: &Path) -> callflow_audio::Result<()> {
        std::fs::File::create(out)?;
        Ok(())
    }
}

fn job(format: AudioFormat) -> SynthesisJob {
    SynthesisJob {
        text: "Drink warm water with turmeric.".into(),
        language: "hi-IN".into(),
        voice: "hi-IN-SwaraNeural".into(),
        artifact: ArtifactName::generate(format),
    }
}

fn quick_engine() -> Arc<dyn SpeechSynthesizer> {
    Arc::new(ChunkedEngine {
        chunk: 16,
        chunks: 2,
        pause: Duration::from_millis(1),
    })
}

#[tokio::test]
async fn successful_job_publishes_final_file_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let worker = SynthesisWorker::new(quick_engine(), store.clone());
    let job = job(AudioFormat::Mp3);

    assert_eq!(worker.run(job.clone()).await, JobOutcome::Published);
    assert_eq!(store.state(&job.artifact).await, ArtifactState::Ready);
    assert_eq!(std::fs::read(store.path(&job.artifact)).unwrap().len(), 32);
    assert!(!store.temp_path(&job.artifact).exists());
}

#[tokio::test]
async fn failed_job_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let worker = SynthesisWorker::new(Arc::new(BrokenEngine), store.clone());
    let job = job(AudioFormat::Mp3);

    assert_eq!(worker.run(job.clone()).await, JobOutcome::Abandoned);
    assert_eq!(store.state(&job.artifact).await, ArtifactState::Pending);
    assert!(!store.path(&job.artifact).exists());
    assert!(!store.temp_path(&job.artifact).exists());
    assert!(!store.failure_marker_path(&job.artifact).exists());
}

#[tokio::test]
async fn failure_marker_written_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let worker =
        SynthesisWorker::new(Arc::new(BrokenEngine), store.clone()).with_failure_markers(true);
    let job = job(AudioFormat::Mp3);

    assert_eq!(worker.run(job.clone()).await, JobOutcome::Abandoned);
    assert_eq!(store.state(&job.artifact).await, ArtifactState::Failed);
    assert!(!store.path(&job.artifact).exists());
}

#[tokio::test]
async fn empty_output_is_not_published() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let worker = SynthesisWorker::new(Arc::new(SilentEngine), store.clone());
    let job = job(AudioFormat::Wav);

    assert_eq!(worker.run(job.clone()).await, JobOutcome::Abandoned);
    assert!(!store.path(&job.artifact).exists());
    assert!(!store.temp_path(&job.artifact).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_partial_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let chunk = 4096;
    let chunks = 20;
    let engine = Arc::new(ChunkedEngine {
        chunk,
        chunks,
        pause: Duration::from_millis(5),
    });
    let worker = Arc::new(SynthesisWorker::new(engine, store.clone()));
    let job = job(AudioFormat::Mp3);
    let path = store.path(&job.artifact);
    let expected = chunk * chunks;

    let mut readers = Vec::new();
    for _ in 0..4 {
        let path = path.clone();
        readers.push(tokio::spawn(async move {
            let mut seen = 0usize;
            for _ in 0..400 {
                if let Ok(bytes) = tokio::fs::read(&path).await {
                    assert_eq!(bytes.len(), expected, "observed a partial artifact");
                    seen += 1;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            seen
        }));
    }

    let outcome = {
        let worker = Arc::clone(&worker);
        let job = job.clone();
        tokio::spawn(async move { worker.run(job).await })
    };
    assert_eq!(outcome.await.unwrap(), JobOutcome::Published);
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(std::fs::read(&path).unwrap().len(), expected);
}
