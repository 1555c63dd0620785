//! Audio artifacts under the media root.
//!
//! An artifact is written to `<name>.tmp` and renamed into place, so a reader
//! of `<name>` sees either nothing or the complete file. With failure markers
//! enabled an abandoned job leaves `<name>.failed` instead.

use crate::{CallflowError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

const PREFIX: &str = "resp_";
const ID_LEN: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            _ => None,
        }
    }
}

/// `resp_<32 hex>.<ext>`, one per turn
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    id: String,
    format: AudioFormat,
}

impl ArtifactName {
    pub fn generate(format: AudioFormat) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            format,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn file_name(&self) -> String {
        format!("{PREFIX}{}.{}", self.id, self.format.extension())
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

impl FromStr for ArtifactName {
    type Err = CallflowError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CallflowError::InvalidArtifact(s.to_string());
        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (id, ext) = rest.split_once('.').ok_or_else(invalid)?;
        if id.len() != ID_LEN
            || !id
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(invalid());
        }
        let format = AudioFormat::from_extension(ext)
            .filter(|f| f.extension() == ext)
            .ok_or_else(invalid)?;
        Ok(Self {
            id: id.to_string(),
            format,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactState {
    Ready,
    Pending,
    Failed,
}

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn path(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(name.file_name())
    }

    pub fn temp_path(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(format!("{}.tmp", name.file_name()))
    }

    pub fn failure_marker_path(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(format!("{}.failed", name.file_name()))
    }

    /// Existence check used by the poller. IO errors read as pending.
    pub async fn state(&self, name: &ArtifactName) -> ArtifactState {
        if exists(&self.path(name)).await {
            ArtifactState::Ready
        } else if exists(&self.failure_marker_path(name)).await {
            ArtifactState::Failed
        } else {
            ArtifactState::Pending
        }
    }

    /// Rename the temporary file into place in a single filesystem operation
    pub async fn publish(&self, name: &ArtifactName) -> Result<()> {
        tokio::fs::rename(self.temp_path(name), self.path(name)).await?;
        Ok(())
    }

    /// Remove a leftover temporary file; absent is fine
    pub async fn discard_temp(&self, name: &ArtifactName) -> Result<()> {
        match tokio::fs::remove_file(self.temp_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn mark_failed(&self, name: &ArtifactName) -> Result<()> {
        tokio::fs::write(self.failure_marker_path(name), b"failed").await?;
        Ok(())
    }
}

async fn exists(path: &Path) -> bool {
    match tokio::fs::try_exists(path).await {
        Ok(found) => found,
        Err(e) => {
            warn!(target = "artifact", path = ?path, error = %e, "Existence check failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_parse_back() {
        let name = ArtifactName::generate(AudioFormat::Mp3);
        let file = name.file_name();
        assert!(file.starts_with("resp_"));
        assert!(file.ends_with(".mp3"));
        assert_eq!(file.parse::<ArtifactName>().expect("parse"), name);
    }

    #[test]
    fn rejects_foreign_names() {
        for bad in [
            "../etc/passwd",
            "resp_123.mp3",
            "resp_0123456789abcdef0123456789abcdef.ogg",
            "resp_0123456789abcdef0123456789abcdef.mp3.tmp",
            "resp_0123456789ABCDEF0123456789ABCDEF.mp3",
            "resp_0123456789abcdef0123456789abcdef.MP3",
            "other_0123456789abcdef0123456789abcdef.mp3",
        ] {
            assert!(bad.parse::<ArtifactName>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(AudioFormat::Mp3.content_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Wav.content_type(), "audio/wav");
    }

    #[tokio::test]
    async fn state_tracks_publish_and_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        let name = ArtifactName::generate(AudioFormat::Wav);
        assert_eq!(store.state(&name).await, ArtifactState::Pending);

        tokio::fs::write(store.temp_path(&name), b"RIFF").await.unwrap();
        assert_eq!(store.state(&name).await, ArtifactState::Pending);

        store.publish(&name).await.unwrap();
        assert_eq!(store.state(&name).await, ArtifactState::Ready);
        assert!(!store.temp_path(&name).exists());

        let failed = ArtifactName::generate(AudioFormat::Wav);
        store.mark_failed(&failed).await.unwrap();
        assert_eq!(store.state(&failed).await, ArtifactState::Failed);
    }
}
