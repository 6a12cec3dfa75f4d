//! Voice manager: STT fallback chain, audio file persistence, cleanup

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};

use super::stt::{SttEngine, SttResult};
use super::tts::{TtsEngine, VoiceSpeed};
use crate::{Error, Result};

/// A synthesized audio file on disk
#[derive(Debug, Clone, serde::Serialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub url: String,
}

/// Coordinates recognition engines and the synthesizer
///
/// Recognition runs the primary engine first and falls back to the secondary
/// at most once. Synthesis writes MP3 files under a managed audio directory.
pub struct VoiceManager {
    primary: Box<dyn SttEngine>,
    fallback: Option<Box<dyn SttEngine>>,
    tts: Box<dyn TtsEngine>,
    audio_dir: PathBuf,
    language: String,
}

impl VoiceManager {
    /// # Errors
    ///
    /// Returns error if the audio directory cannot be created
    pub fn new(
        primary: Box<dyn SttEngine>,
        fallback: Option<Box<dyn SttEngine>>,
        tts: Box<dyn TtsEngine>,
        audio_dir: PathBuf,
        language: String,
    ) -> Result<Self> {
        std::fs::create_dir_all(&audio_dir)?;
        Ok(Self {
            primary,
            fallback,
            tts,
            audio_dir,
            language,
        })
    }

    /// Transcribe audio, trying the fallback engine if the primary fails
    ///
    /// Never returns an error: when every engine fails the result carries
    /// `success = false` and an empty transcript.
    pub async fn transcribe(&self, audio: &[u8]) -> SttResult {
        if self.primary.is_available() {
            match self.primary.transcribe(audio, &self.language).await {
                Ok(result) => return result,
                Err(e) => {
                    tracing::warn!(
                        engine = self.primary.name(),
                        error = %e,
                        "primary STT failed, trying fallback"
                    );
                }
            }
        } else {
            tracing::debug!(engine = self.primary.name(), "primary STT unavailable");
        }

        if let Some(fallback) = &self.fallback {
            if fallback.is_available() {
                match fallback.transcribe(audio, &self.language).await {
                    Ok(result) => return result,
                    Err(e) => {
                        tracing::error!(engine = fallback.name(), error = %e, "fallback STT failed");
                    }
                }
            }
        }

        SttResult::failure(self.primary.name(), &self.language)
    }

    /// Synthesize text and persist it as an MP3 file
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or the file cannot be written
    pub async fn synthesize_to_file(
        &self,
        text: &str,
        user_id: &str,
        speed: VoiceSpeed,
    ) -> Result<AudioArtifact> {
        let lang = self
            .language
            .split('-')
            .next()
            .unwrap_or(&self.language)
            .to_string();
        let audio = self.tts.synthesize(text, &lang, speed.is_slow()).await?;

        let filename = audio_filename(user_id, text);
        let path = self.audio_dir.join(&filename);
        std::fs::write(&path, &audio)?;

        tracing::info!(file = %filename, bytes = audio.len(), "audio artifact written");

        Ok(AudioArtifact {
            path,
            filename: filename.clone(),
            size_bytes: audio.len() as u64,
            content_type: "audio/mpeg".to_string(),
            url: format!("/media/tts/{filename}"),
        })
    }

    /// Remove synthesized audio older than `max_age`; returns files removed
    ///
    /// # Errors
    ///
    /// Returns error if the audio directory cannot be read
    pub fn cleanup_old_audio(&self, max_age: Duration) -> Result<usize> {
        cleanup_dir(&self.audio_dir, max_age)
    }

    #[must_use]
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }
}

/// Collision-resistant filename keyed on user, time, and text digest
fn audio_filename(user_id: &str, text: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let digest = Sha256::digest(text.as_bytes());
    let hash8 = &hex::encode(digest)[..8];
    format!("tts_{user_id}_{timestamp}_{hash8}.mp3")
}

/// Only files written by [`audio_filename`] are eligible for cleanup
fn is_synthesized_audio(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("tts_") && n.ends_with(".mp3"))
}

fn cleanup_dir(dir: &Path, max_age: Duration) -> Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .ok_or_else(|| Error::Tts("cleanup age out of range".to_string()))?;

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_synthesized_audio(&path) {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        let Ok(modified) = modified else { continue };

        if modified < cutoff {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove audio file");
            } else {
                removed += 1;
            }
        }
    }

    tracing::info!(removed, "audio cleanup complete");
    Ok(removed)
}
