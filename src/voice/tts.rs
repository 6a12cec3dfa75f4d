//! Text-to-speech (TTS) synthesis

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// User-facing speech rate preference
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSpeed {
    Slow,
    Normal,
    Fast,
}

impl VoiceSpeed {
    /// Parse a stored preference value; anything unknown reads as normal
    #[must_use]
    pub fn from_preference(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "slow" | "lenta" => Self::Slow,
            "fast" | "rapida" | "rápida" => Self::Fast,
            _ => Self::Normal,
        }
    }

    /// Only the slow preference maps onto the synthesizer's slow flag
    #[must_use]
    pub const fn is_slow(self) -> bool {
        matches!(self, Self::Slow)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
        }
    }
}

/// A speech synthesis backend producing MP3 audio
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Synthesize text in the given language
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, language: &str, slow: bool) -> Result<Vec<u8>>;
}

/// Google Translate speech endpoint
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateTts {
    /// Create a client with a bounded per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(crate::Error::Http)?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl TtsEngine for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, language: &str, slow: bool) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::Tts("nothing to synthesize".to_string()));
        }

        tracing::debug!(chars = text.len(), language, slow, "synthesizing speech");

        // The endpoint only distinguishes normal and slow rates
        let speed = if slow { "0.24" } else { "1.0" };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("q", text),
                ("tl", language),
                ("ttsspeed", speed),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(Error::Tts("TTS returned empty audio".to_string()));
        }

        Ok(audio.to_vec())
    }
}
