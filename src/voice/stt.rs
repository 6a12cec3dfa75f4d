//! Speech-to-text (STT) engines
//!
//! Two backends share the [`SttEngine`] trait: a local recognizer server that
//! works without internet access, and the hosted web speech API used when the
//! local one is unavailable or fails.

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Outcome of one transcription attempt
#[derive(Debug, Clone, serde::Serialize)]
pub struct SttResult {
    pub text: String,
    pub confidence: f64,
    pub engine: String,
    pub language: String,
    pub success: bool,
}

impl SttResult {
    /// A failed attempt, with empty transcript
    #[must_use]
    pub fn failure(engine: &str, language: &str) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            engine: engine.to_string(),
            language: language.to_string(),
            success: false,
        }
    }
}

/// A speech recognition backend
#[async_trait]
pub trait SttEngine: Send + Sync {
    /// Short identifier reported in results and logs
    fn name(&self) -> &'static str;

    /// Whether the engine can be attempted right now
    fn is_available(&self) -> bool {
        true
    }

    /// Transcribe WAV audio in the given language
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or rejects the audio
    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<SttResult>;
}

/// Response from the local recognizer server
#[derive(serde::Deserialize)]
struct LocalResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Local recognizer running as a loopback HTTP service
///
/// Available only when an endpoint has been configured.
pub struct LocalRecognizer {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl LocalRecognizer {
    /// Create a client with a bounded per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(crate::Error::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.filter(|e| !e.is_empty()),
        })
    }
}

#[async_trait]
impl SttEngine for LocalRecognizer {
    fn name(&self) -> &'static str {
        "local"
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<SttResult> {
        let Some(endpoint) = &self.endpoint else {
            return Err(Error::Stt("local recognizer not configured".to_string()));
        };

        tracing::debug!(audio_bytes = audio.len(), "starting local transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "audio",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("query.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("language", language.to_string());

        let response = self
            .client
            .post(format!("{endpoint}/transcribe"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "local recognizer request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "local recognizer error");
            return Err(Error::Stt(format!("local recognizer error {status}: {body}")));
        }

        let result: LocalResponse = response.json().await?;
        if result.text.trim().is_empty() {
            return Err(Error::Stt("local recognizer returned empty transcript".to_string()));
        }

        tracing::info!(transcript = %result.text, "local transcription complete");
        Ok(SttResult {
            text: result.text,
            confidence: result.confidence.unwrap_or(0.7),
            engine: self.name().to_string(),
            language: language.to_string(),
            success: true,
        })
    }
}

/// Hosted web speech recognition API
///
/// The service answers with newline-separated JSON documents; the first one is
/// typically an empty placeholder and is skipped.
pub struct WebSpeechStt {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(serde::Deserialize)]
struct WebSpeechLine {
    #[serde(default)]
    result: Vec<WebSpeechResult>,
}

#[derive(serde::Deserialize)]
struct WebSpeechResult {
    #[serde(default)]
    alternative: Vec<WebSpeechAlternative>,
}

#[derive(serde::Deserialize)]
struct WebSpeechAlternative {
    transcript: String,
    #[serde(default)]
    confidence: Option<f64>,
}

impl WebSpeechStt {
    /// Create a client with a bounded per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(crate::Error::Http)?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Pick the first non-empty recognition line
    fn parse_body(body: &str) -> Option<(String, f64)> {
        for line in body.lines() {
            let Ok(parsed) = serde_json::from_str::<WebSpeechLine>(line) else {
                continue;
            };
            if let Some(alt) = parsed
                .result
                .first()
                .and_then(|r| r.alternative.first())
            {
                if !alt.transcript.trim().is_empty() {
                    return Some((alt.transcript.clone(), alt.confidence.unwrap_or(0.9)));
                }
            }
        }
        None
    }
}

#[async_trait]
impl SttEngine for WebSpeechStt {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn transcribe(&self, audio: &[u8], language: &str) -> Result<SttResult> {
        tracing::debug!(audio_bytes = audio.len(), "starting web transcription");

        let response = self
            .client
            .post(&self.base_url)
            .query(&[
                ("client", "chromium"),
                ("lang", language),
                ("key", &self.api_key),
            ])
            .header("Content-Type", "audio/l16; rate=16000")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "web speech request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "web speech API error");
            return Err(Error::Stt(format!("web speech API error {status}: {body}")));
        }

        let body = response.text().await?;
        let Some((text, confidence)) = Self::parse_body(&body) else {
            return Err(Error::Stt("web speech returned no transcript".to_string()));
        };

        tracing::info!(transcript = %text, "web transcription complete");
        Ok(SttResult {
            text,
            confidence,
            engine: self.name().to_string(),
            language: language.to_string(),
            success: true,
        })
    }
}
