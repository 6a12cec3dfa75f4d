//! Voice processing: speech recognition, synthesis, and audio artifact management

pub mod manager;
pub mod stt;
pub mod tts;

pub use manager::{AudioArtifact, VoiceManager};
pub use stt::{LocalRecognizer, SttEngine, SttResult, WebSpeechStt};
pub use tts::{GoogleTranslateTts, TtsEngine, VoiceSpeed};
