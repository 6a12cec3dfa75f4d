//! Tramvia - Voice-driven urban mobility assistant for Valencia
//!
//! This library provides the core functionality of the assistant:
//! - Spanish natural-language understanding (intent and entity extraction)
//! - Open-data lookups (stops, traffic, accessibility) with TTL caching
//! - Routing and geocoding against OSRM and Nominatim
//! - Speech recognition with a two-tier engine fallback, and speech synthesis
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  HTTP API (axum)                     │
//! │      /api/voice-query  │  /api/text-query           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Orchestrator                        │
//! │   STT  │  NLP  │  Dispatch  │  Format  │  TTS       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Providers                           │
//! │   Open Data  │  OSRM  │  Nominatim  │  TTL cache    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod nlp;
pub mod pipeline;
pub mod providers;
pub mod voice;

pub use cache::CacheStore;
pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use pipeline::{Orchestrator, VoiceResponse};
