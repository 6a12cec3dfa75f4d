//! Spanish natural-language understanding for mobility queries
//!
//! Rule-based pipeline: a transcript is normalized, scored against a fixed
//! per-intent pattern table, and mined for slots (locations, transport mode,
//! route endpoints). The reverse direction lives in [`format`]: structured
//! provider data is rendered back into a spoken Spanish sentence.

mod entities;
mod format;
mod intent;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

pub use entities::{extract_entities, CURRENT_LOCATION};
pub use format::format_response;
pub use intent::{classify, IntentKind};

/// Strips everything except word characters, whitespace and Spanish accents
static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\sáéíóúñ]").expect("valid regex"));

/// Collapses runs of whitespace
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A classified voice query
///
/// Built once per request by [`process_query`] and owned by the orchestrator
/// for the lifetime of that request; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Intent {
    /// Identified intent
    pub kind: IntentKind,
    /// Classification confidence in `[0, 1]`
    pub confidence: f64,
    /// Extracted slots, keyed by Spanish slot name (`ubicacion`, `origen`, ...)
    pub entities: BTreeMap<String, String>,
    /// The utterance as produced by STT, before normalization
    pub source_text: String,
}

/// Classify an utterance and extract its slots
#[must_use]
pub fn process_query(text: &str) -> Intent {
    let normalized = normalize_text(text);
    let (kind, confidence) = intent::classify(&normalized);
    let entities = entities::extract_entities(&normalized, kind);

    Intent {
        kind,
        confidence,
        entities,
        source_text: text.to_string(),
    }
}

/// Normalize an utterance for pattern matching
///
/// Lowercases, strips punctuation while keeping accented vowels and `ñ`, and
/// collapses repeated whitespace.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = STRIP_RE.replace_all(&lowered, " ");
    WHITESPACE_RE
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}
