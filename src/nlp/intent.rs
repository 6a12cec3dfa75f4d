//! Rule-based intent classification
//!
//! Each intent owns an ordered set of keyword regexes. A pattern scores
//! `1.0 + word_count / 10` when it matches anywhere in the normalized text,
//! so longer, more specific phrases weigh more. Confidence is the capped
//! ratio of the accumulated score to the intent's pattern count.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// The caller's high-level goal, a closed enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    NearestStop,
    Route,
    Traffic,
    Accessibility,
    Greeting,
    Farewell,
    General,
}

impl IntentKind {
    /// Stable wire name of the intent
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NearestStop => "nearest_stop",
            Self::Route => "route",
            Self::Traffic => "traffic",
            Self::Accessibility => "accessibility",
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::General => "general",
        }
    }

    /// Whether this intent carries location-style slots
    #[must_use]
    pub const fn wants_locations(self) -> bool {
        matches!(
            self,
            Self::NearestStop | Self::Route | Self::Traffic | Self::Accessibility
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled intent pattern with its precomputed specificity weight
struct Pattern {
    regex: Regex,
    words: usize,
}

impl Pattern {
    fn new(src: &str) -> Self {
        Self {
            regex: Regex::new(&format!("(?i){src}")).expect("valid intent pattern"),
            words: src.split_whitespace().count(),
        }
    }
}

fn compile(sources: &[&str]) -> Vec<Pattern> {
    sources.iter().map(|s| Pattern::new(s)).collect()
}

/// Per-intent pattern table
///
/// Slice order is the intent priority order: on an exact confidence tie the
/// intent listed first wins. Keep this ordering stable; classification
/// results depend on it.
static INTENT_PATTERNS: LazyLock<Vec<(IntentKind, Vec<Pattern>)>> = LazyLock::new(|| {
    vec![
        (
            IntentKind::NearestStop,
            compile(&[
                r"\b(parada|paradero)\b.*\b(cerca|cercana|próxima|más cerca)\b",
                r"\b(dónde|donde)\b.*\b(parada|paradero|bus|autobús|metro)\b",
                r"\b(parada|paradero)\b.*\b(aquí|mi ubicación)\b",
                r"\b(más cerca|cercana)\b.*\b(parada|paradero)\b",
                r"\b(bus|autobús|metro)\b.*\b(cerca|cercano)\b",
                r"\b(transporte público)\b.*\b(cerca|cercano)\b",
                r"\b(emt)\b.*\b(parada|cercana)\b",
            ]),
        ),
        (
            IntentKind::Route,
            compile(&[
                r"\b(cómo|como)\b.*\b(llegar|llego|voy|ir)\b",
                r"\b(ruta|camino)\b.*\b(hacia|hasta|para)\b",
                r"\b(direcciones|indicaciones)\b.*\b(para|hasta)\b",
                r"\b(cómo)\b.*\b(puedo|puede)\b.*\b(llegar)\b",
                r"\b(ir)\b.*\b(desde|de)\b.*\b(hasta|a)\b",
                r"\b(navegar|dirigir)\b.*\b(hacia|hasta)\b",
                r"\b(mostrar|enseñar)\b.*\b(ruta|camino)\b",
            ]),
        ),
        (
            IntentKind::Traffic,
            compile(&[
                r"\b(tráfico|trafico)\b",
                r"\b(circulación|congestión|atasco)\b",
                r"\b(cómo está)\b.*\b(tráfico|trafico|circulación)\b",
                r"\b(estado)\b.*\b(tráfico|trafico|vías|carreteras)\b",
                r"\b(fluye|fluye el tráfico|fluido)\b",
                r"\b(retenciones|atascos|embotellamientos)\b",
                r"\b(velocidad)\b.*\b(tráfico|circulación)\b",
            ]),
        ),
        (
            IntentKind::Accessibility,
            compile(&[
                r"\b(accesibilidad|accesible)\b",
                r"\b(silla de ruedas|discapacitados|movilidad reducida)\b",
                r"\b(adaptado|adaptados|barreras)\b",
                r"\b(rampas|ascensor|elevador)\b",
                r"\b(personas)\b.*\b(discapacidad|discapacitadas)\b",
                r"\b(acceso)\b.*\b(minusválidos|discapacitados)\b",
                r"\b(está adaptado|es accesible)\b",
            ]),
        ),
        (
            IntentKind::Greeting,
            compile(&[
                r"\b(hola|buenas|buenos días|buenas tardes|buenas noches)\b",
                r"\b(saludos|hey|qué tal)\b",
                r"\b(ayuda|ayúdame|puedes ayudar)\b",
            ]),
        ),
        (
            IntentKind::Farewell,
            compile(&[
                r"\b(adiós|hasta luego|nos vemos|chao|bye)\b",
                r"\b(gracias|muchas gracias|está bien|perfecto)\b",
                r"\b(eso es todo|nada más|ya está)\b",
            ]),
        ),
    ]
});

/// Confidence reported when no pattern of any intent matches
pub const GENERAL_CONFIDENCE: f64 = 0.3;

/// Classify normalized text into an intent and confidence
///
/// Pure function of the pattern table and the input. Returns
/// [`IntentKind::General`] with a fixed confidence when nothing matches;
/// otherwise the intent with the strictly highest confidence, ties resolved
/// by table order.
#[must_use]
pub fn classify(normalized_text: &str) -> (IntentKind, f64) {
    let mut best: Option<(IntentKind, f64)> = None;

    for (kind, patterns) in INTENT_PATTERNS.iter() {
        let mut score = 0.0;
        let mut hits = 0usize;

        for pattern in patterns {
            if pattern.regex.is_match(normalized_text) {
                hits += 1;
                #[allow(clippy::cast_precision_loss)]
                let weight = pattern.words as f64 / 10.0;
                score += 1.0 + weight;
            }
        }

        if hits == 0 {
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let confidence = (score / patterns.len() as f64).min(1.0);

        match best {
            Some((_, current)) if confidence <= current => {}
            _ => best = Some((*kind, confidence)),
        }
    }

    best.unwrap_or((IntentKind::General, GENERAL_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::normalize_text;

    fn classify_raw(text: &str) -> (IntentKind, f64) {
        classify(&normalize_text(text))
    }

    #[test]
    fn test_unrelated_text_is_general() {
        let (kind, confidence) = classify_raw("el cielo sobre berlín sigue gris");
        assert_eq!(kind, IntentKind::General);
        assert_eq!(confidence, GENERAL_CONFIDENCE);
    }

    #[test]
    fn test_nearest_stop_query() {
        let (kind, confidence) = classify_raw("¿dónde está la parada más cercana?");
        assert_eq!(kind, IntentKind::NearestStop);
        assert!(confidence > 0.0 && confidence <= 1.0);
    }

    #[test]
    fn test_route_query() {
        let (kind, _) = classify_raw("cómo puedo llegar hasta el puerto");
        assert_eq!(kind, IntentKind::Route);
    }

    #[test]
    fn test_traffic_query() {
        let (kind, _) = classify_raw("cómo está el tráfico en Ruzafa");
        assert_eq!(kind, IntentKind::Traffic);
    }

    #[test]
    fn test_accessibility_query() {
        let (kind, _) = classify_raw("¿el museo es accesible en silla de ruedas?");
        assert_eq!(kind, IntentKind::Accessibility);
    }

    #[test]
    fn test_greeting_and_farewell() {
        assert_eq!(classify_raw("hola, buenos días").0, IntentKind::Greeting);
        assert_eq!(classify_raw("muchas gracias, adiós").0, IntentKind::Farewell);
    }

    #[test]
    fn test_longer_patterns_weigh_more() {
        // A single one-word hit stays below a single multi-word hit
        let (_, short) = classify_raw("tráfico");
        let (_, long) = classify_raw("hay retenciones y atascos por el tráfico denso");
        assert!(long >= short);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let text = normalize_text("quiero ir en metro hasta una parada cercana");
        let first = classify(&text);
        for _ in 0..10 {
            assert_eq!(classify(&text), first);
        }
    }
}
