//! Slot extraction from normalized Spanish text
//!
//! Extraction is intent-dependent: generic location scanning runs first for
//! the four data intents, then intent-specific patterns fill (and may
//! overwrite) the route, traffic and accessibility slots. All pattern lists
//! are ordered and first-match-wins, so results are deterministic.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::IntentKind;

/// Sentinel slot value meaning "use the caller's live GPS position"
pub const CURRENT_LOCATION: &str = "ubicacion_actual";

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(&format!("(?i){s}")).expect("valid entity pattern"))
        .collect()
}

/// Street/neighborhood/address patterns, scanned in order
static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\b(calle|c/|avenida|av|plaza|pl|paseo)\s+([a-záéíóúñ\s]+)\b",
        r"\b(barrio|zona|distrito)\s+([a-záéíóúñ\s]+)\b",
        r"\b(en|cerca de|junto a|al lado de)\s+([a-záéíóúñ\s]+)\b",
        r"\b([a-záéíóúñ]+(?:\s+[a-záéíóúñ]+)*)\s*,?\s*valencia\b",
        // Well-known Valencia neighborhoods
        r"\b(ruzafa|campanar|benimaclet|malvarosa|cabañal|russafa|ciutat vella)\b",
        r"\b(jesús|patraix|algirós|el carmen|xàtiva|colón)\b",
    ])
});

/// Transport mode categories, first match in this order wins
static TRANSPORT_PATTERNS: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            "public_transport",
            compile(&[r"\b(bus|autobús|metro|tranvía|emt|metrovalencia)\b"]),
        ),
        ("walking", compile(&[r"\b(andando|caminando|a pie|peatonal)\b"])),
        ("cycling", compile(&[r"\b(bicicleta|bici|valenbisi|ciclista)\b"])),
        ("car", compile(&[r"\b(coche|carro|automóvil|vehiculo|conducir)\b"])),
    ]
});

/// Gazetteer of Valencia neighborhoods for traffic zone resolution
const VALENCIA_BARRIOS: &[&str] = &[
    "ruzafa",
    "russafa",
    "campanar",
    "benimaclet",
    "malvarosa",
    "cabañal",
    "ciutat vella",
    "jesús",
    "patraix",
    "algirós",
    "el carmen",
    "xàtiva",
    "colón",
    "pérez galdós",
    "gran vía",
    "centro",
    "mercado central",
];

/// Generic zone fallback patterns when no gazetteer entry matches
static ZONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\ben\s+([a-záéíóúñ\s]+)\b",
        r"\bzona\s+([a-záéíóúñ\s]+)\b",
        r"\bbarrio\s+([a-záéíóúñ\s]+)\b",
    ])
});

/// Route origin patterns; the last three map to the live-location sentinel
static ORIGIN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bdesde\s+([a-záéíóúñ\s,]+?)(?:\s+hasta|\s+a\s|\s+hacia|\s*$)",
        r"\bde\s+([a-záéíóúñ\s,]+?)(?:\s+hasta|\s+a\s|\s+hacia|\s*$)",
        r"\bmi\s+ubicación\b",
        r"\baquí\b",
        r"\bdonde\s+estoy\b",
    ])
});

/// Route destination patterns
static DESTINATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bhasta\s+([a-záéíóúñ\s,]+?)(?:\s*$|\s+en\s)",
        r"\ba\s+([a-záéíóúñ\s,]+?)(?:\s*$|\s+en\s)",
        r"\bhacia\s+([a-záéíóúñ\s,]+?)(?:\s*$|\s+en\s)",
        r"\bpara\s+([a-záéíóúñ\s,]+?)(?:\s*$|\s+en\s)",
    ])
});

/// Accessibility place patterns with the capture group to keep
///
/// Group 0 keeps the whole "museo ivam"-style phrase (type plus name);
/// group 1 keeps the inner name for the framing patterns.
static PLACE_PATTERNS: LazyLock<Vec<(Regex, usize)>> = LazyLock::new(|| {
    let sources: &[(&str, usize)] = &[
        (
            r"\b(museo|teatro|cine|hospital|centro|biblioteca|parque)\s+([a-záéíóúñ\s]+)\b",
            0,
        ),
        (r"\bel\s+([a-záéíóúñ\s]+)\s+es\s+accesible\b", 1),
        (r"\baccesibilidad\s+de\s+([a-záéíóúñ\s]+)\b", 1),
        (r"\ben\s+([a-záéíóúñ\s]+)\s+hay\s+acceso\b", 1),
    ];
    sources
        .iter()
        .map(|(s, g)| {
            (
                Regex::new(&format!("(?i){s}")).expect("valid place pattern"),
                *g,
            )
        })
        .collect()
});

/// Extract slots from normalized text for the given intent
#[must_use]
pub fn extract_entities(text: &str, intent: IntentKind) -> BTreeMap<String, String> {
    let mut entities = BTreeMap::new();

    // Generic locations first so intent-specific slots can override them
    if intent.wants_locations() {
        let locations = extract_locations(text);
        if let Some(first) = locations.first() {
            entities.insert("ubicacion".to_string(), first.clone());
        }
        if let Some(second) = locations.get(1) {
            entities.insert("destino".to_string(), second.clone());
        }
    }

    if let Some(mode) = extract_transport_mode(text) {
        entities.insert("medio_transporte".to_string(), mode.to_string());
    }

    match intent {
        IntentKind::Traffic => {
            if let Some(zona) = extract_traffic_zone(text) {
                entities.insert("zona".to_string(), zona);
            }
        }
        IntentKind::Route => {
            let (origen, destino) = extract_route_points(text);
            if let Some(origen) = origen {
                entities.insert("origen".to_string(), origen);
            }
            if let Some(destino) = destino {
                entities.insert("destino".to_string(), destino);
            }
        }
        IntentKind::Accessibility => {
            if let Some(lugar) = extract_accessibility_place(text) {
                entities.insert("lugar".to_string(), lugar);
            }
        }
        _ => {}
    }

    entities
}

/// Scan for address/neighborhood mentions, deduplicated in insertion order
#[must_use]
pub fn extract_locations(text: &str) -> Vec<String> {
    let mut locations: Vec<String> = Vec::new();

    for pattern in LOCATION_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let candidate = caps
                .get(2)
                .or_else(|| caps.get(1))
                .map_or_else(|| caps[0].to_string(), |m| m.as_str().to_string());
            let candidate = candidate.trim().to_string();

            if !is_valid_location(&candidate) {
                continue;
            }
            if !locations.contains(&candidate) {
                locations.push(candidate);
            }
        }
    }

    locations
}

/// Reject too-short, numeric, and live-position phrases
///
/// "mi ubicación" / "aquí" / "donde estoy" are not places to geocode; leaving
/// the slot empty lets the pipeline fall back to the caller's coordinates.
fn is_valid_location(candidate: &str) -> bool {
    if candidate.chars().count() <= 2 {
        return false;
    }
    if candidate.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !(candidate.contains("mi ubicación")
        || candidate == "aquí"
        || candidate.contains("donde estoy"))
}

/// Detect the transport mode mentioned, if any
#[must_use]
pub fn extract_transport_mode(text: &str) -> Option<&'static str> {
    for (mode, patterns) in TRANSPORT_PATTERNS.iter() {
        if patterns.iter().any(|p| p.is_match(text)) {
            return Some(mode);
        }
    }
    None
}

/// Resolve the traffic zone: gazetteer first, generic patterns second
fn extract_traffic_zone(text: &str) -> Option<String> {
    for barrio in VALENCIA_BARRIOS {
        if text.contains(barrio) {
            return Some(title_case(barrio));
        }
    }

    for pattern in ZONE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Some(zona) = caps.get(1) {
                let zona = zona.as_str().trim();
                if zona.chars().count() > 2 {
                    return Some(title_case(zona));
                }
            }
        }
    }

    None
}

/// Extract origin and destination endpoints for a route query
fn extract_route_points(text: &str) -> (Option<String>, Option<String>) {
    let mut origen = None;
    for pattern in ORIGIN_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let whole = &caps[0];
            if whole.contains("ubicación") || whole.contains("aquí") || whole.contains("estoy") {
                origen = Some(CURRENT_LOCATION.to_string());
            } else if let Some(m) = caps.get(1) {
                origen = Some(m.as_str().trim().to_string());
            }
            break;
        }
    }

    let mut destino = None;
    for pattern in DESTINATION_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Some(m) = caps.get(1) {
                destino = Some(m.as_str().trim().to_string());
            }
            break;
        }
    }

    (origen, destino)
}

/// Extract the place an accessibility question is about
fn extract_accessibility_place(text: &str) -> Option<String> {
    for (pattern, group) in PLACE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Some(m) = caps.get(*group) {
                let place = m.as_str().trim();
                if place.chars().count() > 2 {
                    return Some(title_case(place));
                }
            }
        }
    }

    // No specific pattern hit; fall back to the generic location scan
    extract_locations(text).into_iter().next()
}

/// Capitalize the first letter of each word
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
