//! Query orchestrator
//!
//! Drives a voice query end to end: stage the upload, transcribe, classify,
//! dispatch to the right data provider, render the answer, and synthesize it.
//! The pipeline never propagates an error to the caller; every failure mode
//! collapses into a spoken apology inside the response.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use crate::db::{NewQueryLog, PreferenceRepo, QueryLogRepo};
use crate::nlp::{self, Intent, IntentKind};
use crate::providers::{
    Coordinates, GeocodingProvider, MobilityProvider, RoutingProvider, TravelMode,
};
use crate::voice::{SttResult, VoiceManager};
use crate::Result;

/// Search radius for nearby stops, in metres
const STOP_RADIUS_M: u32 = 500;

/// Zone assumed when a traffic query names none
const DEFAULT_TRAFFIC_ZONE: &str = "Valencia centro";

/// Final answer to one query
#[derive(Debug, Clone, serde::Serialize)]
pub struct VoiceResponse {
    pub success: bool,
    pub query_text: String,
    pub intent: String,
    pub confidence: f64,
    pub response_text: String,
    pub entities: BTreeMap<String, String>,
    /// Raw provider payload the answer was rendered from
    pub data: Value,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_engine: Option<String>,
}

impl VoiceResponse {
    /// A failure response carrying only an apology
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            query_text: String::new(),
            intent: IntentKind::General.as_str().to_string(),
            confidence: 0.0,
            response_text: message.to_string(),
            entities: BTreeMap::new(),
            data: json!({}),
            processing_time_ms: 0,
            audio_url: None,
            stt_engine: None,
        }
    }

    fn stamped(mut self, started: Instant) -> Self {
        self.processing_time_ms = elapsed_ms(started);
        self
    }
}

/// Coordinates every stage of query handling
pub struct Orchestrator {
    mobility: Arc<dyn MobilityProvider>,
    routing: Arc<dyn RoutingProvider>,
    geocoding: Arc<dyn GeocodingProvider>,
    voice: VoiceManager,
    query_log: QueryLogRepo,
    preferences: PreferenceRepo,
    max_audio_bytes: u64,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        mobility: Arc<dyn MobilityProvider>,
        routing: Arc<dyn RoutingProvider>,
        geocoding: Arc<dyn GeocodingProvider>,
        voice: VoiceManager,
        query_log: QueryLogRepo,
        preferences: PreferenceRepo,
        max_audio_bytes: u64,
    ) -> Self {
        Self {
            mobility,
            routing,
            geocoding,
            voice,
            query_log,
            preferences,
            max_audio_bytes,
        }
    }

    /// Handle one voice query from raw uploaded audio
    ///
    /// Never returns an error; failures become apologetic responses.
    pub async fn handle_voice_query(
        &self,
        audio: &[u8],
        location: Option<Coordinates>,
        user_id: &str,
    ) -> VoiceResponse {
        let started = Instant::now();

        if audio.is_empty() {
            return VoiceResponse::failure("No recibí ningún audio. Inténtalo de nuevo.")
                .stamped(started);
        }
        if audio.len() as u64 > self.max_audio_bytes {
            return VoiceResponse::failure(
                "El audio es demasiado largo. Intenta con una consulta más corta.",
            )
            .stamped(started);
        }

        // Stage the upload in a temp file that is removed on drop
        let staged = match stage_audio(audio) {
            Ok(staged) => staged,
            Err(e) => {
                tracing::error!(error = %e, "failed to stage audio upload");
                return self
                    .spoken_failure(
                        "Hubo un problema procesando tu audio. Inténtalo de nuevo.",
                        user_id,
                        location,
                        started,
                    )
                    .await;
            }
        };

        let stt = self.voice.transcribe(audio).await;
        if !stt.success {
            tracing::warn!(user_id, "no engine produced a transcript");
            return self
                .spoken_failure(
                    "Lo siento, no pude entender el audio. ¿Podrías repetir tu consulta?",
                    user_id,
                    location,
                    started,
                )
                .await;
        }

        let response = self
            .answer_text_query(&stt.text, location, user_id, Some(&stt), started)
            .await;

        drop(staged);
        response
    }

    /// Handle a query that is already text (no STT, no audio staging)
    pub async fn handle_text_query(
        &self,
        text: &str,
        location: Option<Coordinates>,
        user_id: &str,
    ) -> VoiceResponse {
        self.answer_text_query(text, location, user_id, None, Instant::now())
            .await
    }

    async fn answer_text_query(
        &self,
        text: &str,
        location: Option<Coordinates>,
        user_id: &str,
        stt: Option<&SttResult>,
        started: Instant,
    ) -> VoiceResponse {
        let intent = nlp::process_query(text);
        tracing::info!(
            user_id,
            intent = intent.kind.as_str(),
            confidence = intent.confidence,
            "query classified"
        );

        let data = self.dispatch(&intent, location).await;
        let response_text = nlp::format_response(intent.kind, &data);

        // Synthesis failure degrades to a text-only answer
        let audio_url = self.synthesize(&response_text, user_id).await;

        let success = data.get("error").is_none();
        let processing_time_ms = elapsed_ms(started);
        self.log_query(&NewQueryLog {
            user_id,
            query_text: &intent.source_text,
            intent: intent.kind.as_str(),
            confidence: intent.confidence,
            response_text: &response_text,
            success,
            stt_engine: stt.map(|s| s.engine.as_str()),
            elapsed_ms: processing_time_ms,
            location: location.map(|c| (c.lat, c.lon)),
        });

        VoiceResponse {
            success,
            query_text: intent.source_text.clone(),
            intent: intent.kind.as_str().to_string(),
            confidence: intent.confidence,
            response_text,
            entities: intent.entities,
            data,
            processing_time_ms,
            audio_url,
            stt_engine: stt.map(|s| s.engine.clone()),
        }
    }

    /// Route the classified intent to its data provider
    async fn dispatch(&self, intent: &Intent, location: Option<Coordinates>) -> Value {
        match intent.kind {
            IntentKind::NearestStop => self.dispatch_nearest_stop(intent, location).await,
            IntentKind::Route => self.dispatch_route(intent, location).await,
            IntentKind::Traffic => {
                let zone = intent
                    .entities
                    .get("zona")
                    .map_or(DEFAULT_TRAFFIC_ZONE, String::as_str);
                self.mobility
                    .traffic_status(zone)
                    .await
                    .unwrap_or_else(|e| provider_error("tráfico", &e))
            }
            IntentKind::Accessibility => {
                let Some(lugar) = intent.entities.get("lugar") else {
                    return json!({
                        "error": "no entendí de qué lugar quieres información. \
                                  Dime por ejemplo: ¿es accesible el Museo IVAM?"
                    });
                };
                self.mobility
                    .accessibility_info(lugar)
                    .await
                    .unwrap_or_else(|e| provider_error("accesibilidad", &e))
            }
            // Conversational intents carry no data; the formatter answers alone
            IntentKind::Greeting | IntentKind::Farewell => json!({}),
            // Not-understood queries report an error so success comes out false
            IntentKind::General => json!({
                "error": "No entendí tu consulta",
                "sugerencia": "Puedes preguntar sobre paradas cercanas, rutas, tráfico o accesibilidad"
            }),
        }
    }

    async fn dispatch_nearest_stop(
        &self,
        intent: &Intent,
        location: Option<Coordinates>,
    ) -> Value {
        let coords = match intent.entities.get("ubicacion") {
            Some(named) if named != nlp::CURRENT_LOCATION => {
                // A named place geocodes first; live coordinates are the net
                match self.geocoding.geocode(named).await {
                    Ok(Some(coords)) => Some(coords),
                    Ok(None) => {
                        tracing::debug!(place = %named, "geocoder found nothing, using live location");
                        location
                    }
                    Err(e) => {
                        tracing::warn!(place = %named, error = %e, "geocoding failed");
                        location
                    }
                }
            }
            _ => location,
        };

        let Some(coords) = coords else {
            return json!({
                "error": "necesito tu ubicación para buscar paradas cercanas. \
                          Activa el GPS o dime dónde estás."
            });
        };

        self.mobility
            .nearest_stop(coords, STOP_RADIUS_M)
            .await
            .unwrap_or_else(|e| provider_error("paradas", &e))
    }

    async fn dispatch_route(&self, intent: &Intent, location: Option<Coordinates>) -> Value {
        // A bare location slot names the destination when no hasta/hacia
        // phrase was spoken
        let destino = intent
            .entities
            .get("destino")
            .or_else(|| intent.entities.get("ubicacion"));
        let Some(destino) = destino else {
            return json!({
                "error": "no entendí el destino. Dime por ejemplo: cómo llego al Mercado Central"
            });
        };

        let origin = match intent.entities.get("origen") {
            Some(origen) if origen != nlp::CURRENT_LOCATION => {
                match self.geocoding.geocode(origen).await {
                    Ok(Some(coords)) => Some(coords),
                    Ok(None) | Err(_) => location,
                }
            }
            _ => location,
        };

        let Some(origin) = origin else {
            return json!({
                "error": "necesito saber desde dónde sales. Activa el GPS o dime tu punto de partida."
            });
        };

        let destination = match self.geocoding.geocode(destino).await {
            Ok(Some(coords)) => coords,
            Ok(None) => {
                return json!({
                    "error": format!("no encontré el lugar {destino} en Valencia")
                });
            }
            Err(e) => {
                tracing::warn!(place = %destino, error = %e, "destination geocoding failed");
                return json!({ "error": "el servicio de mapas no está disponible ahora mismo" });
            }
        };

        let mode = TravelMode::from_transport_slot(
            intent.entities.get("medio_transporte").map(String::as_str),
        );

        self.routing
            .route(origin, destination, mode)
            .await
            .unwrap_or_else(|e| provider_error("rutas", &e))
    }

    /// Best-effort synthesis; `None` means a text-only answer
    async fn synthesize(&self, text: &str, user_id: &str) -> Option<String> {
        let speed = self.preferences.voice_speed(user_id).unwrap_or_else(|e| {
            tracing::warn!(user_id, error = %e, "failed to read voice speed preference");
            crate::voice::VoiceSpeed::Normal
        });

        match self.voice.synthesize_to_file(text, user_id, speed).await {
            Ok(artifact) => Some(artifact.url),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "synthesis failed, answering text-only");
                None
            }
        }
    }

    /// An apology answer that is still spoken and logged
    async fn spoken_failure(
        &self,
        message: &str,
        user_id: &str,
        location: Option<Coordinates>,
        started: Instant,
    ) -> VoiceResponse {
        let mut response = VoiceResponse::failure(message);
        response.audio_url = self.synthesize(message, user_id).await;
        response = response.stamped(started);
        self.log_query(&NewQueryLog {
            user_id,
            query_text: "",
            intent: &response.intent,
            confidence: 0.0,
            response_text: message,
            success: false,
            stt_engine: None,
            elapsed_ms: response.processing_time_ms,
            location: location.map(|c| (c.lat, c.lon)),
        });
        response
    }

    /// Best-effort history write; failures only log
    fn log_query(&self, entry: &NewQueryLog<'_>) {
        if let Err(e) = self.query_log.record(entry) {
            tracing::warn!(user_id = entry.user_id, error = %e, "failed to record query history");
        }
    }

    /// Remove synthesized audio past its retention window
    ///
    /// # Errors
    ///
    /// Returns error if the audio directory cannot be read
    pub fn cleanup_audio(&self, max_age: std::time::Duration) -> Result<usize> {
        self.voice.cleanup_old_audio(max_age)
    }
}

/// Write the upload to a temp file removed when the handle drops
///
/// Recognition engines consume the in-memory bytes; the staged file is the
/// request-scoped on-disk copy of the input, kept until the pipeline run
/// finishes and then deleted on every exit path.
fn stage_audio(audio: &[u8]) -> Result<tempfile::NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix("query_")
        .suffix(".wav")
        .tempfile()?;
    staged.write_all(audio)?;
    tracing::debug!(path = %staged.path().display(), bytes = audio.len(), "audio staged");
    Ok(staged)
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn provider_error(service: &str, e: &crate::Error) -> Value {
    tracing::error!(service, error = %e, "provider call failed");
    json!({ "error": format!("el servicio de {service} no está disponible ahora mismo") })
}
