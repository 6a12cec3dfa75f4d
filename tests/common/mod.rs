//! Shared test utilities: in-memory database and mock engines

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};

use tramvia::providers::{
    Coordinates, GeocodingProvider, MobilityProvider, RoutingProvider, TravelMode,
};
use tramvia::voice::{SttEngine, SttResult, TtsEngine};
use tramvia::{db, DbPool, Error, Result};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// STT engine that answers with a fixed transcript, or always fails
pub struct MockStt {
    pub name: &'static str,
    pub transcript: Option<String>,
    pub calls: AtomicUsize,
}

impl MockStt {
    pub fn recognizing(name: &'static str, transcript: &str) -> Self {
        Self {
            name,
            transcript: Some(transcript.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            transcript: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SttEngine for MockStt {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn transcribe(&self, _audio: &[u8], language: &str) -> Result<SttResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.transcript {
            Some(text) => Ok(SttResult {
                text: text.clone(),
                confidence: 0.92,
                engine: self.name.to_string(),
                language: language.to_string(),
                success: true,
            }),
            None => Err(Error::Stt("mock engine rejects everything".to_string())),
        }
    }
}

/// TTS engine that emits a fixed MP3 payload, or always fails
pub struct MockTts {
    pub working: bool,
}

#[async_trait]
impl TtsEngine for MockTts {
    async fn synthesize(&self, _text: &str, _language: &str, _slow: bool) -> Result<Vec<u8>> {
        if self.working {
            Ok(b"ID3mock-mp3-bytes".to_vec())
        } else {
            Err(Error::Tts("mock synthesis failure".to_string()))
        }
    }
}

/// Mobility provider serving canned Valencia data
pub struct MockMobility;

#[async_trait]
impl MobilityProvider for MockMobility {
    async fn nearest_stop(&self, _location: Coordinates, _radius_m: u32) -> Result<Value> {
        Ok(json!({
            "parada_principal": {
                "nombre": "Plaza del Ayuntamiento",
                "distancia_m": 120,
                "lineas": ["4", "6", "8"]
            },
            "paradas_alternativas": [],
            "total_encontradas": 1
        }))
    }

    async fn traffic_status(&self, zone: &str) -> Result<Value> {
        Ok(json!({
            "zona": zone,
            "estado": "moderado",
            "recomendacion": "Tráfico normal, tiempo de viaje estándar"
        }))
    }

    async fn accessibility_info(&self, place: &str) -> Result<Value> {
        Ok(json!({
            "lugar": place,
            "encontrado": true,
            "accesible": "accesible",
            "detalles_accesibilidad": "Acceso por rampa"
        }))
    }
}

/// Routing provider returning one short canned route
pub struct MockRouting;

#[async_trait]
impl RoutingProvider for MockRouting {
    async fn route(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
        mode: TravelMode,
    ) -> Result<Value> {
        Ok(json!({
            "distancia_total_km": 1.8,
            "duracion_minutos": 22.0,
            "modo": mode.as_str(),
            "instrucciones": [
                "Sal por Calle de Ruzafa durante 200 metros",
                "Gira a la izquierda por Gran Vía durante 800 metros",
                "Has llegado a tu destino"
            ]
        }))
    }
}

/// Geocoder that resolves everything to the Valencia city hall
pub struct MockGeocoding {
    pub resolves: bool,
}

#[async_trait]
impl GeocodingProvider for MockGeocoding {
    async fn geocode(&self, _query: &str) -> Result<Option<Coordinates>> {
        if self.resolves {
            Ok(Some(Coordinates::new(39.4699, -0.3763)))
        } else {
            Ok(None)
        }
    }
}
