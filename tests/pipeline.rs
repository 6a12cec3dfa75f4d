//! End-to-end orchestrator tests with mock engines and providers

use std::sync::Arc;

use tramvia::db::{PreferenceRepo, QueryLogRepo};
use tramvia::providers::Coordinates;
use tramvia::voice::{VoiceManager, VoiceSpeed};
use tramvia::Orchestrator;

mod common;

use common::{setup_test_db, MockGeocoding, MockMobility, MockRouting, MockStt, MockTts};

const MAX_AUDIO_BYTES: u64 = 5 * 1024 * 1024;

struct TestRig {
    orchestrator: Orchestrator,
    query_log: QueryLogRepo,
    preferences: PreferenceRepo,
    // Held so the audio directory outlives the orchestrator
    _audio_dir: tempfile::TempDir,
}

fn build_rig(primary: MockStt, fallback: Option<MockStt>, tts_working: bool) -> TestRig {
    let pool = setup_test_db();
    let audio_dir = tempfile::tempdir().expect("tempdir");

    let voice = VoiceManager::new(
        Box::new(primary),
        fallback.map(|f| Box::new(f) as Box<dyn tramvia::voice::SttEngine>),
        Box::new(MockTts { working: tts_working }),
        audio_dir.path().to_path_buf(),
        "es-ES".to_string(),
    )
    .expect("voice manager");

    let query_log = QueryLogRepo::new(pool.clone());
    let preferences = PreferenceRepo::new(pool);

    let orchestrator = Orchestrator::new(
        Arc::new(MockMobility),
        Arc::new(MockRouting),
        Arc::new(MockGeocoding { resolves: true }),
        voice,
        query_log.clone(),
        preferences.clone(),
        MAX_AUDIO_BYTES,
    );

    TestRig {
        orchestrator,
        query_log,
        preferences,
        _audio_dir: audio_dir,
    }
}

#[tokio::test]
async fn test_voice_query_happy_path() {
    let rig = build_rig(
        MockStt::recognizing("local", "¿Dónde está la parada más cercana?"),
        None,
        true,
    );

    let response = rig
        .orchestrator
        .handle_voice_query(
            b"RIFF-fake-wav",
            Some(Coordinates::new(39.4699, -0.3763)),
            "u1",
        )
        .await;

    assert!(response.success);
    assert_eq!(response.intent, "nearest_stop");
    assert!(response.response_text.contains("Plaza del Ayuntamiento"));
    assert!(response.response_text.contains("120 metros"));
    assert_eq!(response.stt_engine.as_deref(), Some("local"));
    assert!(response.audio_url.as_deref().is_some_and(|u| u.starts_with("/media/tts/")));
    assert_eq!(
        response.data["parada_principal"]["nombre"],
        "Plaza del Ayuntamiento"
    );

    // The query landed in history with the caller's coordinates
    let history = rig.query_log.recent("u1", 10).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].intent, "nearest_stop");
    assert!(history[0].success);
    assert_eq!(history[0].location, Some((39.4699, -0.3763)));
}

#[tokio::test]
async fn test_stt_fallback_engine_answers() {
    let rig = build_rig(
        MockStt::failing("local"),
        Some(MockStt::recognizing("web", "hola")),
        true,
    );

    let response = rig
        .orchestrator
        .handle_voice_query(b"RIFF-fake-wav", None, "u1")
        .await;

    assert!(response.success);
    assert_eq!(response.intent, "greeting");
    assert_eq!(response.stt_engine.as_deref(), Some("web"));
}

#[tokio::test]
async fn test_all_stt_engines_fail() {
    let rig = build_rig(MockStt::failing("local"), Some(MockStt::failing("web")), true);

    let response = rig
        .orchestrator
        .handle_voice_query(b"RIFF-fake-wav", None, "u1")
        .await;

    assert!(!response.success);
    assert!(response.response_text.contains("no pude entender el audio"));
    // The apology is still spoken and the failed attempt still logged
    assert!(response.audio_url.is_some());
    let history = rig.query_log.recent("u1", 10).expect("history");
    assert_eq!(history.len(), 1);
    assert!(!history[0].success);
}

#[tokio::test]
async fn test_empty_audio_is_rejected() {
    let rig = build_rig(MockStt::recognizing("local", "hola"), None, true);

    let response = rig.orchestrator.handle_voice_query(b"", None, "u1").await;

    assert!(!response.success);
    assert!(response.response_text.contains("No recibí ningún audio"));
}

#[tokio::test]
async fn test_tts_failure_degrades_to_text_only() {
    let rig = build_rig(MockStt::recognizing("local", "hola, buenos días"), None, false);

    let response = rig
        .orchestrator
        .handle_voice_query(b"RIFF-fake-wav", None, "u1")
        .await;

    assert!(response.success);
    assert_eq!(response.intent, "greeting");
    assert!(response.audio_url.is_none());
    assert!(!response.response_text.is_empty());
}

#[tokio::test]
async fn test_text_route_query_uses_geocoder() {
    let rig = build_rig(MockStt::recognizing("local", "unused"), None, true);

    let response = rig
        .orchestrator
        .handle_text_query(
            "Quiero ir desde Ruzafa hasta el Mercado Central",
            None,
            "u2",
        )
        .await;

    assert!(response.success);
    assert_eq!(response.intent, "route");
    assert!(response.response_text.contains("1.8 kilómetros"));
    assert!(response.response_text.contains("22 minutos"));
    assert!(response.response_text.contains("1. Sal por Calle de Ruzafa"));
    assert!(response.stt_engine.is_none());
}

#[tokio::test]
async fn test_route_without_destination_apologizes() {
    let rig = build_rig(MockStt::recognizing("local", "unused"), None, true);

    let response = rig
        .orchestrator
        .handle_text_query("cómo puedo llegar", None, "u2")
        .await;

    assert!(!response.success);
    assert!(response.response_text.contains("No pude calcular la ruta"));
}

#[tokio::test]
async fn test_route_destination_from_bare_location_slot() {
    let rig = build_rig(MockStt::recognizing("local", "unused"), None, true);

    // "al cabañal" carries no hasta/hacia phrase, so the barrio lands in the
    // generic location slot and still names the destination
    let response = rig
        .orchestrator
        .handle_text_query(
            "cómo voy al cabañal",
            Some(Coordinates::new(39.4699, -0.3763)),
            "u2",
        )
        .await;

    assert!(response.success);
    assert_eq!(response.intent, "route");
    assert_eq!(response.entities.get("ubicacion").map(String::as_str), Some("cabañal"));
    assert!(response.entities.get("destino").is_none());
    assert!(response.response_text.contains("1.8 kilómetros"));
}

#[tokio::test]
async fn test_general_intent_reports_failure() {
    let rig = build_rig(MockStt::recognizing("local", "unused"), None, true);

    let response = rig
        .orchestrator
        .handle_text_query("me gusta la paella valenciana", None, "u2")
        .await;

    assert!(!response.success);
    assert_eq!(response.intent, "general");
    assert!(response.data.get("error").is_some());
    assert!(response.data.get("sugerencia").is_some());
    assert!(response.response_text.contains("no he entendido tu consulta"));
}

#[tokio::test]
async fn test_nearest_stop_without_any_location() {
    let rig = build_rig(MockStt::recognizing("local", "unused"), None, true);

    let response = rig
        .orchestrator
        .handle_text_query("¿dónde está la parada más cercana?", None, "u3")
        .await;

    assert!(!response.success);
    assert!(response.response_text.contains("necesito tu ubicación"));
}

#[tokio::test]
async fn test_traffic_defaults_to_city_center() {
    let rig = build_rig(MockStt::recognizing("local", "unused"), None, true);

    let response = rig
        .orchestrator
        .handle_text_query("¿cómo está el tráfico?", None, "u4")
        .await;

    assert!(response.success);
    assert_eq!(response.intent, "traffic");
    assert!(response.response_text.contains("Valencia centro"));
}

#[tokio::test]
async fn test_slow_voice_preference_is_read() {
    let rig = build_rig(MockStt::recognizing("local", "hola"), None, true);
    rig.preferences
        .set_voice_speed("u5", VoiceSpeed::Slow)
        .expect("set preference");

    let response = rig
        .orchestrator
        .handle_voice_query(b"RIFF-fake-wav", None, "u5")
        .await;

    // Synthesis still succeeds with the slow flag set
    assert!(response.success);
    assert!(response.audio_url.is_some());
}
