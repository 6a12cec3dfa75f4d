//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;
use tramvia::db::{PreferenceRepo, QueryLogRepo};
use tramvia::voice::VoiceManager;
use tramvia::Orchestrator;

mod common;
use common::{setup_test_db, MockGeocoding, MockMobility, MockRouting, MockStt, MockTts};

/// Build a test API router backed by mock engines
fn build_test_router() -> (axum::Router, tempfile::TempDir) {
    use axum::Router;

    let pool = setup_test_db();
    let audio_dir = tempfile::tempdir().expect("tempdir");

    let voice = VoiceManager::new(
        Box::new(MockStt::recognizing("local", "hola")),
        None,
        Box::new(MockTts { working: true }),
        audio_dir.path().to_path_buf(),
        "es-ES".to_string(),
    )
    .expect("voice manager");

    let orchestrator = Orchestrator::new(
        Arc::new(MockMobility),
        Arc::new(MockRouting),
        Arc::new(MockGeocoding { resolves: true }),
        voice,
        QueryLogRepo::new(pool.clone()),
        PreferenceRepo::new(pool.clone()),
        1024,
    );

    let state = Arc::new(tramvia::api::ApiState {
        db: pool,
        orchestrator,
        max_audio_bytes: 1024,
    });

    let app = Router::new()
        .nest("/api", tramvia::api::voice::router(state.clone()))
        .merge(tramvia::api::health::router())
        .merge(tramvia::api::health::ready_router(state));

    (app, audio_dir)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let (app, _dir) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_text_query_endpoint() {
    let (app, _dir) = build_test_router();

    let payload = serde_json::json!({
        "text": "hola, buenos días",
        "user_id": "u1",
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/text-query")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["intent"], "greeting");
    assert!(json["response_text"].as_str().unwrap().contains("Hola"));
}

#[tokio::test]
async fn test_text_query_rejects_empty_text() {
    let (app, _dir) = build_test_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/text-query")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text": "   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_voice_query_requires_audio_field() {
    let (app, _dir) = build_test_router();

    // A multipart body carrying only user_id, no audio part
    let boundary = "tramvia-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"user_id\"\r\n\r\n\
         u1\r\n\
         --{boundary}--\r\n"
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/voice-query")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
    assert_eq!(json["error"]["message"], "missing audio field");
}

#[tokio::test]
async fn test_voice_query_multipart_upload() {
    let (app, _dir) = build_test_router();

    let boundary = "tramvia-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"audio\"; filename=\"q.wav\"\r\n\
             Content-Type: audio/wav\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"RIFF-fake-wav");
    body.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\n\
             Content-Disposition: form-data; name=\"user_id\"\r\n\r\n\
             u1\r\n\
             --{boundary}--\r\n"
        )
        .as_bytes(),
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/voice-query")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["intent"], "greeting");
    assert_eq!(json["stt_engine"], "local");
}
