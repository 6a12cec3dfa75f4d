//! Query endpoints: voice uploads and plain text

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::ApiState;
use crate::pipeline::VoiceResponse;
use crate::providers::Coordinates;

/// Build query router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/voice-query", post(voice_query))
        .route("/text-query", post(text_query))
        .with_state(state)
}

/// Handle a voice query upload
///
/// Multipart fields: `audio` (WAV bytes, required), `lat`/`lon` (optional
/// device coordinates), `user_id` (optional, defaults to "anonymous").
async fn voice_query(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<VoiceResponse>, QueryError> {
    let mut audio: Option<Vec<u8>> = None;
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut user_id = "anonymous".to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| QueryError::Multipart(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "audio" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| QueryError::Multipart(e.to_string()))?;
                if bytes.len() as u64 > state.max_audio_bytes {
                    return Err(QueryError::PayloadTooLarge);
                }
                audio = Some(bytes.to_vec());
            }
            "lat" => lat = read_text_field(field).await?.parse().ok(),
            "lon" => lon = read_text_field(field).await?.parse().ok(),
            "user_id" => {
                let value = read_text_field(field).await?;
                if !value.is_empty() {
                    user_id = value;
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let Some(audio) = audio else {
        return Err(QueryError::BadRequest("missing audio field"));
    };

    let location = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };

    let response = state
        .orchestrator
        .handle_voice_query(&audio, location, &user_id)
        .await;

    Ok(Json(response))
}

/// Text query request
#[derive(Debug, Deserialize)]
pub struct TextQueryRequest {
    pub text: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub user_id: Option<String>,
}

/// Handle a query that arrives as text, skipping recognition
async fn text_query(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<TextQueryRequest>,
) -> Result<Json<VoiceResponse>, QueryError> {
    if request.text.trim().is_empty() {
        return Err(QueryError::BadRequest("empty text"));
    }

    let location = match (request.lat, request.lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };
    let user_id = request.user_id.unwrap_or_else(|| "anonymous".to_string());

    let response = state
        .orchestrator
        .handle_text_query(&request.text, location, &user_id)
        .await;

    Ok(Json(response))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, QueryError> {
    field
        .text()
        .await
        .map_err(|e| QueryError::Multipart(e.to_string()))
}

/// Query API errors
#[derive(Debug)]
pub enum QueryError {
    BadRequest(&'static str),
    PayloadTooLarge,
    Multipart(String),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        #[derive(serde::Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(serde::Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "audio upload exceeds the size limit".to_string(),
            ),
            Self::Multipart(msg) => (StatusCode::BAD_REQUEST, "invalid_multipart", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}
