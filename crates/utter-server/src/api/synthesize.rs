//! Synthesis endpoints.

use axum::{
    body::Body,
    extract::State,
    http::{header, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;
use utter_core::SynthesisRequest;

/// Synthesis request body.
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    /// Text to synthesize.
    pub text: String,

    /// Catalog voice id.
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Speaking rate multiplier.
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Output volume, 0.0..=1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Response format: `json` (artifact metadata) or `wav` (audio bytes).
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_voice() -> String {
    "en-us".to_string()
}

fn default_rate() -> f32 {
    1.0
}

fn default_volume() -> f32 {
    1.0
}

fn default_format() -> String {
    "json".to_string()
}

/// Synthesis response (json format).
#[derive(Serialize)]
pub struct SynthesizeResponse {
    pub artifact_id: String,
    pub url: String,
    pub size_bytes: u64,
    /// Whether the result was served without running an engine.
    pub cached: bool,
}

/// Synthesize text, returning artifact metadata or the audio itself.
pub async fn synthesize(
    State(state): State<AppState>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Response<Body>, ApiError> {
    info!("synthesis request: {} chars, voice {}", req.text.len(), req.voice);

    let request = SynthesisRequest::new(req.text, req.voice)
        .with_rate(req.rate)
        .with_volume(req.volume);

    let ticket = state.service.submit(request)?;
    let cached = ticket.is_ready();
    let handle = ticket.wait().await?;

    match req.format.as_str() {
        "json" => {
            let response = SynthesizeResponse {
                artifact_id: handle.artifact_id().to_string(),
                url: format!("/audio/{}", handle.artifact_id()),
                size_bytes: handle.size_bytes(),
                cached,
            };
            Ok(Response::builder()
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&response).map_err(
                    |e| ApiError::internal(format!("serialize response: {}", e)),
                )?))
                .map_err(|e| ApiError::internal(e.to_string()))?)
        }
        "wav" => {
            let bytes = state.service.read_artifact(&handle).await?;
            Ok(Response::builder()
                .header(header::CONTENT_TYPE, "audio/wav")
                .header(
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"speech.wav\"",
                )
                .body(Body::from(bytes))
                .map_err(|e| ApiError::internal(e.to_string()))?)
        }
        other => Err(ApiError::bad_request(format!(
            "unknown response format: {}",
            other
        ))),
    }
}

/// Voice listing for one catalog entry.
#[derive(Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub language: String,
}

/// List catalog voices.
pub async fn voices(State(state): State<AppState>) -> Json<Vec<VoiceInfo>> {
    let voices = state
        .service
        .voices()
        .into_iter()
        .map(|v| VoiceInfo {
            id: v.id,
            language: v.language,
        })
        .collect();
    Json(voices)
}
