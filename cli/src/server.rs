//! HTTP mode: the codec operations as a small JSON API

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tonalpulse_core::{
    estimate_duration, export_file_name, read_wav, Capacity, DemodulatorConfig, Encoded, Prefix,
    Preset, Synthesis, TonalPulse, TonalPulseError, SAMPLE_RATE,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Codec(#[from] TonalPulseError),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Receiver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        tracing::debug!("request failed: {}", self);
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

/// One codec per preset, built once at startup
pub struct AppState {
    codecs: HashMap<Preset, TonalPulse>,
    default_preset: Preset,
}

impl AppState {
    pub fn new(default_preset: Preset) -> Result<Self, TonalPulseError> {
        let mut codecs = HashMap::new();
        for preset in Preset::ALL {
            codecs.insert(preset, TonalPulse::with_preset(preset)?);
        }
        Ok(Self {
            codecs,
            default_preset,
        })
    }

    fn codec(&self, preset: Option<&str>) -> Result<&TonalPulse, ApiError> {
        let preset = match preset {
            Some(key) => key.parse::<Preset>()?,
            None => self.default_preset,
        };
        self.codecs
            .get(&preset)
            .ok_or_else(|| TonalPulseError::UnknownPreset(preset.key().to_string()).into())
    }
}

type SharedState = Arc<AppState>;

// ---- DTOs ----

#[derive(Debug, Serialize)]
pub struct PresetInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub frequencies: [f32; 5],
}

impl From<Preset> for PresetInfo {
    fn from(preset: Preset) -> Self {
        Self {
            key: preset.key(),
            label: preset.label(),
            description: preset.description(),
            frequencies: preset.frequencies(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VocabularyQuery {
    #[serde(default)]
    pub filter: String,
}

#[derive(Debug, Serialize)]
pub struct WordInfo {
    pub word: &'static str,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub category: &'static str,
    pub words: Vec<WordInfo>,
}

#[derive(Debug, Serialize)]
pub struct CapacityInfo {
    pub symbols: usize,
    pub codes_per_slot: usize,
    pub prefixes: usize,
    pub words: usize,
}

impl From<Capacity> for CapacityInfo {
    fn from(c: Capacity) -> Self {
        Self {
            symbols: c.symbols,
            codes_per_slot: c.codes_per_slot,
            prefixes: c.prefixes,
            words: c.words,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VocabularyResponse {
    pub capacity: CapacityInfo,
    pub categories: Vec<CategoryInfo>,
}

#[derive(Debug, Deserialize)]
pub struct EncodeRequest {
    pub text: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
}

/// One entry of the playback timeline
#[derive(Debug, Serialize)]
pub struct ToneInfo {
    pub symbol: char,
    pub band: &'static str,
    pub frequency: f32,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    pub written: String,
    pub unknown: Vec<String>,
    pub matched: usize,
    pub duration_seconds: f64,
    pub tones: Vec<ToneInfo>,
}

impl EncodeResponse {
    pub fn new(encoded: Encoded, synthesis: &Synthesis) -> Self {
        let tones = synthesis
            .events
            .iter()
            .map(|e| ToneInfo {
                symbol: e.symbol,
                band: e.band.label(),
                frequency: e.frequency,
                start: e.start,
                duration: e.duration,
            })
            .collect();
        Self {
            duration_seconds: synthesis.total_duration,
            written: encoded.written,
            unknown: encoded.unknown,
            matched: encoded.matched,
            tones,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
    pub written: String,
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct WavRequest {
    pub written: String,
    #[serde(default)]
    pub preset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WavResponse {
    pub file_name: String,
    pub sample_rate: u32,
    pub duration_seconds: f64,
    pub wav_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveRequest {
    pub wav_base64: String,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub classify_durations: bool,
}

#[derive(Debug, Serialize)]
pub struct ReceiveResponse {
    pub written: String,
    pub text: String,
}

// ---- handlers ----

async fn list_presets() -> Json<Vec<PresetInfo>> {
    Json(Preset::ALL.into_iter().map(PresetInfo::from).collect())
}

async fn vocabulary(
    State(state): State<SharedState>,
    Query(query): Query<VocabularyQuery>,
) -> Result<Json<VocabularyResponse>, ApiError> {
    let vocabulary = state.codec(None)?.vocabulary();
    let categories = vocabulary
        .search(&query.filter)
        .into_iter()
        .map(|(category, entries)| CategoryInfo {
            category: category.label(),
            words: entries
                .into_iter()
                .map(|e| WordInfo {
                    word: e.word,
                    code: e.code,
                })
                .collect(),
        })
        .collect();
    Ok(Json(VocabularyResponse {
        capacity: vocabulary.capacity().into(),
        categories,
    }))
}

async fn encode(
    State(state): State<SharedState>,
    Json(req): Json<EncodeRequest>,
) -> Result<Json<EncodeResponse>, ApiError> {
    let codec = state.codec(req.preset.as_deref())?;
    let prefix = match req.prefix.as_deref() {
        Some(key) => key.parse::<Prefix>()?,
        None => Prefix::default(),
    };
    let encoded = codec.encode(&req.text, prefix);
    let synthesis = codec.synthesizer().synthesize(&encoded.written);
    Ok(Json(EncodeResponse::new(encoded, &synthesis)))
}

async fn decode(
    State(state): State<SharedState>,
    Json(req): Json<DecodeRequest>,
) -> Result<Json<DecodeResponse>, ApiError> {
    let text = state.codec(None)?.decode(&req.written);
    Ok(Json(DecodeResponse { text }))
}

async fn wav(
    State(state): State<SharedState>,
    Json(req): Json<WavRequest>,
) -> Result<Json<WavResponse>, ApiError> {
    let codec = state.codec(req.preset.as_deref())?;
    let bytes = codec.render_wav(&req.written);
    tracing::debug!("rendered {} WAV bytes for {:?}", bytes.len(), req.written);
    Ok(Json(WavResponse {
        file_name: export_file_name(&req.written),
        sample_rate: SAMPLE_RATE,
        duration_seconds: estimate_duration(&req.written),
        wav_base64: BASE64.encode(bytes),
    }))
}

async fn receive(
    State(state): State<SharedState>,
    Json(req): Json<ReceiveRequest>,
) -> Result<Json<ReceiveResponse>, ApiError> {
    let bytes = BASE64.decode(req.wav_base64.as_bytes())?;
    let audio = read_wav(Cursor::new(bytes))?;
    let config = DemodulatorConfig {
        classify_durations: req.classify_durations,
        ..DemodulatorConfig::default()
    };

    // resolve the preset before leaving the async context so a bad key is a 400
    state.codec(req.preset.as_deref())?;
    let task_state = Arc::clone(&state);
    let preset = req.preset.clone();
    let written = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let codec = task_state.codec(preset.as_deref())?;
        Ok(codec.receive_samples(audio.samples, audio.sample_rate, config)?)
    })
    .await??;

    let text = state.codec(None)?.decode(&written);
    tracing::info!("received {:?} -> {:?}", written, text);
    Ok(Json(ReceiveResponse { written, text }))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/presets", get(list_presets))
        .route("/api/vocabulary", get(vocabulary))
        .route("/api/encode", post(encode))
        .route("/api/decode", post(decode))
        .route("/api/wav", post(wav))
        .route("/api/receive", post(receive))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub async fn serve(bind: SocketAddr, default_preset: Preset) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(default_preset)?);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        "serving Tonal Pulse API on http://{} (default preset {})",
        listener.local_addr()?,
        default_preset
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
