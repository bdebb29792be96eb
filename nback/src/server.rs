//! Axum HTTP server: the core exposed to a browser presentation layer.
//!
//! The server holds a single [`SessionDriver`] shared as `Arc<AppContext>`.
//! Rendering, speech and key handling stay in the frontend; it polls
//! `/session` and posts presses to `/session/respond`.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/config` | Grid, alphabet, N range and timing |
//! | POST | `/generate` | Generate a sequence without starting a session |
//! | GET | `/session` | Current session snapshot |
//! | POST | `/session/start` | Generate a sequence and start playing it |
//! | POST | `/session/respond` | Flag a match on `visual` or `audio` |
//! | POST | `/session/restart` | Abandon the session and go idle |

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::constants::*;
use crate::driver::{NullPresenter, SessionDriver};
use crate::generator::{generate, targets, Generation};
use crate::types::{Channel, GeneratorConfig, Timing};

/// Shared server state.
pub struct AppContext {
    pub driver: SessionDriver,
    pub timing: Timing,
}

impl AppContext {
    pub fn new(timing: Timing) -> Self {
        Self {
            driver: SessionDriver::new(timing, Arc::new(NullPresenter)),
            timing,
        }
    }
}

pub type AppState = Arc<AppContext>;

pub fn create_router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health_check))
        .route("/config", get(handle_get_config))
        .route("/generate", post(handle_generate))
        .route("/session", get(handle_get_session))
        .route("/session/start", post(handle_start))
        .route("/session/respond", post(handle_respond))
        .route("/session/restart", post(handle_restart))
        .layer(cors)
        .with_state(ctx)
}

// ── Request/Response types ──────────────────────────────────────────

#[derive(Deserialize)]
struct GenerateRequest {
    n: usize,
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct RespondRequest {
    channel: Channel,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, msg: &str) -> ApiError {
    (status, Json(serde_json::json!({ "error": msg })))
}

/// Unwrap a JSON body, reporting malformed or mistyped input in the same
/// `{"error": …}` shape as every other failure.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| error_response(rejection.status(), &rejection.body_text()))
}

/// Validate N against the player-facing range and run the generator.
fn generate_for(req: &GenerateRequest) -> Result<(GeneratorConfig, Generation), ApiError> {
    if !is_supported_n(req.n) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            &format!("n must be between {} and {}", N_MIN, N_MAX),
        ));
    }
    let config = GeneratorConfig::for_n(req.n);
    let mut rng = match req.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    };
    let generation = generate(&config, &mut rng)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e.to_string()))?;
    Ok((config, generation))
}

// ── GET handlers ────────────────────────────────────────────────────

async fn handle_health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

async fn handle_get_config(State(ctx): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "grid_size": GRID_SIZE,
        "letters": LETTERS,
        "n_min": N_MIN,
        "n_max": N_MAX,
        "default_n": DEFAULT_N,
        "base_trial_count": BASE_TRIAL_COUNT,
        "trial_ms": ctx.timing.trial.as_millis() as u64,
        "pause_ms": ctx.timing.pause.as_millis() as u64,
    }))
}

async fn handle_get_session(State(ctx): State<AppState>) -> impl IntoResponse {
    Json(ctx.driver.snapshot().await)
}

// ── POST handlers ───────────────────────────────────────────────────

async fn handle_generate(
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = json_body(payload)?;
    let (config, generation) = generate_for(&req)?;
    Ok(Json(serde_json::json!({
        "targets": targets(&config),
        "realized": generation.sequence().match_counts(),
        "generation": generation,
    })))
}

async fn handle_start(
    State(ctx): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = json_body(payload)?;
    let (_, generation) = generate_for(&req)?;
    let exact = generation.is_exact();
    let attempts = generation.attempts();
    let session = ctx.driver.start(generation.into_sequence()).await;
    Ok(Json(serde_json::json!({
        "exact": exact,
        "attempts": attempts,
        "session": session,
    })))
}

async fn handle_respond(
    State(ctx): State<AppState>,
    payload: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = json_body(payload)?;
    let (registered, session) = ctx.driver.respond(req.channel).await;
    Ok(Json(serde_json::json!({
        "channel": req.channel,
        "registered": registered,
        "session": session,
    })))
}

async fn handle_restart(State(ctx): State<AppState>) -> impl IntoResponse {
    Json(ctx.driver.restart().await)
}
