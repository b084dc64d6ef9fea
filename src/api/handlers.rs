//! Request Handlers

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::accounts::DailyBonus;
use crate::games::processor::GameProcessor;
use crate::games::settlement::{paytable, settle};
use crate::games::types::{SpinRequest, SpinResult, Wager, CHIP_VALUES};
use crate::games::vrf_engine::VRFGameEngine;
use crate::games::wheel::{color_of, WHEEL_ORDER};
use crate::metrics::MetricsRegistry;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub processor: Arc<GameProcessor>,
    pub metrics: Arc<MetricsRegistry>,
    pub node_id: String,
    pub version: String,
    pub rng_source: String,
    /// Hex public key of the VRF engine, when spins are VRF-backed
    pub vrf_public_key: Option<String>,
    pub metrics_enabled: bool,
}

/// Unwrap a JSON body, turning a malformed one into a 400 with `code`
fn json_body<T>(payload: Result<Json<T>, JsonRejection>, request_id: &RequestId, code: &'static str) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(request_id.0.clone(), rejection.body_text()).with_code(code))
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        node_id: state.node_id.clone(),
        version: state.version.clone(),
        rng_source: state.rng_source.clone(),
        uptime_seconds: state.metrics.snapshot().uptime_seconds,
    })
}

/// POST /api/players
pub async fn create_player_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreatePlayerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlayerResponse>), ApiError> {
    let request = json_body(payload, &request_id, "INVALID_ACCOUNT")?;
    let record = state
        .processor
        .create_account(request.player_id, &request.username)
        .await
        .map_err(|e| ApiError::from_royale(request_id.0, e))?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/players/:player_id
pub async fn get_player_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerResponse>, ApiError> {
    let record = state
        .processor
        .get_account(&player_id)
        .await
        .map_err(|e| ApiError::from_royale(request_id.0, e))?;

    Ok(Json(record.into()))
}

/// GET /api/players/:player_id/history?limit={n}
pub async fn history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let record = state
        .processor
        .get_account(&player_id)
        .await
        .map_err(|e| ApiError::from_royale(request_id.0, e))?;

    let limit = query.limit.unwrap_or(record.history.len());
    Ok(Json(HistoryResponse {
        rounds: record.recent_history(limit).to_vec(),
        player_id,
    }))
}

/// POST /api/players/:player_id/daily-bonus
pub async fn daily_bonus_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<DailyBonus>, ApiError> {
    state
        .processor
        .claim_daily_bonus(&player_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_royale(request_id.0, e))
}

/// GET /api/leaderboard?type={balance|wins|games|bigwin}
pub async fn leaderboard_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let leaderboard = state
        .processor
        .leaderboard(query.kind)
        .await
        .map_err(|e| ApiError::from_royale(request_id.0, e))?;

    Ok(Json(LeaderboardResponse {
        kind: query.kind,
        leaderboard,
    }))
}

/// GET /api/paytable
pub async fn paytable_handler() -> Json<PaytableResponse> {
    Json(PaytableResponse {
        entries: paytable(),
        chip_values: CHIP_VALUES.to_vec(),
    })
}

/// GET /api/wheel
pub async fn wheel_handler() -> Json<WheelResponse> {
    Json(WheelResponse {
        order: WHEEL_ORDER.to_vec(),
        pockets: WHEEL_ORDER
            .iter()
            .enumerate()
            .map(|(position, &number)| PocketInfo {
                number,
                color: color_of(number),
                position,
            })
            .collect(),
    })
}

/// POST /api/players/:player_id/spin
pub async fn spin_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    payload: Result<Json<SpinRequest>, JsonRejection>,
) -> Result<Json<SpinResult>, ApiError> {
    let request = json_body(payload, &request_id, "INVALID_WAGER")?;
    state
        .processor
        .process_spin(&player_id, &request)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_royale(request_id.0, e))
}

/// POST /api/verify/spin
///
/// Recomputes the winning number from a VRF bundle and, when wagers are
/// supplied, the payout they would have received.
pub async fn verify_spin_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifySpinRequest>, JsonRejection>,
) -> Result<Json<VerifySpinResponse>, ApiError> {
    let request = json_body(payload, &request_id, "INVALID_WAGER")?;
    let expected_input = VRFGameEngine::input_message(&request.round_id, &request.player_id, request.nonce);
    let winning_number = VRFGameEngine::verify_roulette_spin(&request.vrf, &expected_input)
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), e).with_code("INVALID_PROOF"))?;

    let total_payout = match (winning_number, request.wagers.is_empty()) {
        (Some(n), false) => {
            let wagers = request
                .wagers
                .iter()
                .map(|w| Wager::new(w.bet_kind, &w.target, w.amount))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ApiError::from_royale(request_id.0.clone(), e.into()))?;
            Some(settle(n, &wagers))
        }
        _ => None,
    };

    Ok(Json(VerifySpinResponse {
        valid: winning_number.is_some(),
        signed_by_this_server: state.vrf_public_key.as_deref() == Some(request.vrf.public_key.as_str()),
        winning_number,
        winning_color: winning_number.map(color_of),
        total_payout,
    }))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.metrics_enabled {
        return (StatusCode::NOT_FOUND, "metrics disabled\n".to_string()).into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus_format(),
    )
        .into_response()
}
