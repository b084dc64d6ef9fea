//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Static game data
        .route("/api/paytable", get(paytable_handler))
        .route("/api/wheel", get(wheel_handler))
        // Accounts
        .route("/api/players", post(create_player_handler))
        .route("/api/players/:player_id", get(get_player_handler))
        .route("/api/players/:player_id/history", get(history_handler))
        .route("/api/players/:player_id/daily-bonus", post(daily_bonus_handler))
        .route("/api/leaderboard", get(leaderboard_handler))
        // Play and verification
        .route("/api/players/:player_id/spin", post(spin_handler))
        .route("/api/verify/spin", post(verify_spin_handler))
        .with_state(state)
}
