//! API Request and Response Models

use crate::accounts::{AccountRecord, LeaderboardEntry, LeaderboardKind};
use crate::games::settlement::PaytableEntry;
use crate::games::types::{Color, RoundRecord, VRFBundle, WagerRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub version: String,
    pub rng_source: String,
    pub uptime_seconds: u64,
}

/// POST /api/players
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlayerRequest {
    pub username: String,
    /// Chosen by the server when absent
    #[serde(default)]
    pub player_id: Option<String>,
}

/// Public view of an account; history is served separately
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub player_id: String,
    pub username: String,
    pub balance: u64,
    pub bonus_spins: u32,
    pub total_won: u64,
    pub total_wagered: u64,
    pub games_played: u64,
    pub biggest_win: u64,
    pub vip_level: u8,
    pub last_daily_bonus: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRecord> for PlayerResponse {
    fn from(record: AccountRecord) -> Self {
        Self {
            player_id: record.player_id,
            username: record.username,
            balance: record.balance,
            bonus_spins: record.bonus_spins,
            total_won: record.total_won,
            total_wagered: record.total_wagered,
            games_played: record.games_played,
            biggest_win: record.biggest_win,
            vip_level: record.vip_level,
            last_daily_bonus: record.last_daily_bonus,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub player_id: String,
    pub rounds: Vec<RoundRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(rename = "type", default)]
    pub kind: LeaderboardKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(rename = "type")]
    pub kind: LeaderboardKind,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaytableResponse {
    pub entries: Vec<PaytableEntry>,
    pub chip_values: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocketInfo {
    pub number: u8,
    pub color: Color,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelResponse {
    /// Clockwise from 0
    pub order: Vec<u8>,
    pub pockets: Vec<PocketInfo>,
}

/// POST /api/verify/spin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySpinRequest {
    pub round_id: String,
    pub player_id: String,
    pub nonce: u64,
    pub vrf: VRFBundle,
    /// When present, the payout for these wagers is recomputed as well
    #[serde(default)]
    pub wagers: Vec<WagerRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifySpinResponse {
    pub valid: bool,
    /// Whether the bundle was signed by this server's key
    pub signed_by_this_server: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_payout: Option<u64>,
}
