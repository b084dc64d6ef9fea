//! API Error Handling
//!
//! Structured error responses with proper HTTP status codes and request tracking.

use crate::errors::{GameError, RoyaleError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code (INSUFFICIENT_FUNDS, INVALID_WAGER, RNG_UNAVAILABLE, ...)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error types with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
    pub code: Option<&'static str>,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unprocessable(String),
    InternalError(String),
    ServiceUnavailable(String),
}

impl ApiError {
    fn new(request_id: String, kind: ApiErrorKind) -> Self {
        Self {
            kind,
            request_id,
            code: None,
            details: None,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self::new(request_id, ApiErrorKind::NotFound(message))
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self::new(request_id, ApiErrorKind::BadRequest(message))
    }

    pub fn conflict(request_id: String, message: String) -> Self {
        Self::new(request_id, ApiErrorKind::Conflict(message))
    }

    pub fn unprocessable(request_id: String, message: String) -> Self {
        Self::new(request_id, ApiErrorKind::Unprocessable(message))
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self::new(request_id, ApiErrorKind::InternalError(message))
    }

    pub fn service_unavailable(request_id: String, message: String) -> Self {
        Self::new(request_id, ApiErrorKind::ServiceUnavailable(message))
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Map a service error onto a status code and a stable error code
    pub fn from_royale(request_id: String, err: RoyaleError) -> Self {
        let message = err.to_string();
        match err {
            RoyaleError::Game(game) => Self::from_game(request_id, game),
            RoyaleError::Rng(rng) => Self::service_unavailable(request_id, rng.to_string())
                .with_code("RNG_UNAVAILABLE")
                .with_details(json!({ "retryable": rng.is_retryable() })),
            RoyaleError::Storage(_) => Self::internal_error(request_id, message).with_code("STORAGE_ERROR"),
            RoyaleError::Configuration(_) => Self::internal_error(request_id, message),
        }
    }

    fn from_game(request_id: String, err: GameError) -> Self {
        let message = err.to_string();
        match err {
            GameError::InvalidWager(_) => Self::bad_request(request_id, message).with_code("INVALID_WAGER"),
            GameError::EmptyRound => Self::bad_request(request_id, message).with_code("EMPTY_ROUND"),
            GameError::InsufficientFunds { needed, available } => Self::unprocessable(request_id, message)
                .with_code("INSUFFICIENT_FUNDS")
                .with_details(json!({ "needed": needed, "available": available })),
            GameError::BonusStakeTooLarge { stake, limit } => Self::unprocessable(request_id, message)
                .with_code("BONUS_STAKE_TOO_LARGE")
                .with_details(json!({ "stake": stake, "limit": limit })),
            GameError::InvalidAccount(_) => Self::bad_request(request_id, message).with_code("INVALID_ACCOUNT"),
            GameError::AccountNotFound(_) => Self::not_found(request_id, message).with_code("ACCOUNT_NOT_FOUND"),
            GameError::AccountExists(_) => Self::conflict(request_id, message).with_code("ACCOUNT_EXISTS"),
            GameError::DailyBonusCooldown { hours_remaining } => Self::conflict(request_id, message)
                .with_code("DAILY_BONUS_COOLDOWN")
                .with_details(json!({ "hours_remaining": hours_remaining })),
            GameError::RoundClosed | GameError::NothingToRebet | GameError::LedgerNotEmpty | GameError::NotLocked => {
                Self::conflict(request_id, message).with_code("ROUND_STATE")
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::NotFound(msg) => write!(f, "[{}] Not Found: {}", self.request_id, msg),
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::Conflict(msg) => write!(f, "[{}] Conflict: {}", self.request_id, msg),
            ApiErrorKind::Unprocessable(msg) => write!(f, "[{}] Unprocessable: {}", self.request_id, msg),
            ApiErrorKind::InternalError(msg) => write!(f, "[{}] Internal Error: {}", self.request_id, msg),
            ApiErrorKind::ServiceUnavailable(msg) => {
                write!(f, "[{}] Service Unavailable: {}", self.request_id, msg)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, default_code, message) = match self.kind {
            ApiErrorKind::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiErrorKind::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiErrorKind::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiErrorKind::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg),
            ApiErrorKind::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiErrorKind::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg),
        };

        if status.is_server_error() {
            tracing::error!(request_id = %self.request_id, status = %status, %message, "request failed");
        }

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: self.code.unwrap_or(default_code).to_string(),
                message,
                details: self.details,
            },
        });

        (status, body).into_response()
    }
}
