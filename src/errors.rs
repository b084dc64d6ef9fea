//! Error types for the Roulette Royale service
//!
//! One root error with a sub-enum per concern, so callers can match on the
//! concern they care about and `?` everything else upward.

use thiserror::Error;

/// Root error type for all Royale operations
#[derive(Debug, Error)]
pub enum RoyaleError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("RNG error: {0}")]
    Rng(#[from] RngError),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Rule violations raised by the ledger, the round controller and the spin processor.
///
/// None of these leave partial state behind: the operation that raised them
/// has not touched the ledger or the balance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Betting is closed while the wheel is spinning")]
    RoundClosed,

    #[error("Place at least one bet before spinning")]
    EmptyRound,

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("Invalid wager: {0}")]
    InvalidWager(String),

    #[error("No previous bets to repeat")]
    NothingToRebet,

    #[error("Clear the table before repeating the last round")]
    LedgerNotEmpty,

    #[error("No spin is in progress")]
    NotLocked,

    #[error("Bonus spin stake {stake} exceeds the limit of {limit}")]
    BonusStakeTooLarge { stake: u64, limit: u64 },

    #[error("Invalid account details: {0}")]
    InvalidAccount(String),

    #[error("Account {0} not found")]
    AccountNotFound(String),

    #[error("Account {0} already exists")]
    AccountExists(String),

    #[error("Daily bonus already claimed, come back in {hours_remaining} hours")]
    DailyBonusCooldown { hours_remaining: u64 },
}

/// Storage system errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Failures of the winning-number source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RngError {
    #[error("Random number source unavailable: {0}")]
    Unavailable(String),

    #[error("Random number source did not answer within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl RngError {
    /// RNG failures never mutate state, so the caller can always try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RngError::Unavailable(_) | RngError::Timeout { .. })
    }
}

impl From<rocksdb::Error> for RoyaleError {
    fn from(e: rocksdb::Error) -> Self {
        RoyaleError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<std::io::Error> for RoyaleError {
    fn from(e: std::io::Error) -> Self {
        RoyaleError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for RoyaleError {
    fn from(e: serde_json::Error) -> Self {
        RoyaleError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

pub type RoyaleResult<T> = Result<T, RoyaleError>;
