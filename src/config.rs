//! Configuration management with validation and defaults
//!
//! Settings come from defaults, an optional TOML file and `ROYALE_*`
//! environment variables, in that order of precedence.

use crate::errors::{ConfigurationError, RoyaleResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Complete service configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoyaleConfig {
    pub server: ServerConfig,
    pub game: GameConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
}

/// HTTP server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub node_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            node_id: "royale-node-1".to_string(),
        }
    }
}

/// Table rules and account economy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Credits granted to a new account
    pub welcome_balance: u64,
    /// Bonus spins granted to a new account
    pub welcome_bonus_spins: u32,
    /// Rounds kept in an account's history
    pub history_limit: usize,
    /// Rounds echoed back in a spin response
    pub response_history_len: usize,
    /// Upper bound on one winning-number draw
    pub rng_timeout_ms: u64,
    pub max_wagers_per_spin: usize,
    /// Largest total stake a bonus spin may carry
    pub bonus_spin_max_stake: u64,
    pub daily_bonus_base: u64,
    pub daily_bonus_cooldown_secs: u64,
    /// Hex-encoded 32-byte VRF seed; generated (and persisted with rocksdb) when absent
    pub vrf_seed_hex: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            welcome_balance: 5_000,
            welcome_bonus_spins: 10,
            history_limit: 50,
            response_history_len: 10,
            rng_timeout_ms: 2_000,
            max_wagers_per_spin: 200,
            bonus_spin_max_stake: 500,
            daily_bonus_base: 500,
            daily_bonus_cooldown_secs: 24 * 60 * 60,
            vrf_seed_hex: None,
        }
    }
}

/// Where account records live
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::Rocksdb),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    /// Whether to clear the database on startup (testing only!)
    pub clear_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Rocksdb,
            data_directory: "./DB/royale_data".to_string(),
            write_buffer_size_mb: 64,
            clear_on_start: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    pub log_level: LogLevel,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_level: LogLevel::Info,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Default `EnvFilter` directive for this level
    pub fn filter_directive(&self) -> String {
        let level = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        format!("roulette_royale={level},royale_server={level},tower_http=info")
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl RoyaleConfig {
    /// Local development: in-memory accounts, verbose logs
    pub fn development() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Debug,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Production deployment with persistence and restricted CORS
    pub fn production() -> Self {
        Self {
            server: ServerConfig {
                allowed_origins: vec![],
                request_timeout_secs: 15,
                ..Default::default()
            },
            storage: StorageConfig {
                backend: StorageBackend::Rocksdb,
                data_directory: "./DB/royale_data".to_string(),
                write_buffer_size_mb: 128,
                clear_on_start: false,
            },
            ..Default::default()
        }
    }

    /// Tests: in-memory storage, short timeouts
    pub fn testing() -> Self {
        Self {
            game: GameConfig {
                rng_timeout_ms: 200,
                ..Default::default()
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                clear_on_start: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "server.port must be > 0".to_string(),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "server.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.game.welcome_balance == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "game.welcome_balance must be > 0".to_string(),
            ));
        }

        if self.game.history_limit == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "game.history_limit must be > 0".to_string(),
            ));
        }

        if self.game.rng_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "game.rng_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.game.max_wagers_per_spin == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "game.max_wagers_per_spin must be > 0".to_string(),
            ));
        }

        if self.game.response_history_len > self.game.history_limit {
            return Err(ConfigValidationError::LogicalInconsistency(
                "game.response_history_len cannot exceed game.history_limit".to_string(),
            ));
        }

        // A draw that outlives the whole request can never be reported back
        if self.game.rng_timeout_ms >= self.server.request_timeout_secs * 1000 {
            return Err(ConfigValidationError::LogicalInconsistency(
                "game.rng_timeout_ms must be shorter than the request timeout".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Rocksdb && self.storage.data_directory.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "storage.data_directory".to_string(),
            ));
        }

        if let Some(seed) = &self.game.vrf_seed_hex {
            match hex::decode(seed) {
                Ok(bytes) if bytes.len() == 32 => {}
                _ => {
                    return Err(ConfigValidationError::InvalidValue(
                        "game.vrf_seed_hex must be 32 hex-encoded bytes".to_string(),
                    ))
                }
            }
        }

        Ok(())
    }

    pub fn rng_timeout(&self) -> Duration {
        Duration::from_millis(self.game.rng_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidValue(String),
    LogicalInconsistency(String),
    MissingRequired(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigValidationError::LogicalInconsistency(msg) => write!(f, "Configuration logical inconsistency: {}", msg),
            ConfigValidationError::MissingRequired(msg) => write!(f, "Missing required configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl From<ConfigValidationError> for ConfigurationError {
    fn from(e: ConfigValidationError) -> Self {
        ConfigurationError::ValidationFailed(e.to_string())
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> RoyaleResult<RoyaleConfig> {
        let mut config = match &self.config_path {
            Some(path) => self.load_from_file(path)?,
            None => RoyaleConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;

        config.validate().map_err(ConfigurationError::from)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> RoyaleResult<RoyaleConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut RoyaleConfig) -> RoyaleResult<()> {
        if let Ok(host) = env::var("ROYALE_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("ROYALE_PORT") {
            config.server.port = parse_env("ROYALE_PORT", port, "Invalid port number")?;
        }

        if let Ok(data_dir) = env::var("ROYALE_DATA_DIR") {
            config.storage.data_directory = data_dir;
        }
        if let Ok(backend) = env::var("ROYALE_STORAGE_BACKEND") {
            config.storage.backend = parse_env("ROYALE_STORAGE_BACKEND", backend, "Expected memory or rocksdb")?;
        }

        if let Ok(timeout) = env::var("ROYALE_RNG_TIMEOUT_MS") {
            config.game.rng_timeout_ms = parse_env("ROYALE_RNG_TIMEOUT_MS", timeout, "Invalid timeout value")?;
        }

        if let Ok(level) = env::var("ROYALE_LOG_LEVEL") {
            config.monitoring.log_level = parse_env("ROYALE_LOG_LEVEL", level, "Invalid log level")?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &RoyaleConfig, path: &str) -> RoyaleResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String, reason: &str) -> RoyaleResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
        .into()
    })
}

/// Write the default configuration to `path`
pub fn generate_sample_config(path: &str) -> RoyaleResult<()> {
    ConfigLoader::new().save(&RoyaleConfig::default(), path)
}
