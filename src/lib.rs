//! Roulette Royale - European roulette backend
//!
//! Server-authoritative spins with VRF proofs, persistent player accounts,
//! and an offline round controller for local play and simulation.

pub mod accounts;
pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod metrics;
pub mod storage;

pub use config::{ConfigLoader, RoyaleConfig};
pub use errors::{RoyaleError, RoyaleResult};
pub use games::{GameProcessor, RoundController, VRFGameEngine};
pub use metrics::MetricsRegistry;
