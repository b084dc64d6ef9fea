//! European single-zero roulette: wheel, bets, settlement and the round flow.

pub mod ledger;
pub mod processor;
pub mod rng;
pub mod round;
pub mod settlement;
pub mod types;
pub mod vrf_engine;
pub mod wheel;

pub use ledger::{AggregatedBet, BetLedger};
pub use processor::GameProcessor;
pub use rng::{Draw, DrawContext, LocalRng, NumberSource, SequenceSource, VrfSource};
pub use round::{RoundController, RoundOutcome, RoundPhase};
pub use settlement::{settle, settle_detailed, Settlement};
pub use types::*;
pub use vrf_engine::VRFGameEngine;
