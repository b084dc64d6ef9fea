//! Winning-number sources
//!
//! The round controller and the spin processor take the number from a
//! [`NumberSource`]. Only sources reporting `is_trusted()` may decide
//! outcomes that move real balances; [`LocalRng`] exists for offline play
//! and the simulator.

use super::types::{VRFBundle, MAX_NUMBER};
use super::vrf_engine::VRFGameEngine;
use crate::errors::RngError;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What a draw is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawContext {
    pub round_id: String,
    pub player_id: String,
    pub nonce: u64,
}

impl DrawContext {
    pub fn new(round_id: impl Into<String>, player_id: impl Into<String>, nonce: u64) -> Self {
        Self {
            round_id: round_id.into(),
            player_id: player_id.into(),
            nonce,
        }
    }
}

/// A winning number plus, for provable sources, its proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub number: u8,
    pub proof: Option<VRFBundle>,
}

pub trait NumberSource: Send + Sync {
    /// Produce a number in 0..=36. May block; callers bound it with a timeout.
    fn draw(&self, context: &DrawContext) -> Result<Draw, RngError>;

    /// Whether outcomes from this source may settle real balances
    fn is_trusted(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Thread-local RNG. Untrusted: for offline play and simulation only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRng;

impl NumberSource for LocalRng {
    fn draw(&self, _context: &DrawContext) -> Result<Draw, RngError> {
        Ok(Draw {
            number: rand::thread_rng().gen_range(0..=MAX_NUMBER),
            proof: None,
        })
    }

    fn is_trusted(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Server-side VRF source; each number carries a verifiable proof
#[derive(Clone)]
pub struct VrfSource {
    engine: Arc<VRFGameEngine>,
}

impl VrfSource {
    pub fn new(engine: Arc<VRFGameEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<VRFGameEngine> {
        &self.engine
    }
}

impl NumberSource for VrfSource {
    fn draw(&self, context: &DrawContext) -> Result<Draw, RngError> {
        let bundle = self
            .engine
            .generate_outcome(&context.round_id, &context.player_id, context.nonce)
            .map_err(RngError::Unavailable)?;
        let output = hex::decode(&bundle.vrf_output).map_err(|e| RngError::Unavailable(e.to_string()))?;

        Ok(Draw {
            number: VRFGameEngine::compute_roulette_number(&output),
            proof: Some(bundle),
        })
    }

    fn is_trusted(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "vrf"
    }
}

/// Replays a fixed script of numbers and failures, then reports itself
/// unavailable. Used for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct SequenceSource {
    script: Mutex<VecDeque<Result<u8, RngError>>>,
    trusted: bool,
}

impl SequenceSource {
    pub fn new(numbers: impl IntoIterator<Item = u8>) -> Self {
        Self::scripted(numbers.into_iter().map(Ok))
    }

    pub fn scripted(script: impl IntoIterator<Item = Result<u8, RngError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            trusted: false,
        }
    }

    /// Mark as trusted so it can drive the authoritative spin path in tests
    pub fn trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl NumberSource for SequenceSource {
    fn draw(&self, _context: &DrawContext) -> Result<Draw, RngError> {
        let next = self
            .script
            .lock()
            .map_err(|_| RngError::Unavailable("sequence lock poisoned".to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(RngError::Unavailable("sequence exhausted".to_string())))?;

        if next > MAX_NUMBER {
            return Err(RngError::Unavailable(format!("scripted number {} is off the wheel", next)));
        }
        Ok(Draw {
            number: next,
            proof: None,
        })
    }

    fn is_trusted(&self) -> bool {
        self.trusted
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

impl<S: NumberSource + ?Sized> NumberSource for Arc<S> {
    fn draw(&self, context: &DrawContext) -> Result<Draw, RngError> {
        (**self).draw(context)
    }

    fn is_trusted(&self) -> bool {
        (**self).is_trusted()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
