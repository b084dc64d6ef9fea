//! Round controller
//!
//! Drives one table through `Open -> Locked -> Settling -> Open`. Betting is
//! only accepted while `Open`. A spin locks the ledger, draws the winning
//! number, settles, credits the payout and reopens with an empty table.
//!
//! If the draw fails the round stays `Locked` and nothing has moved: the
//! caller may [`RoundController::retry_spin`], or [`RoundController::release`]
//! the table to get the wagers back into play.

use super::ledger::{AggregatedBet, BetLedger};
use super::rng::{DrawContext, NumberSource};
use super::settlement::{settle_detailed, Settlement};
use super::types::{BetKind, BetTarget, ChipValue, RoundRecord, VRFBundle, Wager};
use super::wheel::is_valid_number;
use crate::errors::{GameError, RngError, RoyaleResult};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Default number of settled rounds kept in memory
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Open,
    Locked,
    Settling,
}

/// Everything a client needs to animate and display a finished spin
#[derive(Debug, Clone, Serialize)]
pub struct RoundOutcome {
    pub round_id: String,
    pub settlement: Settlement,
    pub balance: u64,
    pub record: RoundRecord,
    pub proof: Option<VRFBundle>,
}

pub struct RoundController<S: NumberSource> {
    player_id: String,
    balance: u64,
    ledger: BetLedger,
    phase: RoundPhase,
    source: S,
    round_id: String,
    rounds_played: u64,
    history: VecDeque<RoundRecord>,
    history_limit: usize,
}

impl<S: NumberSource> RoundController<S> {
    pub fn new(player_id: impl Into<String>, balance: u64, source: S) -> Self {
        Self {
            player_id: player_id.into(),
            balance,
            ledger: BetLedger::new(),
            phase: RoundPhase::Open,
            source,
            round_id: uuid::Uuid::new_v4().to_string(),
            rounds_played: 0,
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round_id(&self) -> &str {
        &self.round_id
    }

    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Settled rounds, most recent last
    pub fn history(&self) -> impl Iterator<Item = &RoundRecord> {
        self.history.iter()
    }

    /// Wagers of the last settled round
    pub fn previous_wagers(&self) -> &[Wager] {
        self.ledger.previous()
    }

    pub fn aggregate(&self) -> BTreeMap<(BetKind, BetTarget), AggregatedBet> {
        self.ledger.aggregate()
    }

    pub fn select_chip(&mut self, value: u64) -> Result<ChipValue, GameError> {
        let chip = ChipValue::new(value)?;
        self.ledger.select_chip(chip);
        Ok(chip)
    }

    pub fn place_bet(&mut self, kind: BetKind, target: &BetTarget) -> Result<Wager, GameError> {
        self.ensure_open()?;
        self.ledger.place(kind, target, &mut self.balance)
    }

    pub fn place_amount(&mut self, kind: BetKind, target: &BetTarget, amount: u64) -> Result<Wager, GameError> {
        self.ensure_open()?;
        self.ledger.place_amount(kind, target, amount, &mut self.balance)
    }

    pub fn undo(&mut self) -> Option<Wager> {
        if self.phase != RoundPhase::Open {
            return None;
        }
        self.ledger.undo_last(&mut self.balance)
    }

    pub fn clear(&mut self) -> Result<u64, GameError> {
        self.ensure_open()?;
        self.ledger.clear(&mut self.balance)
    }

    pub fn double(&mut self) -> Result<Vec<Wager>, GameError> {
        self.ensure_open()?;
        self.ledger.double(&mut self.balance)
    }

    pub fn rebet(&mut self) -> Result<Vec<Wager>, GameError> {
        self.ensure_open()?;
        self.ledger.rebet(&mut self.balance)
    }

    /// Lock the table without drawing, for numbers supplied by an
    /// authoritative server through [`RoundController::resolve`].
    pub fn lock(&mut self) -> Result<(), GameError> {
        self.ensure_open()?;
        if self.ledger.is_empty() {
            return Err(GameError::EmptyRound);
        }
        self.ledger.lock();
        self.phase = RoundPhase::Locked;
        tracing::debug!(round_id = %self.round_id, total = self.ledger.total(), "round locked");
        Ok(())
    }

    /// Lock, draw and settle
    pub fn spin(&mut self) -> RoyaleResult<RoundOutcome> {
        self.lock()?;
        self.draw_and_resolve()
    }

    /// Draw again after a failed draw left the round locked
    pub fn retry_spin(&mut self) -> RoyaleResult<RoundOutcome> {
        if self.phase != RoundPhase::Locked {
            return Err(GameError::NotLocked.into());
        }
        self.draw_and_resolve()
    }

    /// Give up on a locked round; wagers stay on the table and can be cleared
    pub fn release(&mut self) -> Result<(), GameError> {
        if self.phase != RoundPhase::Locked {
            return Err(GameError::NotLocked);
        }
        self.ledger.unlock();
        self.phase = RoundPhase::Open;
        tracing::info!(round_id = %self.round_id, "locked round released");
        Ok(())
    }

    fn draw_and_resolve(&mut self) -> RoyaleResult<RoundOutcome> {
        let context = DrawContext::new(self.round_id.clone(), self.player_id.clone(), self.rounds_played);
        let draw = match self.source.draw(&context) {
            Ok(draw) => draw,
            Err(e) => {
                tracing::warn!(round_id = %self.round_id, source = self.source.name(), error = %e, "draw failed, round stays locked");
                return Err(e.into());
            }
        };
        self.settle_locked(draw.number, draw.proof)
    }

    /// Settle a locked round with a number drawn elsewhere
    pub fn resolve(&mut self, winning_number: u8) -> RoyaleResult<RoundOutcome> {
        if self.phase != RoundPhase::Locked {
            return Err(GameError::NotLocked.into());
        }
        self.settle_locked(winning_number, None)
    }

    fn settle_locked(&mut self, winning_number: u8, proof: Option<VRFBundle>) -> RoyaleResult<RoundOutcome> {
        if !is_valid_number(winning_number) {
            return Err(RngError::Unavailable(format!("winning number {} is off the wheel", winning_number)).into());
        }

        self.phase = RoundPhase::Settling;
        let settlement = settle_detailed(winning_number, self.ledger.wagers());
        self.balance = self.balance.saturating_add(settlement.total_payout);

        let record = RoundRecord {
            winning_number,
            total_wagered: settlement.total_wagered,
            total_payout: settlement.total_payout,
            timestamp: Utc::now(),
        };
        self.history.push_back(record.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }

        self.ledger.finish_round();
        self.rounds_played += 1;
        let round_id = std::mem::replace(&mut self.round_id, uuid::Uuid::new_v4().to_string());
        self.phase = RoundPhase::Open;

        tracing::info!(
            round_id = %round_id,
            winning_number,
            wagered = settlement.total_wagered,
            payout = settlement.total_payout,
            balance = self.balance,
            "round settled"
        );

        Ok(RoundOutcome {
            round_id,
            settlement,
            balance: self.balance,
            record,
            proof,
        })
    }

    fn ensure_open(&self) -> Result<(), GameError> {
        match self.phase {
            RoundPhase::Open => Ok(()),
            RoundPhase::Locked | RoundPhase::Settling => Err(GameError::RoundClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RoyaleError;
    use crate::games::rng::SequenceSource;

    fn table(balance: u64, numbers: Vec<u8>) -> RoundController<SequenceSource> {
        RoundController::new("tester", balance, SequenceSource::new(numbers))
    }

    fn label(kind: BetKind) -> BetTarget {
        BetTarget::default_for(kind)
    }

    #[test]
    fn test_straight_win_credits_payout() {
        let mut round = table(100, vec![17]);
        round.place_amount(BetKind::Straight, &BetTarget::Number(17), 25).unwrap();
        assert_eq!(round.balance(), 75);

        let outcome = round.spin().unwrap();
        assert_eq!(outcome.settlement.total_payout, 900);
        assert_eq!(outcome.balance, 975);
        assert_eq!(round.balance(), 975);
        assert_eq!(round.phase(), RoundPhase::Open);
        assert!(round.ledger().is_empty());
        assert_eq!(round.history().count(), 1);
    }

    #[test]
    fn test_spin_conserves_credits() {
        let mut round = table(1_000, vec![5]);
        round.place_amount(BetKind::Dozen1, &label(BetKind::Dozen1), 10).unwrap();
        round.place_amount(BetKind::Column2, &label(BetKind::Column2), 10).unwrap();
        round.place_amount(BetKind::Black, &label(BetKind::Black), 10).unwrap();

        let before = round.balance() + round.ledger().total();
        let outcome = round.spin().unwrap();
        assert_eq!(outcome.settlement.total_payout, 60);
        assert_eq!(round.balance(), before - outcome.settlement.total_wagered + outcome.settlement.total_payout);
    }

    #[test]
    fn test_empty_round_cannot_spin() {
        let mut round = table(100, vec![3]);
        assert!(matches!(round.spin(), Err(RoyaleError::Game(GameError::EmptyRound))));
        assert_eq!(round.phase(), RoundPhase::Open);
    }

    #[test]
    fn test_failed_draw_keeps_round_locked() {
        let source = SequenceSource::scripted(vec![Err(RngError::Timeout { timeout_ms: 100 }), Ok(0)]);
        let mut round = RoundController::new("tester", 100, source);
        round.place_amount(BetKind::Straight, &BetTarget::Number(0), 10).unwrap();

        assert!(matches!(round.spin(), Err(RoyaleError::Rng(RngError::Timeout { .. }))));
        assert_eq!(round.phase(), RoundPhase::Locked);
        assert_eq!(round.balance(), 90);
        assert_eq!(round.ledger().total(), 10);

        // Table stays closed until the retry lands
        assert_eq!(
            round.place_amount(BetKind::Red, &label(BetKind::Red), 5),
            Err(GameError::RoundClosed)
        );
        assert!(round.undo().is_none());

        let outcome = round.retry_spin().unwrap();
        assert_eq!(outcome.settlement.total_payout, 360);
        assert_eq!(round.balance(), 450);
    }

    #[test]
    fn test_release_returns_wagers_to_play() {
        let source = SequenceSource::scripted(vec![Err(RngError::Unavailable("down".to_string()))]);
        let mut round = RoundController::new("tester", 100, source);
        round.place_amount(BetKind::Even, &label(BetKind::Even), 40).unwrap();

        assert!(round.spin().is_err());
        round.release().unwrap();
        assert_eq!(round.phase(), RoundPhase::Open);
        assert_eq!(round.clear().unwrap(), 40);
        assert_eq!(round.balance(), 100);
        assert_eq!(round.release(), Err(GameError::NotLocked));
    }

    #[test]
    fn test_retry_requires_lock() {
        let mut round = table(100, vec![1]);
        assert!(matches!(round.retry_spin(), Err(RoyaleError::Game(GameError::NotLocked))));
    }

    #[test]
    fn test_resolve_with_external_number() {
        let mut round = table(100, vec![]);
        round.place_amount(BetKind::Red, &label(BetKind::Red), 50).unwrap();
        round.lock().unwrap();

        let outcome = round.resolve(19).unwrap();
        assert_eq!(outcome.settlement.total_payout, 100);
        assert_eq!(round.balance(), 150);
        assert!(matches!(round.resolve(19), Err(RoyaleError::Game(GameError::NotLocked))));
    }

    #[test]
    fn test_off_wheel_number_leaves_round_locked() {
        let mut round = table(100, vec![]);
        round.place_amount(BetKind::Red, &label(BetKind::Red), 50).unwrap();
        round.lock().unwrap();

        assert!(matches!(round.resolve(37), Err(RoyaleError::Rng(_))));
        assert_eq!(round.phase(), RoundPhase::Locked);
        assert_eq!(round.balance(), 50);
    }

    #[test]
    fn test_rebet_repeats_previous_round() {
        let mut round = table(100, vec![2, 2]);
        round.place_amount(BetKind::Odd, &label(BetKind::Odd), 20).unwrap();
        round.spin().unwrap();
        assert_eq!(round.balance(), 80);
        assert_eq!(round.previous_wagers().len(), 1);

        round.rebet().unwrap();
        assert_eq!(round.balance(), 60);
        assert_eq!(round.ledger().total(), 20);
        round.spin().unwrap();
        assert_eq!(round.balance(), 60);
    }

    #[test]
    fn test_round_ids_rotate() {
        let mut round = table(100, vec![1]);
        let first = round.round_id().to_string();
        round.place_amount(BetKind::Red, &label(BetKind::Red), 1).unwrap();

        let outcome = round.spin().unwrap();
        assert_eq!(outcome.round_id, first);
        assert_ne!(round.round_id(), first);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut round = table(1_000, vec![1, 2, 3, 4]).with_history_limit(2);
        for _ in 0..4 {
            round.place_amount(BetKind::Low, &label(BetKind::Low), 1).unwrap();
            round.spin().unwrap();
        }
        let numbers: Vec<u8> = round.history().map(|r| r.winning_number).collect();
        assert_eq!(numbers, vec![3, 4]);
    }

    #[test]
    fn test_chip_selection() {
        let mut round = table(100, vec![]);
        assert!(round.select_chip(7).is_err());
        round.select_chip(25).unwrap();
        let wager = round.place_bet(BetKind::High, &label(BetKind::High)).unwrap();
        assert_eq!(wager.amount, 25);
        assert_eq!(round.balance(), 75);
    }
}
