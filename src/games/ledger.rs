//! Bet ledger for the round in progress
//!
//! Every mutation takes the balance it draws from as `&mut u64` and moves
//! exactly the amount it adds to or removes from the table, inside the same
//! call. A failed operation leaves both untouched.

use super::types::{BetKind, BetTarget, ChipValue, Wager};
use crate::errors::GameError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Stake summed per betting spot
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AggregatedBet {
    pub bet_kind: BetKind,
    pub target: BetTarget,
    pub amount: u64,
    pub payout_ratio: u64,
    pub chips: usize,
}

#[derive(Debug, Default)]
pub struct BetLedger {
    wagers: Vec<Wager>,
    /// Wagers of the last settled round, for rebet
    previous: Vec<Wager>,
    chip: ChipValue,
    locked: bool,
}

impl BetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_chip(&mut self, chip: ChipValue) {
        self.chip = chip;
    }

    pub fn chip(&self) -> ChipValue {
        self.chip
    }

    /// Place one chip of the selected denomination
    pub fn place(&mut self, kind: BetKind, target: &BetTarget, balance: &mut u64) -> Result<Wager, GameError> {
        self.place_amount(kind, target, self.chip.value(), balance)
    }

    /// Place an arbitrary positive amount
    pub fn place_amount(
        &mut self,
        kind: BetKind,
        target: &BetTarget,
        amount: u64,
        balance: &mut u64,
    ) -> Result<Wager, GameError> {
        if self.locked {
            return Err(GameError::RoundClosed);
        }
        if *balance < amount {
            return Err(GameError::InsufficientFunds {
                needed: amount,
                available: *balance,
            });
        }
        let wager = Wager::new(kind, target, amount)?;

        *balance -= amount;
        self.wagers.push(wager.clone());
        Ok(wager)
    }

    /// Take back the most recent placement. No-op when empty or locked.
    pub fn undo_last(&mut self, balance: &mut u64) -> Option<Wager> {
        if self.locked {
            return None;
        }
        let wager = self.wagers.pop()?;
        *balance += wager.amount;
        Some(wager)
    }

    /// Remove everything from the table and refund it; returns the refund
    pub fn clear(&mut self, balance: &mut u64) -> Result<u64, GameError> {
        if self.locked {
            return Err(GameError::RoundClosed);
        }
        let refund = self.total();
        self.wagers.clear();
        *balance += refund;
        Ok(refund)
    }

    /// Duplicate every wager on the table
    pub fn double(&mut self, balance: &mut u64) -> Result<Vec<Wager>, GameError> {
        if self.locked {
            return Err(GameError::RoundClosed);
        }
        let copies: Vec<Wager> = self.wagers.iter().map(Wager::duplicate).collect();
        self.commit_copies(copies, balance)
    }

    /// Repeat the previous round's wagers on an empty table
    pub fn rebet(&mut self, balance: &mut u64) -> Result<Vec<Wager>, GameError> {
        if self.locked {
            return Err(GameError::RoundClosed);
        }
        if !self.wagers.is_empty() {
            return Err(GameError::LedgerNotEmpty);
        }
        if self.previous.is_empty() {
            return Err(GameError::NothingToRebet);
        }
        let copies: Vec<Wager> = self.previous.iter().map(Wager::duplicate).collect();
        self.commit_copies(copies, balance)
    }

    fn commit_copies(&mut self, copies: Vec<Wager>, balance: &mut u64) -> Result<Vec<Wager>, GameError> {
        let needed: u64 = copies.iter().map(|w| w.amount).sum();
        if *balance < needed {
            return Err(GameError::InsufficientFunds {
                needed,
                available: *balance,
            });
        }

        *balance -= needed;
        self.wagers.extend(copies.iter().cloned());
        Ok(copies)
    }

    /// Group by spot, summing amounts
    pub fn aggregate(&self) -> BTreeMap<(BetKind, BetTarget), AggregatedBet> {
        let mut spots: BTreeMap<(BetKind, BetTarget), AggregatedBet> = BTreeMap::new();
        for wager in &self.wagers {
            spots
                .entry((wager.bet_kind, wager.target.clone()))
                .and_modify(|spot| {
                    spot.amount += wager.amount;
                    spot.chips += 1;
                })
                .or_insert_with(|| AggregatedBet {
                    bet_kind: wager.bet_kind,
                    target: wager.target.clone(),
                    amount: wager.amount,
                    payout_ratio: wager.payout_ratio,
                    chips: 1,
                });
        }
        spots
    }

    /// Stake currently on one spot
    pub fn amount_on(&self, kind: BetKind, target: &BetTarget) -> u64 {
        self.wagers
            .iter()
            .filter(|w| w.bet_kind == kind && &w.target == target)
            .map(|w| w.amount)
            .sum()
    }

    pub fn total(&self) -> u64 {
        self.wagers.iter().map(|w| w.amount).sum()
    }

    pub fn wagers(&self) -> &[Wager] {
        &self.wagers
    }

    pub fn previous(&self) -> &[Wager] {
        &self.previous
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }

    pub(crate) fn unlock(&mut self) {
        self.locked = false;
    }

    /// Hand the table over to settlement, keeping a copy for rebet
    pub(crate) fn finish_round(&mut self) -> Vec<Wager> {
        let settled = std::mem::take(&mut self.wagers);
        self.previous = settled.clone();
        self.locked = false;
        settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> BetTarget {
        BetTarget::default_for(BetKind::Red)
    }

    #[test]
    fn test_place_debits_chip() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;
        ledger.select_chip(ChipValue::new(25).unwrap());

        let wager = ledger.place(BetKind::Red, &red(), &mut balance).unwrap();
        assert_eq!(wager.amount, 25);
        assert_eq!(wager.payout_ratio, 1);
        assert_eq!(balance, 75);
        assert_eq!(ledger.total(), 25);
    }

    #[test]
    fn test_over_balance_rejected() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;

        let err = ledger
            .place_amount(BetKind::Straight, &BetTarget::Number(7), 150, &mut balance)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientFunds {
                needed: 150,
                available: 100
            }
        );
        assert_eq!(balance, 100);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_invalid_target_leaves_state_untouched() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;

        assert!(ledger
            .place_amount(BetKind::Straight, &BetTarget::Number(40), 5, &mut balance)
            .is_err());
        assert_eq!(balance, 100);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_place_then_undo_round_trips() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;

        let placed = ledger.place_amount(BetKind::Odd, &BetTarget::default_for(BetKind::Odd), 40, &mut balance).unwrap();
        assert_eq!(balance, 60);

        let undone = ledger.undo_last(&mut balance).unwrap();
        assert_eq!(undone, placed);
        assert_eq!(balance, 100);
        assert!(ledger.is_empty());
        assert!(ledger.undo_last(&mut balance).is_none());
    }

    #[test]
    fn test_clear_refunds_everything() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;
        ledger.place_amount(BetKind::Red, &red(), 10, &mut balance).unwrap();
        ledger.place_amount(BetKind::Low, &BetTarget::default_for(BetKind::Low), 15, &mut balance).unwrap();

        assert_eq!(ledger.clear(&mut balance).unwrap(), 25);
        assert_eq!(balance, 100);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_double_needs_balance() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;
        ledger.place_amount(BetKind::Red, &red(), 30, &mut balance).unwrap();

        let copies = ledger.double(&mut balance).unwrap();
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0].id, ledger.wagers()[0].id);
        assert_eq!(balance, 40);
        assert_eq!(ledger.total(), 60);

        // 60 more needed, 40 left
        assert!(matches!(
            ledger.double(&mut balance),
            Err(GameError::InsufficientFunds { needed: 60, available: 40 })
        ));
        assert_eq!(balance, 40);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_rebet_after_finish() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;

        assert_eq!(ledger.rebet(&mut balance), Err(GameError::NothingToRebet));

        ledger.place_amount(BetKind::Black, &BetTarget::default_for(BetKind::Black), 20, &mut balance).unwrap();
        ledger.lock();
        let settled = ledger.finish_round();
        assert_eq!(settled.len(), 1);
        assert!(ledger.is_empty());
        assert!(!ledger.is_locked());

        let again = ledger.rebet(&mut balance).unwrap();
        assert_eq!(again.len(), 1);
        assert_ne!(again[0].id, settled[0].id);
        assert_eq!(balance, 60);

        assert_eq!(ledger.rebet(&mut balance), Err(GameError::LedgerNotEmpty));
    }

    #[test]
    fn test_rebet_over_balance_changes_nothing() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;
        ledger.place_amount(BetKind::Red, &red(), 40, &mut balance).unwrap();
        ledger.place_amount(BetKind::Straight, &BetTarget::Number(7), 30, &mut balance).unwrap();
        ledger.lock();
        ledger.finish_round();

        // round lost; 30 left against a 70 rebet
        assert!(matches!(
            ledger.rebet(&mut balance),
            Err(GameError::InsufficientFunds { needed: 70, available: 30 })
        ));
        assert_eq!(balance, 30);
        assert!(ledger.is_empty());
        assert_eq!(ledger.previous().len(), 2);
    }

    #[test]
    fn test_locked_ledger_refuses_changes() {
        let mut ledger = BetLedger::new();
        let mut balance = 100;
        ledger.place_amount(BetKind::Red, &red(), 10, &mut balance).unwrap();
        ledger.lock();

        assert_eq!(ledger.place(BetKind::Red, &red(), &mut balance), Err(GameError::RoundClosed));
        assert!(ledger.undo_last(&mut balance).is_none());
        assert_eq!(ledger.clear(&mut balance), Err(GameError::RoundClosed));
        assert_eq!(ledger.double(&mut balance), Err(GameError::RoundClosed));
        assert_eq!(balance, 90);
        assert_eq!(ledger.total(), 10);
    }

    #[test]
    fn test_aggregate_preserves_total() {
        let mut ledger = BetLedger::new();
        let mut balance = 1_000;
        ledger.place_amount(BetKind::Red, &red(), 5, &mut balance).unwrap();
        ledger.place_amount(BetKind::Straight, &BetTarget::Number(3), 25, &mut balance).unwrap();
        ledger.place_amount(BetKind::Red, &BetTarget::Label("red".to_string()), 100, &mut balance).unwrap();
        ledger.place_amount(BetKind::Straight, &BetTarget::Number(3), 1, &mut balance).unwrap();

        let spots = ledger.aggregate();
        assert_eq!(spots.len(), 2);
        assert_eq!(spots.values().map(|s| s.amount).sum::<u64>(), ledger.total());

        let red_spot = &spots[&(BetKind::Red, red())];
        assert_eq!(red_spot.amount, 105);
        assert_eq!(red_spot.chips, 2);
        assert_eq!(ledger.amount_on(BetKind::Straight, &BetTarget::Number(3)), 26);
    }
}
