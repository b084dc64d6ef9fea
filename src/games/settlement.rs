//! Settlement engine
//!
//! The one place where bets are judged and paid. The round controller, the
//! authoritative spin processor, the simulator and the verification endpoint
//! all call into this module, so every context computes identical payouts.
//!
//! Everything here is pure: no I/O, no clock, no randomness.

use super::types::{BetKind, BetTarget, Color, Wager, MAX_NUMBER};
use super::wheel::color_of;
use serde::{Deserialize, Serialize};

/// "To one" multiplier paid on a winning bet of `kind`
pub const fn payout_ratio(kind: BetKind) -> u64 {
    match kind {
        BetKind::Straight => 35,
        BetKind::Red | BetKind::Black | BetKind::Even | BetKind::Odd | BetKind::Low | BetKind::High => 1,
        BetKind::Dozen1
        | BetKind::Dozen2
        | BetKind::Dozen3
        | BetKind::Column1
        | BetKind::Column2
        | BetKind::Column3 => 2,
    }
}

/// Paytable entry, as served to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaytableEntry {
    pub bet_kind: BetKind,
    pub payout_ratio: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_label: Option<String>,
}

/// Full paytable in declaration order
pub fn paytable() -> Vec<PaytableEntry> {
    BetKind::ALL
        .into_iter()
        .map(|bet_kind| PaytableEntry {
            bet_kind,
            payout_ratio: payout_ratio(bet_kind),
            board_label: bet_kind.board_label().map(str::to_string),
        })
        .collect()
}

/// Whether a bet of `kind` on `target` wins when `n` comes up.
///
/// Zero is green and belongs to no colour, parity, range, dozen or column.
pub fn wins(kind: BetKind, target: &BetTarget, n: u8) -> bool {
    match kind {
        BetKind::Straight => target.number() == Some(n),
        BetKind::Red => color_of(n) == Color::Red,
        BetKind::Black => color_of(n) == Color::Black,
        BetKind::Even => n != 0 && n % 2 == 0,
        BetKind::Odd => n != 0 && n % 2 == 1,
        BetKind::Low => (1..=18).contains(&n),
        BetKind::High => (19..=36).contains(&n),
        BetKind::Dozen1 => (1..=12).contains(&n),
        BetKind::Dozen2 => (13..=24).contains(&n),
        BetKind::Dozen3 => (25..=36).contains(&n),
        BetKind::Column1 => n != 0 && n % 3 == 1,
        BetKind::Column2 => n != 0 && n % 3 == 2,
        BetKind::Column3 => n != 0 && n % 3 == 0,
    }
}

/// Stake returned plus winnings for one wager, zero when it loses
pub fn wager_payout(wager: &Wager, winning_number: u8) -> u64 {
    if wins(wager.bet_kind, &wager.target, winning_number) {
        wager.amount.saturating_add(wager.amount.saturating_mul(wager.payout_ratio))
    } else {
        0
    }
}

/// Total paid out for `wagers` when `winning_number` comes up
pub fn settle(winning_number: u8, wagers: &[Wager]) -> u64 {
    wagers
        .iter()
        .map(|wager| wager_payout(wager, winning_number))
        .fold(0u64, u64::saturating_add)
}

/// Numbers a bet covers, for board highlighting
pub fn covered_numbers(kind: BetKind, target: &BetTarget) -> Vec<u8> {
    (0..=MAX_NUMBER).filter(|&n| wins(kind, target, n)).collect()
}

/// Per-wager result line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettlementLine {
    pub wager_id: String,
    pub bet_kind: BetKind,
    pub target: BetTarget,
    pub amount: u64,
    pub won: bool,
    pub payout: u64,
}

/// Settlement of a whole round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settlement {
    pub winning_number: u8,
    pub winning_color: Color,
    pub total_wagered: u64,
    pub total_payout: u64,
    pub lines: Vec<SettlementLine>,
}

impl Settlement {
    /// Payout minus stake; negative when the round lost money
    pub fn net(&self) -> i64 {
        self.total_payout as i64 - self.total_wagered as i64
    }
}

/// Settle with a per-wager breakdown. `total_payout` always equals [`settle`].
pub fn settle_detailed(winning_number: u8, wagers: &[Wager]) -> Settlement {
    let lines: Vec<SettlementLine> = wagers
        .iter()
        .map(|wager| {
            let payout = wager_payout(wager, winning_number);
            SettlementLine {
                wager_id: wager.id.clone(),
                bet_kind: wager.bet_kind,
                target: wager.target.clone(),
                amount: wager.amount,
                won: payout > 0,
                payout,
            }
        })
        .collect();

    Settlement {
        winning_number,
        winning_color: color_of(winning_number),
        total_wagered: wagers.iter().map(|w| w.amount).sum(),
        total_payout: lines.iter().map(|line| line.payout).fold(0u64, u64::saturating_add),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wager(kind: BetKind, target: BetTarget, amount: u64) -> Wager {
        Wager::new(kind, &target, amount).unwrap()
    }

    fn label(kind: BetKind, amount: u64) -> Wager {
        wager(kind, BetTarget::default_for(kind), amount)
    }

    #[test]
    fn test_straight_seventeen() {
        let bets = vec![wager(BetKind::Straight, BetTarget::Number(17), 25)];
        assert_eq!(settle(17, &bets), 900);
        assert_eq!(settle(18, &bets), 0);
    }

    #[test]
    fn test_red_on_seventeen_and_zero() {
        // 17 is black on a European wheel; 19 is red
        let bets = vec![label(BetKind::Red, 50)];
        assert_eq!(settle(19, &bets), 100);
        assert_eq!(settle(17, &bets), 0);
        assert_eq!(settle(0, &bets), 0);
    }

    #[test]
    fn test_dozen_and_column_on_five() {
        let bets = vec![label(BetKind::Dozen1, 10), label(BetKind::Column2, 10)];
        assert_eq!(settle(5, &bets), 60);
    }

    #[test]
    fn test_zero_only_pays_straight_zero() {
        let mut bets: Vec<Wager> = BetKind::ALL
            .into_iter()
            .filter(|k| *k != BetKind::Straight)
            .map(|k| label(k, 10))
            .collect();
        assert_eq!(settle(0, &bets), 0);

        bets.push(wager(BetKind::Straight, BetTarget::Number(0), 10));
        assert_eq!(settle(0, &bets), 360);
    }

    #[test]
    fn test_single_wager_formula_for_every_kind_and_number() {
        for kind in BetKind::ALL {
            for n in 0..=MAX_NUMBER {
                let target = match kind {
                    BetKind::Straight => BetTarget::Number(n / 2),
                    _ => BetTarget::default_for(kind),
                };
                let w = wager(kind, target.clone(), 7);
                let expected = if wins(kind, &target, n) { 7 * (1 + payout_ratio(kind)) } else { 0 };
                assert_eq!(settle(n, &[w]), expected, "{} on {}", kind, n);
            }
        }
    }

    #[test]
    fn test_settlement_is_linear() {
        let a = vec![label(BetKind::Black, 20), wager(BetKind::Straight, BetTarget::Number(4), 5)];
        let b = vec![label(BetKind::Even, 15), label(BetKind::Dozen1, 30), label(BetKind::Column1, 1)];
        let mut both = a.clone();
        both.extend(b.iter().cloned());

        for n in 0..=MAX_NUMBER {
            assert_eq!(settle(n, &both), settle(n, &a) + settle(n, &b));
        }
    }

    #[test]
    fn test_coverage_sizes() {
        let size = |kind: BetKind| covered_numbers(kind, &BetTarget::default_for(kind)).len();
        assert_eq!(covered_numbers(BetKind::Straight, &BetTarget::Number(9)), vec![9]);
        for kind in [BetKind::Red, BetKind::Black, BetKind::Even, BetKind::Odd, BetKind::Low, BetKind::High] {
            assert_eq!(size(kind), 18, "{}", kind);
        }
        for kind in [
            BetKind::Dozen1,
            BetKind::Dozen2,
            BetKind::Dozen3,
            BetKind::Column1,
            BetKind::Column2,
            BetKind::Column3,
        ] {
            assert_eq!(size(kind), 12, "{}", kind);
        }
        assert_eq!(
            covered_numbers(BetKind::Column3, &BetTarget::default_for(BetKind::Column3))[..4],
            [3, 6, 9, 12]
        );
    }

    #[test]
    fn test_fair_odds_relationship() {
        // Every non-straight bet pays (36 / covered) - 1 to one, the European standard
        for kind in BetKind::ALL {
            let target = match kind {
                BetKind::Straight => BetTarget::Number(1),
                _ => BetTarget::default_for(kind),
            };
            let covered = covered_numbers(kind, &target).len() as u64;
            assert_eq!(payout_ratio(kind), 36 / covered - 1, "{}", kind);
        }
    }

    #[test]
    fn test_detailed_matches_total() {
        let bets = vec![
            label(BetKind::Red, 10),
            label(BetKind::Odd, 10),
            wager(BetKind::Straight, BetTarget::Number(21), 2),
        ];
        let detailed = settle_detailed(21, &bets);
        assert_eq!(detailed.total_payout, settle(21, &bets));
        assert_eq!(detailed.total_wagered, 22);
        assert_eq!(detailed.winning_color, Color::Red);
        assert!(detailed.lines.iter().all(|line| line.won));
        assert_eq!(detailed.net(), 112 - 22);
    }

    #[test]
    fn test_paytable_is_complete() {
        let table = paytable();
        assert_eq!(table.len(), 13);
        assert_eq!(table[0].payout_ratio, 35);
        assert!(table[0].board_label.is_none());
        assert!(table.iter().skip(1).all(|e| e.board_label.is_some()));
    }
}
