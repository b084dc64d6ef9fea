use crate::errors::GameError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest number on a European wheel
pub const MAX_NUMBER: u8 = 36;

/// Chip denominations offered at the table
pub const CHIP_VALUES: [u64; 5] = [1, 5, 25, 100, 500];

/// Every betting spot on the board
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetKind {
    Straight,
    Red,
    Black,
    Even,
    Odd,
    /// 1-18
    Low,
    /// 19-36
    High,
    #[serde(rename = "DOZEN_1")]
    Dozen1,
    #[serde(rename = "DOZEN_2")]
    Dozen2,
    #[serde(rename = "DOZEN_3")]
    Dozen3,
    #[serde(rename = "COLUMN_1")]
    Column1,
    #[serde(rename = "COLUMN_2")]
    Column2,
    #[serde(rename = "COLUMN_3")]
    Column3,
}

impl BetKind {
    pub const ALL: [BetKind; 13] = [
        BetKind::Straight,
        BetKind::Red,
        BetKind::Black,
        BetKind::Even,
        BetKind::Odd,
        BetKind::Low,
        BetKind::High,
        BetKind::Dozen1,
        BetKind::Dozen2,
        BetKind::Dozen3,
        BetKind::Column1,
        BetKind::Column2,
        BetKind::Column3,
    ];

    /// Wire name, as used in requests and responses
    pub fn as_str(&self) -> &'static str {
        match self {
            BetKind::Straight => "STRAIGHT",
            BetKind::Red => "RED",
            BetKind::Black => "BLACK",
            BetKind::Even => "EVEN",
            BetKind::Odd => "ODD",
            BetKind::Low => "LOW",
            BetKind::High => "HIGH",
            BetKind::Dozen1 => "DOZEN_1",
            BetKind::Dozen2 => "DOZEN_2",
            BetKind::Dozen3 => "DOZEN_3",
            BetKind::Column1 => "COLUMN_1",
            BetKind::Column2 => "COLUMN_2",
            BetKind::Column3 => "COLUMN_3",
        }
    }

    /// Label printed on the board spot. `None` for straight bets, which are
    /// addressed by number.
    pub fn board_label(&self) -> Option<&'static str> {
        match self {
            BetKind::Straight => None,
            BetKind::Red => Some("RED"),
            BetKind::Black => Some("BLACK"),
            BetKind::Even => Some("EVEN"),
            BetKind::Odd => Some("ODD"),
            BetKind::Low => Some("1-18"),
            BetKind::High => Some("19-36"),
            BetKind::Dozen1 => Some("1st 12"),
            BetKind::Dozen2 => Some("2nd 12"),
            BetKind::Dozen3 => Some("3rd 12"),
            BetKind::Column1 => Some("2to1_1"),
            BetKind::Column2 => Some("2to1_2"),
            BetKind::Column3 => Some("2to1_3"),
        }
    }
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BetKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GameError::InvalidWager(format!("unknown bet kind '{}'", s)))
    }
}

/// What a wager is placed on: a single number, or a named group of numbers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum BetTarget {
    Number(u8),
    Label(String),
}

impl BetTarget {
    /// Check `self` against `kind` and return the canonical form.
    ///
    /// Straight bets need a number in 0..=36. Every other kind accepts its
    /// board label or its wire name, case-insensitively, and is normalised to
    /// the board label so equal bets aggregate together.
    pub fn canonical_for(&self, kind: BetKind) -> Result<BetTarget, GameError> {
        match (kind.board_label(), self) {
            (None, BetTarget::Number(n)) if *n <= MAX_NUMBER => Ok(BetTarget::Number(*n)),
            (None, BetTarget::Number(n)) => Err(GameError::InvalidWager(format!(
                "straight target {} is outside 0-{}",
                n, MAX_NUMBER
            ))),
            (None, BetTarget::Label(label)) => Err(GameError::InvalidWager(format!(
                "straight bets need a number, got '{}'",
                label
            ))),
            (Some(expected), BetTarget::Label(label))
                if label.eq_ignore_ascii_case(expected) || label.eq_ignore_ascii_case(kind.as_str()) =>
            {
                Ok(BetTarget::Label(expected.to_string()))
            }
            (Some(expected), other) => Err(GameError::InvalidWager(format!(
                "{} bets target '{}', got {}",
                kind, expected, other
            ))),
        }
    }

    /// Default target for a kind; straight bets default to zero
    pub fn default_for(kind: BetKind) -> BetTarget {
        match kind.board_label() {
            Some(label) => BetTarget::Label(label.to_string()),
            None => BetTarget::Number(0),
        }
    }

    pub fn number(&self) -> Option<u8> {
        match self {
            BetTarget::Number(n) => Some(*n),
            BetTarget::Label(_) => None,
        }
    }
}

impl fmt::Display for BetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetTarget::Number(n) => write!(f, "{}", n),
            BetTarget::Label(label) => write!(f, "'{}'", label),
        }
    }
}

/// A single chip placement. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wager {
    pub id: String,
    pub bet_kind: BetKind,
    pub target: BetTarget,
    pub amount: u64,
    pub payout_ratio: u64,
}

impl Wager {
    /// Build a validated wager; the payout ratio always comes from the paytable.
    pub fn new(bet_kind: BetKind, target: &BetTarget, amount: u64) -> Result<Self, GameError> {
        if amount == 0 {
            return Err(GameError::InvalidWager("amount must be positive".to_string()));
        }
        let target = target.canonical_for(bet_kind)?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            bet_kind,
            target,
            amount,
            payout_ratio: super::settlement::payout_ratio(bet_kind),
        })
    }

    /// Same bet with a fresh identity (double / rebet)
    pub fn duplicate(&self) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }
}

/// Pocket colour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
    Green,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
            Color::Green => write!(f, "green"),
        }
    }
}

/// Chip denomination selected for the next placement
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ChipValue(u64);

impl ChipValue {
    pub fn new(value: u64) -> Result<Self, GameError> {
        if CHIP_VALUES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(GameError::InvalidWager(format!(
                "chip value {} is not one of {:?}",
                value, CHIP_VALUES
            )))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ChipValue {
    fn default() -> Self {
        Self(CHIP_VALUES[0])
    }
}

/// One settled round, kept for display and audit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundRecord {
    pub winning_number: u8,
    pub total_wagered: u64,
    pub total_payout: u64,
    pub timestamp: DateTime<Utc>,
}

/// VRF bundle containing cryptographic proof
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VRFBundle {
    /// Hex-encoded VRF output (32 bytes)
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64 bytes for schnorrkel)
    pub vrf_proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for VRF
    pub input_message: String,
}

/// A wager as a client submits it. Any `payout_ratio` the client sends is
/// dropped during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerRequest {
    pub bet_kind: BetKind,
    pub target: BetTarget,
    pub amount: u64,
}

/// Request to spin the wheel for an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinRequest {
    pub wagers: Vec<WagerRequest>,
    #[serde(default)]
    pub use_bonus_spin: bool,
}

/// Authoritative outcome of a spin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinResult {
    pub round_id: String,
    /// VRF nonce; pass back to /api/verify/spin with the round id
    pub nonce: u64,
    pub new_balance: u64,
    pub winning_number: u8,
    pub winning_color: Color,
    /// Index of the winning pocket in the wheel order (for animation)
    pub wheel_position: usize,
    pub total_wagered: u64,
    pub total_payout: u64,
    pub used_bonus_spin: bool,
    pub bonus_spins: u32,
    pub vip_level: u8,
    pub history: Vec<RoundRecord>,
    pub vrf: VRFBundle,
}
