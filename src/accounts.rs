//! Player accounts: balance, bonus spins, lifetime stats and round history
//!
//! Records are plain values. The spin processor mutates a copy under the
//! per-account lock and hands it back to an [`AccountStore`] in one `save`.

use crate::errors::{GameError, RoyaleError, RoyaleResult, StorageError};
use crate::games::settlement::Settlement;
use crate::games::types::RoundRecord;
use crate::storage::OptimizedStorage;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ACCOUNT_PREFIX: &str = "account:";

/// Leaderboard size
pub const LEADERBOARD_LIMIT: usize = 20;

/// VIP tier from lifetime stake
pub fn vip_level_for(total_wagered: u64) -> u8 {
    match total_wagered {
        w if w >= 100_000 => 5,
        w if w >= 50_000 => 4,
        w if w >= 20_000 => 3,
        w if w >= 5_000 => 2,
        _ => 1,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub player_id: String,
    pub username: String,
    pub balance: u64,
    pub bonus_spins: u32,
    pub total_won: u64,
    pub total_wagered: u64,
    pub games_played: u64,
    /// Largest single-round net gain
    pub biggest_win: u64,
    pub vip_level: u8,
    pub last_daily_bonus: Option<DateTime<Utc>>,
    pub history: Vec<RoundRecord>,
    pub created_at: DateTime<Utc>,
}

/// Credits and spins granted by one daily bonus claim
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DailyBonus {
    pub bonus_amount: u64,
    pub bonus_spins: u32,
    pub new_balance: u64,
    pub new_bonus_spins: u32,
}

impl AccountRecord {
    pub fn new(
        player_id: impl Into<String>,
        username: impl Into<String>,
        balance: u64,
        bonus_spins: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            username: username.into(),
            balance,
            bonus_spins,
            total_won: 0,
            total_wagered: 0,
            games_played: 0,
            biggest_win: 0,
            vip_level: 1,
            last_daily_bonus: None,
            history: Vec::new(),
            created_at: now,
        }
    }

    /// Apply a settled round.
    ///
    /// Paid rounds debit the stake and credit the payout in one step; a bonus
    /// spin only credits. The caller has already checked funds.
    pub fn apply_spin(&mut self, settlement: &Settlement, bonus_spin: bool, history_limit: usize, now: DateTime<Utc>) {
        let stake = if bonus_spin { 0 } else { settlement.total_wagered };

        self.balance = self.balance.saturating_sub(stake).saturating_add(settlement.total_payout);
        if bonus_spin {
            self.bonus_spins = self.bonus_spins.saturating_sub(1);
        }

        self.total_wagered = self.total_wagered.saturating_add(stake);
        self.total_won = self.total_won.saturating_add(settlement.total_payout);
        self.games_played += 1;
        self.biggest_win = self.biggest_win.max(settlement.total_payout.saturating_sub(stake));
        self.vip_level = self.vip_level.max(vip_level_for(self.total_wagered));

        self.history.push(RoundRecord {
            winning_number: settlement.winning_number,
            total_wagered: settlement.total_wagered,
            total_payout: settlement.total_payout,
            timestamp: now,
        });
        if self.history.len() > history_limit {
            let excess = self.history.len() - history_limit;
            self.history.drain(..excess);
        }
    }

    /// Grant `base * vip_level` credits and `vip_level` bonus spins, once per cooldown
    pub fn claim_daily_bonus(&mut self, base: u64, cooldown: Duration, now: DateTime<Utc>) -> Result<DailyBonus, GameError> {
        if let Some(last) = self.last_daily_bonus {
            let elapsed = now - last;
            if elapsed < cooldown {
                let remaining_secs = (cooldown - elapsed).num_seconds().max(0) as u64;
                return Err(GameError::DailyBonusCooldown {
                    hours_remaining: remaining_secs.div_ceil(3600),
                });
            }
        }

        let bonus_amount = base.saturating_mul(self.vip_level as u64);
        let bonus_spins = self.vip_level as u32;
        self.balance = self.balance.saturating_add(bonus_amount);
        self.bonus_spins = self.bonus_spins.saturating_add(bonus_spins);
        self.last_daily_bonus = Some(now);

        Ok(DailyBonus {
            bonus_amount,
            bonus_spins,
            new_balance: self.balance,
            new_bonus_spins: self.bonus_spins,
        })
    }

    /// Most recent `n` rounds, oldest first
    pub fn recent_history(&self, n: usize) -> &[RoundRecord] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    #[default]
    Balance,
    Wins,
    Games,
    #[serde(rename = "bigwin")]
    BigWin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: String,
    pub username: String,
    pub balance: u64,
    pub total_won: u64,
    pub games_played: u64,
    pub biggest_win: u64,
    pub vip_level: u8,
}

/// Rank accounts by `kind`, highest first; ties broken by player id
pub fn leaderboard(mut records: Vec<AccountRecord>, kind: LeaderboardKind, limit: usize) -> Vec<LeaderboardEntry> {
    let key = |r: &AccountRecord| match kind {
        LeaderboardKind::Balance => r.balance,
        LeaderboardKind::Wins => r.total_won,
        LeaderboardKind::Games => r.games_played,
        LeaderboardKind::BigWin => r.biggest_win,
    };
    records.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.player_id.cmp(&b.player_id)));

    records
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, r)| LeaderboardEntry {
            rank: i + 1,
            player_id: r.player_id,
            username: r.username,
            balance: r.balance,
            total_won: r.total_won,
            games_played: r.games_played,
            biggest_win: r.biggest_win,
            vip_level: r.vip_level,
        })
        .collect()
}

/// Account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new record; fails with `AccountExists` if the id is taken
    async fn create(&self, record: &AccountRecord) -> RoyaleResult<()>;

    async fn get(&self, player_id: &str) -> RoyaleResult<Option<AccountRecord>>;

    /// Overwrite an existing record
    async fn save(&self, record: &AccountRecord) -> RoyaleResult<()>;

    async fn list(&self) -> RoyaleResult<Vec<AccountRecord>>;

    async fn count(&self) -> RoyaleResult<usize> {
        Ok(self.list().await?.len())
    }
}

/// In-memory store for development and tests
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<String, AccountRecord>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, record: &AccountRecord) -> RoyaleResult<()> {
        use dashmap::mapref::entry::Entry;
        match self.accounts.entry(record.player_id.clone()) {
            Entry::Occupied(_) => Err(GameError::AccountExists(record.player_id.clone()).into()),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, player_id: &str) -> RoyaleResult<Option<AccountRecord>> {
        Ok(self.accounts.get(player_id).map(|r| r.value().clone()))
    }

    async fn save(&self, record: &AccountRecord) -> RoyaleResult<()> {
        self.accounts.insert(record.player_id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> RoyaleResult<Vec<AccountRecord>> {
        Ok(self.accounts.iter().map(|r| r.value().clone()).collect())
    }

    async fn count(&self) -> RoyaleResult<usize> {
        Ok(self.accounts.len())
    }
}

/// RocksDB store; records are JSON under `account:<player_id>`
#[derive(Clone)]
pub struct RocksAccountStore {
    storage: Arc<OptimizedStorage>,
}

impl RocksAccountStore {
    pub fn new(storage: Arc<OptimizedStorage>) -> Self {
        Self { storage }
    }

    fn key(player_id: &str) -> Vec<u8> {
        format!("{}{}", ACCOUNT_PREFIX, player_id).into_bytes()
    }

    fn read(&self, player_id: &str) -> RoyaleResult<Option<Vec<u8>>> {
        self.storage
            .get(&Self::key(player_id))
            .map_err(|e| RoyaleError::Storage(StorageError::ReadFailed(e.to_string())))
    }

    fn write(&self, record: &AccountRecord) -> RoyaleResult<()> {
        let value = serde_json::to_vec(record)?;
        self.storage
            .put(&Self::key(&record.player_id), &value)
            .map_err(|e| RoyaleError::Storage(StorageError::WriteFailed(e.to_string())))
    }
}

#[async_trait]
impl AccountStore for RocksAccountStore {
    async fn create(&self, record: &AccountRecord) -> RoyaleResult<()> {
        if self.read(&record.player_id)?.is_some() {
            return Err(GameError::AccountExists(record.player_id.clone()).into());
        }
        self.write(record)
    }

    async fn get(&self, player_id: &str) -> RoyaleResult<Option<AccountRecord>> {
        match self.read(player_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &AccountRecord) -> RoyaleResult<()> {
        self.write(record)
    }

    async fn list(&self) -> RoyaleResult<Vec<AccountRecord>> {
        self.storage
            .scan_prefix(ACCOUNT_PREFIX.as_bytes())
            .map_err(|e| RoyaleError::Storage(StorageError::ReadFailed(e.to_string())))?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(RoyaleError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::settlement::settle_detailed;
    use crate::games::types::{BetKind, BetTarget, Wager};
    use tempfile::TempDir;

    fn account(balance: u64) -> AccountRecord {
        AccountRecord::new("p1", "alice", balance, 3, Utc::now())
    }

    fn red(amount: u64) -> Wager {
        Wager::new(BetKind::Red, &BetTarget::default_for(BetKind::Red), amount).unwrap()
    }

    #[test]
    fn test_vip_tiers() {
        assert_eq!(vip_level_for(0), 1);
        assert_eq!(vip_level_for(4_999), 1);
        assert_eq!(vip_level_for(5_000), 2);
        assert_eq!(vip_level_for(20_000), 3);
        assert_eq!(vip_level_for(50_000), 4);
        assert_eq!(vip_level_for(1_000_000), 5);
    }

    #[test]
    fn test_paid_spin_debits_and_credits() {
        let mut acc = account(100);
        let settlement = settle_detailed(19, &[red(50)]);
        acc.apply_spin(&settlement, false, 50, Utc::now());

        assert_eq!(acc.balance, 150);
        assert_eq!(acc.total_wagered, 50);
        assert_eq!(acc.total_won, 100);
        assert_eq!(acc.biggest_win, 50);
        assert_eq!(acc.games_played, 1);
        assert_eq!(acc.history.len(), 1);
    }

    #[test]
    fn test_bonus_spin_skips_debit() {
        let mut acc = account(100);
        let settlement = settle_detailed(2, &[red(50)]);
        acc.apply_spin(&settlement, true, 50, Utc::now());

        assert_eq!(acc.balance, 100);
        assert_eq!(acc.bonus_spins, 2);
        assert_eq!(acc.total_wagered, 0);
        assert_eq!(acc.history[0].total_wagered, 50);
    }

    #[test]
    fn test_vip_never_decreases() {
        let mut acc = account(1_000_000);
        acc.vip_level = 4;
        acc.apply_spin(&settle_detailed(2, &[red(10)]), false, 50, Utc::now());
        assert_eq!(acc.vip_level, 4);

        acc.apply_spin(&settle_detailed(2, &[red(60_000)]), false, 50, Utc::now());
        assert_eq!(acc.vip_level, 4);
        acc.apply_spin(&settle_detailed(2, &[red(40_000)]), false, 50, Utc::now());
        assert_eq!(acc.total_wagered, 100_010);
        assert_eq!(acc.vip_level, 5);
    }

    #[test]
    fn test_history_trimmed_to_limit() {
        let mut acc = account(1_000);
        for n in 1..=5u8 {
            acc.apply_spin(&settle_detailed(n, &[red(1)]), false, 3, Utc::now());
        }
        let numbers: Vec<u8> = acc.history.iter().map(|r| r.winning_number).collect();
        assert_eq!(numbers, vec![3, 4, 5]);
        assert_eq!(acc.recent_history(2).len(), 2);
        assert_eq!(acc.recent_history(10).len(), 3);
    }

    #[test]
    fn test_daily_bonus_cooldown() {
        let mut acc = account(0);
        acc.vip_level = 3;
        let start = Utc::now();
        let cooldown = Duration::hours(24);

        let bonus = acc.claim_daily_bonus(500, cooldown, start).unwrap();
        assert_eq!(bonus.bonus_amount, 1_500);
        assert_eq!(bonus.bonus_spins, 3);
        assert_eq!(acc.balance, 1_500);
        assert_eq!(acc.bonus_spins, 6);

        let err = acc
            .claim_daily_bonus(500, cooldown, start + Duration::hours(5))
            .unwrap_err();
        assert_eq!(err, GameError::DailyBonusCooldown { hours_remaining: 19 });
        assert_eq!(acc.balance, 1_500);

        assert!(acc.claim_daily_bonus(500, cooldown, start + Duration::hours(24)).is_ok());
    }

    #[test]
    fn test_leaderboard_ordering() {
        let mut a = AccountRecord::new("a", "ann", 300, 0, Utc::now());
        let mut b = AccountRecord::new("b", "bob", 900, 0, Utc::now());
        let c = AccountRecord::new("c", "cat", 300, 0, Utc::now());
        a.games_played = 10;
        b.biggest_win = 40;

        let by_balance = leaderboard(vec![c.clone(), a.clone(), b.clone()], LeaderboardKind::Balance, 20);
        let ids: Vec<&str> = by_balance.iter().map(|e| e.player_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(by_balance[0].rank, 1);

        let by_games = leaderboard(vec![a, b, c], LeaderboardKind::Games, 1);
        assert_eq!(by_games.len(), 1);
        assert_eq!(by_games[0].username, "ann");
    }

    #[test]
    fn test_leaderboard_kind_wire_names() {
        let kind: LeaderboardKind = serde_json::from_str("\"bigwin\"").unwrap();
        assert_eq!(kind, LeaderboardKind::BigWin);
        assert_eq!(serde_json::to_string(&LeaderboardKind::Wins).unwrap(), "\"wins\"");
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicates() {
        let store = InMemoryAccountStore::new();
        store.create(&account(10)).await.unwrap();

        let err = store.create(&account(20)).await.unwrap_err();
        assert!(matches!(err, RoyaleError::Game(GameError::AccountExists(_))));
        assert_eq!(store.get("p1").await.unwrap().unwrap().balance, 10);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rocks_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(OptimizedStorage::new(dir.path()).unwrap());
        let store = RocksAccountStore::new(storage.clone());

        let mut acc = account(500);
        store.create(&acc).await.unwrap();
        acc.balance = 450;
        store.save(&acc).await.unwrap();
        store
            .create(&AccountRecord::new("p2", "bob", 1, 0, Utc::now()))
            .await
            .unwrap();

        assert_eq!(store.get("p1").await.unwrap(), Some(acc));
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert_eq!(store.list().await.unwrap().len(), 2);
        assert_eq!(store.count().await.unwrap(), 2);

        // Non-account keys are ignored by list
        storage.put(b"vrf:mini_secret_seed", &[0u8; 32]).unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rocks_create_never_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(OptimizedStorage::new(dir.path()).unwrap());
        let store = RocksAccountStore::new(storage.clone());

        let mut acc = account(500);
        store.create(&acc).await.unwrap();
        acc.balance = 12_345;
        store.save(&acc).await.unwrap();

        let err = store.create(&account(5_000)).await.unwrap_err();
        assert!(matches!(err, RoyaleError::Game(GameError::AccountExists(_))));
        assert!(storage.get(b"account:p1").unwrap().is_some());
        assert_eq!(store.get("p1").await.unwrap().unwrap().balance, 12_345);
    }
}
