//! Authoritative spin processing
//!
//! One spin is a single unit per account: check funds, draw, settle, credit
//! and persist all happen under that account's lock, on a copy of the record
//! that is saved exactly once. Any failure before the save leaves the stored
//! record untouched.

use crate::accounts::{leaderboard, AccountRecord, AccountStore, DailyBonus, LeaderboardEntry, LeaderboardKind, LEADERBOARD_LIMIT};
use crate::config::GameConfig;
use crate::errors::{ConfigurationError, GameError, RngError, RoyaleError, RoyaleResult};
use crate::games::rng::{Draw, DrawContext, NumberSource};
use crate::games::settlement::settle_detailed;
use crate::games::types::{SpinRequest, SpinResult, VRFBundle, Wager};
use crate::games::vrf_engine::VRFGameEngine;
use crate::games::wheel::{is_valid_number, wheel_position};
use crate::metrics::MetricsRegistry;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

const MAX_USERNAME_LEN: usize = 32;
const MAX_PLAYER_ID_LEN: usize = 64;

/// Processes spins and account mutations against the account store
pub struct GameProcessor {
    store: Arc<dyn AccountStore>,
    source: Arc<dyn NumberSource>,
    config: GameConfig,
    metrics: Arc<MetricsRegistry>,
    account_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl GameProcessor {
    /// Refuses untrusted sources: every outcome here moves stored balances.
    pub fn new(
        store: Arc<dyn AccountStore>,
        source: Arc<dyn NumberSource>,
        config: GameConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> RoyaleResult<Self> {
        if !source.is_trusted() {
            return Err(ConfigurationError::InvalidValue {
                field: "number_source".to_string(),
                value: source.name().to_string(),
                reason: "authoritative spins need a trusted source".to_string(),
            }
            .into());
        }

        Ok(Self {
            store,
            source,
            config,
            metrics,
            account_locks: DashMap::new(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    fn account_lock(&self, player_id: &str) -> Arc<Mutex<()>> {
        self.account_locks
            .entry(player_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a lock nobody else holds, for ids that did not become accounts
    fn discard_lock(&self, player_id: &str) {
        self.account_locks
            .remove_if(player_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.account_locks.len()
    }

    /// Open an account with the welcome balance and bonus spins
    pub async fn create_account(&self, player_id: Option<String>, username: &str) -> RoyaleResult<AccountRecord> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(GameError::InvalidAccount(format!(
                "username must be 1-{} characters",
                MAX_USERNAME_LEN
            ))
            .into());
        }

        let player_id = player_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if player_id.is_empty()
            || player_id.len() > MAX_PLAYER_ID_LEN
            || !player_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(GameError::InvalidAccount(format!("invalid player id '{}'", player_id)).into());
        }

        let record = AccountRecord::new(
            player_id,
            username,
            self.config.welcome_balance,
            self.config.welcome_bonus_spins,
            Utc::now(),
        );

        let lock = self.account_lock(&record.player_id);
        let created = {
            let _guard = lock.lock().await;
            self.store.create(&record).await
        };
        drop(lock);
        if let Err(e) = created {
            if !matches!(e, RoyaleError::Game(GameError::AccountExists(_))) {
                self.discard_lock(&record.player_id);
            }
            return Err(e);
        }
        self.metrics.record_account_created();

        tracing::info!(player_id = %record.player_id, username = %record.username, "account created");
        Ok(record)
    }

    pub async fn get_account(&self, player_id: &str) -> RoyaleResult<AccountRecord> {
        self.store
            .get(player_id)
            .await?
            .ok_or_else(|| GameError::AccountNotFound(player_id.to_string()).into())
    }

    /// Validate wagers, recomputing every payout ratio from the paytable
    fn build_wagers(&self, request: &SpinRequest) -> Result<(Vec<Wager>, u64), GameError> {
        if request.wagers.is_empty() {
            return Err(GameError::EmptyRound);
        }
        if request.wagers.len() > self.config.max_wagers_per_spin {
            return Err(GameError::InvalidWager(format!(
                "at most {} wagers per spin",
                self.config.max_wagers_per_spin
            )));
        }

        let wagers = request
            .wagers
            .iter()
            .map(|w| Wager::new(w.bet_kind, &w.target, w.amount))
            .collect::<Result<Vec<_>, _>>()?;

        let total = wagers
            .iter()
            .try_fold(0u64, |acc, w| acc.checked_add(w.amount))
            .ok_or_else(|| GameError::InvalidWager("total stake overflows".to_string()))?;

        Ok((wagers, total))
    }

    /// Draw on a blocking thread, bounded by the configured timeout
    async fn draw(&self, context: DrawContext) -> Result<Draw, RngError> {
        let source = Arc::clone(&self.source);
        let task = tokio::task::spawn_blocking(move || source.draw(&context));

        let draw = match tokio::time::timeout(Duration::from_millis(self.config.rng_timeout_ms), task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => return Err(RngError::Unavailable(format!("draw task failed: {}", join_error))),
            Err(_) => {
                return Err(RngError::Timeout {
                    timeout_ms: self.config.rng_timeout_ms,
                })
            }
        };

        if !is_valid_number(draw.number) {
            return Err(RngError::Unavailable(format!("source produced {}", draw.number)));
        }
        Ok(draw)
    }

    /// Run one authoritative spin for `player_id`
    pub async fn process_spin(&self, player_id: &str, request: &SpinRequest) -> RoyaleResult<SpinResult> {
        let started = Instant::now();
        let result = self.spin_locked(player_id, request, started).await;
        if let Err(e) = &result {
            self.metrics.record_spin_failure();
            tracing::warn!(player_id, error = %e, "spin rejected");
        }
        result
    }

    async fn spin_locked(&self, player_id: &str, request: &SpinRequest, started: Instant) -> RoyaleResult<SpinResult> {
        let (wagers, total) = self.build_wagers(request)?;

        // Locks exist only for real accounts; accounts are never deleted
        self.get_account(player_id).await?;
        let lock = self.account_lock(player_id);
        let _guard = lock.lock().await;

        let mut account = self.get_account(player_id).await?;

        // With no bonus spins left the request is played as a paid spin
        let bonus_spin = request.use_bonus_spin && account.bonus_spins > 0;
        if bonus_spin {
            if total > self.config.bonus_spin_max_stake {
                return Err(GameError::BonusStakeTooLarge {
                    stake: total,
                    limit: self.config.bonus_spin_max_stake,
                }
                .into());
            }
        } else if account.balance < total {
            return Err(GameError::InsufficientFunds {
                needed: total,
                available: account.balance,
            }
            .into());
        }

        let round_id = Uuid::new_v4().to_string();
        let nonce = account.games_played;
        let context = DrawContext::new(round_id.clone(), player_id, nonce);
        let input_message = VRFGameEngine::input_message(&context.round_id, &context.player_id, context.nonce);
        let draw = self.draw(context).await?;

        let settlement = settle_detailed(draw.number, &wagers);
        account.apply_spin(&settlement, bonus_spin, self.config.history_limit, Utc::now());
        self.store.save(&account).await?;

        self.metrics.record_spin(
            if bonus_spin { 0 } else { settlement.total_wagered },
            settlement.total_payout,
            bonus_spin,
            started.elapsed(),
        );

        tracing::info!(
            player_id,
            round_id = %round_id,
            winning_number = settlement.winning_number,
            total_wagered = settlement.total_wagered,
            total_payout = settlement.total_payout,
            bonus_spin,
            new_balance = account.balance,
            "spin settled"
        );

        let vrf = draw.proof.unwrap_or(VRFBundle {
            vrf_output: String::new(),
            vrf_proof: String::new(),
            public_key: String::new(),
            input_message,
        });

        Ok(SpinResult {
            round_id,
            nonce,
            new_balance: account.balance,
            winning_number: settlement.winning_number,
            winning_color: settlement.winning_color,
            wheel_position: wheel_position(settlement.winning_number).unwrap_or_default(),
            total_wagered: settlement.total_wagered,
            total_payout: settlement.total_payout,
            used_bonus_spin: bonus_spin,
            bonus_spins: account.bonus_spins,
            vip_level: account.vip_level,
            history: account.recent_history(self.config.response_history_len).to_vec(),
            vrf,
        })
    }

    pub async fn claim_daily_bonus(&self, player_id: &str) -> RoyaleResult<DailyBonus> {
        self.get_account(player_id).await?;
        let lock = self.account_lock(player_id);
        let _guard = lock.lock().await;

        let mut account = self.get_account(player_id).await?;
        let cooldown = chrono::Duration::seconds(self.config.daily_bonus_cooldown_secs as i64);
        let bonus = account.claim_daily_bonus(self.config.daily_bonus_base, cooldown, Utc::now())?;
        self.store.save(&account).await?;
        self.metrics.record_daily_bonus();

        tracing::info!(player_id, bonus_amount = bonus.bonus_amount, bonus_spins = bonus.bonus_spins, "daily bonus claimed");
        Ok(bonus)
    }

    pub async fn leaderboard(&self, kind: LeaderboardKind) -> RoyaleResult<Vec<LeaderboardEntry>> {
        let records = self.store.list().await?;
        self.metrics.set_active_accounts(records.len() as u64);
        Ok(leaderboard(records, kind, LEADERBOARD_LIMIT))
    }
}
