//! Accounts and the VRF key survive a restart of the RocksDB backend

use roulette_royale::{
    api::build_state,
    config::{RoyaleConfig, StorageBackend},
    games::{BetKind, BetTarget, SpinRequest, VRFGameEngine, WagerRequest},
};
use tempfile::TempDir;

fn rocks_config(dir: &TempDir) -> RoyaleConfig {
    let mut config = RoyaleConfig::testing();
    config.storage.backend = StorageBackend::Rocksdb;
    config.storage.data_directory = dir.path().join("royale_db").to_string_lossy().to_string();
    config.storage.clear_on_start = false;
    config.game.vrf_seed_hex = None;
    config.game.rng_timeout_ms = 2_000;
    config
}

#[tokio::test]
async fn test_accounts_persist_across_restarts() {
    let dir = TempDir::new().unwrap();
    let config = rocks_config(&dir);

    // Phase 1: open, play a round, shut down
    let (public_key, balance_after_spin, spin) = {
        let state = build_state(&config).await.expect("first start");
        let processor = state.processor.clone();

        processor.create_account(Some("alice".to_string()), "Alice").await.unwrap();
        let request = SpinRequest {
            wagers: vec![WagerRequest {
                bet_kind: BetKind::Column2,
                target: BetTarget::Label("2to1_2".to_string()),
                amount: 40,
            }],
            use_bonus_spin: false,
        };
        let spin = processor.process_spin("alice", &request).await.unwrap();

        let public_key = state.vrf_public_key.clone().expect("vrf key");
        (public_key, spin.new_balance, spin)
    };

    // Phase 2: reopen the same directory
    let state = build_state(&config).await.expect("restart");
    assert_eq!(state.vrf_public_key.as_deref(), Some(public_key.as_str()));

    let account = state.processor.get_account("alice").await.unwrap();
    assert_eq!(account.username, "Alice");
    assert_eq!(account.balance, balance_after_spin);
    assert_eq!(account.games_played, 1);
    assert_eq!(account.history.len(), 1);
    assert_eq!(account.history[0].winning_number, spin.winning_number);
    assert_eq!(state.metrics.snapshot().active_accounts, 1);

    // Proofs issued before the restart still verify
    let input = VRFGameEngine::input_message(&spin.round_id, "alice", 0);
    assert_eq!(
        VRFGameEngine::verify_roulette_spin(&spin.vrf, &input).unwrap(),
        Some(spin.winning_number)
    );
}

#[tokio::test]
async fn test_existing_account_survives_duplicate_create() {
    let dir = TempDir::new().unwrap();
    let config = rocks_config(&dir);

    {
        let state = build_state(&config).await.unwrap();
        state.processor.create_account(Some("bob".to_string()), "Bob").await.unwrap();
    }

    let state = build_state(&config).await.unwrap();
    let err = state
        .processor
        .create_account(Some("bob".to_string()), "Impostor")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("bob"));
    assert_eq!(state.processor.get_account("bob").await.unwrap().username, "Bob");
}

#[tokio::test]
async fn test_configured_seed_overrides_stored_key() {
    let dir = TempDir::new().unwrap();
    let mut config = rocks_config(&dir);
    config.game.vrf_seed_hex = Some("11".repeat(32));

    let state = build_state(&config).await.unwrap();
    let expected = VRFGameEngine::from_seed(&[0x11; 32]).unwrap().public_key_hex();
    assert_eq!(state.vrf_public_key.as_deref(), Some(expected.as_str()));
}
