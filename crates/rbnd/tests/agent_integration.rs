//! Integration tests for the agent as a complete system: coordinator,
//! config store, and action journal against real state files.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed. We test
//! the panic-free behavior of production code through assertions.

use rbn_core::CountdownState;
use rbn_store::{spawn_config_store, spawn_journal, StatePaths};
use rbnd::coordinator::{Coordinator, ExpiryOutcome};
use serde_json::{json, Value};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

async fn setup(
    dir: &TempDir,
    initial_config: Value,
    countdown: CountdownState,
) -> (Coordinator, rbn_store::ActionJournal, StatePaths) {
    let paths = StatePaths::in_dir(dir.path());
    std::fs::write(
        paths.config_file(),
        serde_json::to_vec(&initial_config).unwrap(),
    )
    .unwrap();

    let config = spawn_config_store(paths.config_file());
    config.load().await.unwrap();
    let journal = spawn_journal(paths.history_file(), paths.snapshot_file());

    (
        Coordinator::new(countdown, config, journal.clone()),
        journal,
        paths,
    )
}

fn read_config(paths: &StatePaths) -> Value {
    serde_json::from_slice(&std::fs::read(paths.config_file()).unwrap()).unwrap()
}

fn read_history_actions(paths: &StatePaths) -> Vec<String> {
    std::fs::read_to_string(paths.history_file())
        .unwrap_or_default()
        .lines()
        .map(|l| {
            serde_json::from_str::<Value>(l).unwrap()["action"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect()
}

// ============================================================================
// Full Countdown Lifecycle
// ============================================================================

#[tokio::test]
async fn test_countdown_runs_out_and_spends_credit() {
    let dir = TempDir::new().unwrap();
    let countdown = CountdownState::new(5, vec![1800, 5400], None);
    let (mut coordinator, journal, paths) =
        setup(&dir, json!({ "delay_counter": 2 }), countdown).await;

    // Drive five ticks by hand - the timer loop is just this plus a clock.
    let mut expired = false;
    for _ in 0..5 {
        expired = coordinator.on_tick();
    }
    assert!(expired);

    let outcome = coordinator.handle_expiry().await;
    journal.sync().await;

    assert_eq!(outcome, ExpiryOutcome::Delayed(1800));

    let config = read_config(&paths);
    assert_eq!(config["delay_counter"], 1);
    assert_eq!(config["reboot_now"], false);
    assert_eq!(config["task_scheduled"], false);
    assert_eq!(
        config["scheduled_time"].as_str().unwrap().len(),
        "2024-03-10 15:00:00".len()
    );

    assert_eq!(read_history_actions(&paths), vec!["auto_delayed"]);
}

#[tokio::test]
async fn test_credit_exhaustion_ends_in_reboot_now() {
    let dir = TempDir::new().unwrap();
    let countdown = CountdownState::new(0, vec![60], None);
    let (mut coordinator, journal, paths) =
        setup(&dir, json!({ "delay_counter": 1 }), countdown).await;

    // First expiry spends the only credit.
    coordinator.on_tick();
    assert_eq!(
        coordinator.handle_expiry().await,
        ExpiryOutcome::Delayed(60)
    );

    // Run the fresh 60 seconds down again; now the credit is gone.
    for _ in 0..60 {
        coordinator.on_tick();
    }
    assert_eq!(coordinator.handle_expiry().await, ExpiryOutcome::RebootNow);
    journal.sync().await;

    let config = read_config(&paths);
    assert_eq!(config["delay_counter"], 0);
    assert_eq!(config["reboot_now"], true);

    assert_eq!(
        read_history_actions(&paths),
        vec!["auto_delayed", "reboot_now"]
    );
}

#[tokio::test]
async fn test_operator_delays_then_expiry() {
    let dir = TempDir::new().unwrap();
    let countdown = CountdownState::new(10, vec![30, 60], None);
    let (mut coordinator, journal, paths) =
        setup(&dir, json!({ "delay_counter": 2 }), countdown).await;

    // Operator defers once; a bogus duration is refused.
    assert!(coordinator.request_delay(30).await);
    assert!(!coordinator.request_delay(45).await);
    assert_eq!(coordinator.remaining_seconds(), 40);

    // Let everything run out, spending the remaining credit.
    for _ in 0..40 {
        coordinator.on_tick();
    }
    assert_eq!(coordinator.handle_expiry().await, ExpiryOutcome::Delayed(30));

    for _ in 0..30 {
        coordinator.on_tick();
    }
    assert_eq!(coordinator.handle_expiry().await, ExpiryOutcome::RebootNow);
    journal.sync().await;

    assert_eq!(
        read_history_actions(&paths),
        vec!["delayed", "auto_delayed", "reboot_now"]
    );

    // Snapshot file holds only the final action.
    let snapshot: Value =
        serde_json::from_slice(&std::fs::read(paths.snapshot_file()).unwrap()).unwrap();
    assert_eq!(snapshot["action"], "reboot_now");
    assert_eq!(snapshot["remaining_seconds"], 0);
}

// ============================================================================
// Disk Trouble Never Blocks the Decision
// ============================================================================

#[tokio::test]
async fn test_expiry_decision_survives_unwritable_state() {
    let dir = TempDir::new().unwrap();
    let paths = StatePaths::in_dir(dir.path());

    // Make every persist fail: directories where the files should be.
    std::fs::create_dir(paths.config_file()).unwrap();
    std::fs::create_dir(paths.snapshot_file()).unwrap();
    std::fs::create_dir(paths.history_file()).unwrap();

    let config = spawn_config_store(paths.config_file());
    config.load().await.unwrap();
    let journal = spawn_journal(paths.history_file(), paths.snapshot_file());
    let countdown = CountdownState::new(0, vec![60], None);
    let mut coordinator = Coordinator::new(countdown, config, journal.clone());

    coordinator.on_tick();
    let outcome = coordinator.handle_expiry().await;
    journal.sync().await;

    // No credit in the (empty) document, so the decision is reboot-now,
    // reached despite every disk write failing.
    assert_eq!(outcome, ExpiryOutcome::RebootNow);
}
