//! Integration tests for the `PostgreSQL` record store.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - `PASSPORT_DATABASE_URL` (or `DATABASE_URL`) pointing at it
//!
//! Run with: cargo test -p sake-passport-integration-tests -- --ignored

use std::sync::Arc;

use secrecy::SecretString;

use sake_passport_core::{Identity, ItemId, RankingUpdate};
use sake_passport_web::db;
use sake_passport_web::services::{RankingStateManager, SyncState};
use sake_passport_web::store::{PostgresRecordStore, RecordStore};

fn database_url() -> SecretString {
    std::env::var("PASSPORT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .expect("PASSPORT_DATABASE_URL or DATABASE_URL must be set")
}

async fn store() -> Arc<dyn RecordStore> {
    let pool = db::create_pool(&database_url())
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Arc::new(PostgresRecordStore::new(pool))
}

async fn wait_settled(manager: &RankingStateManager) -> SyncState {
    manager
        .watch()
        .wait_for(|s| !matches!(s, SyncState::Loading))
        .await
        .expect("rankings settle")
        .clone()
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_more_passports_than_pool_connections() {
    let store = store().await;
    let namespace = format!("it-{}", Identity::generate());

    // The pool holds at most 10 connections.
    let managers: Vec<RankingStateManager> = (0..25)
        .map(|i| {
            RankingStateManager::start(
                Some(Arc::clone(&store)),
                &namespace,
                Identity::new(format!("visitor-{i}")),
            )
        })
        .collect();

    for manager in &managers {
        let state = wait_settled(manager).await;
        assert_eq!(state.label(), "ready", "{}", manager.identity());
    }

    // Writes and reloads still get connections while every passport is live.
    let last = managers.last().expect("managers");
    last.update_ranking(&ItemId::new("sake-3"), RankingUpdate::toggle_stamp(false))
        .await
        .expect("write succeeds");
    last.watch()
        .wait_for(|s| matches!(s, SyncState::Ready(m) if m.is_tasted("sake-3")))
        .await
        .expect("change observed");

    let late = RankingStateManager::start(Some(store), &namespace, Identity::new("late"));
    assert_eq!(wait_settled(&late).await.label(), "ready");
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_change_reaches_only_its_collection() {
    let store = store().await;
    let namespace = format!("it-{}", Identity::generate());
    let alice = RankingStateManager::start(
        Some(Arc::clone(&store)),
        &namespace,
        Identity::new("alice"),
    );
    let bob = RankingStateManager::start(Some(store), &namespace, Identity::new("bob"));
    wait_settled(&alice).await;
    wait_settled(&bob).await;

    alice
        .update_ranking(&ItemId::new("sake-1"), RankingUpdate::notes("melon"))
        .await
        .expect("write succeeds");
    alice
        .watch()
        .wait_for(|s| matches!(s, SyncState::Ready(m) if m.is_tasted("sake-1")))
        .await
        .expect("change observed");

    assert!(bob.read_model().is_empty());
}
