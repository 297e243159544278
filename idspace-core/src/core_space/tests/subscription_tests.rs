//! Idempotent subscription bookkeeping

use crate::core_space::*;
use crate::test_utils::*;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_subscribe_twice_keeps_one_record() {
    let env = TestSpaceEnv::new().await;
    let space = env.open_space("music").await;
    let address = TestSpaceEnv::thread_address("music", "general");

    let thread = SubscribedThread::new(&address).with_name("general");
    space.subscribe_thread(thread.clone()).await.unwrap();
    space
        .subscribe_thread(thread.with_name("renamed"))
        .await
        .unwrap();

    let threads = space.subscribed_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    // first record wins
    assert_eq!(threads[0].name.as_deref(), Some("general"));

    let public = space.public().unwrap().all().await.unwrap();
    assert_eq!(public.len(), 1);
    assert!(public.contains_key(&subscription_key(&address)));
}

#[tokio::test]
async fn test_unsubscribe_absent_is_noop() {
    let env = TestSpaceEnv::new().await;
    let space = env.open_space("music").await;
    let address = TestSpaceEnv::thread_address("music", "general");

    space.unsubscribe_thread(&address).await.unwrap();

    assert!(space.subscribed_threads().await.unwrap().is_empty());
    assert!(space.public().unwrap().all().await.unwrap().is_empty());
    assert!(space.public().unwrap().log().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_removes_record() {
    let env = TestSpaceEnv::new().await;
    let space = env.open_space("music").await;
    let general = TestSpaceEnv::thread_address("music", "general");
    let random = TestSpaceEnv::thread_address("music", "random");

    space.subscribe_thread(SubscribedThread::new(&general)).await.unwrap();
    space.subscribe_thread(SubscribedThread::new(&random)).await.unwrap();
    space.unsubscribe_thread(&general).await.unwrap();

    let threads = space.subscribed_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].address, random);
}

#[tokio::test]
async fn test_subscribe_rejects_invalid_address() {
    let env = TestSpaceEnv::new().await;
    let space = env.open_space("music").await;

    let err = space
        .subscribe_thread(SubscribedThread::new("not-an-address"))
        .await
        .unwrap_err();
    assert!(matches!(err, SpaceError::InvalidAddress(_)));
    assert!(space.public().unwrap().all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let env = TestSpaceEnv::new().await;
    let space = env.open_space("music").await;
    let public = space.public().unwrap();
    let valid = TestSpaceEnv::thread_address("music", "general");

    public.set("thread-v1-legacy", json!({"name": "old"})).await.unwrap();
    public.set("thread-/orbitdb/0OIl/bad", json!({})).await.unwrap();
    public.set("profile", json!({"name": "Alice"})).await.unwrap();
    public
        .set(&subscription_key(&valid), json!({"address": valid, "members": "false", "color": "red"}))
        .await
        .unwrap();

    let threads = space.subscribed_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].members, Some(false));
    assert_eq!(threads[0].extra.get("color"), Some(&json!("red")));
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_waits_for_sync() {
    let env = TestSpaceEnv::with_database(
        crate::core_store::MemoryLogDatabase::new().with_sync_delay(Duration::from_secs(3)),
    )
    .await;
    let space = env.space("music");
    space.open(OpenOptions::default()).await.unwrap();
    assert_eq!(space.sync_state(), SyncState::Pending);

    let address = TestSpaceEnv::thread_address("music", "general");
    space.subscribe_thread(SubscribedThread::new(&address)).await.unwrap();

    assert_eq!(space.sync_state(), SyncState::Done);
    assert_eq!(space.subscribed_threads().await.unwrap().len(), 1);
}
