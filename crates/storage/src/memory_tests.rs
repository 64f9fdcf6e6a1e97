// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn set_if_absent_keeps_first_value() {
    let store = InMemoryKeyValueStore::new();
    assert!(store.set("k", "v1".into(), HOUR, false).await.unwrap());
    assert!(!store.set("k", "v2".into(), HOUR, false).await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));
}

#[tokio::test]
async fn override_replaces_value() {
    let store = InMemoryKeyValueStore::new();
    store.set("k", "v1".into(), HOUR, false).await.unwrap();
    assert!(store.set("k", "v2".into(), HOUR, true).await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
}

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl() {
    let store = InMemoryKeyValueStore::new();
    store.set("k", "v".into(), Duration::from_secs(10), false).await.unwrap();
    assert!(store.has("k").await.unwrap());

    tokio::time::advance(Duration::from_secs(11)).await;
    assert!(!store.has("k").await.unwrap());
    assert!(store.is_empty());
    // an expired key can be written again
    assert!(store.set("k", "v2".into(), HOUR, false).await.unwrap());
}

#[tokio::test]
async fn huge_ttl_never_expires() {
    let store = InMemoryKeyValueStore::new();
    store.set("k", "v".into(), Duration::MAX, false).await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn clones_share_contents() {
    let a = InMemoryKeyValueStore::new();
    let b = a.clone();
    a.set("k", "v".into(), HOUR, false).await.unwrap();
    assert_eq!(b.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn fake_counts_and_fails_on_demand() {
    let store = FakeKeyValueStore::new();
    store.set("k", "v".into(), HOUR, false).await.unwrap();
    store.get("k").await.unwrap();
    store.fail_sets(true);
    assert!(store.set("k2", "v".into(), HOUR, false).await.is_err());
    assert_eq!(store.calls(), StoreCalls { get: 1, set: 2, has: 0, cleanup: 0 });
    assert_eq!(store.override_flags(), vec![false, false]);
}
