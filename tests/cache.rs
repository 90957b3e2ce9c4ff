//! Integration-level tests for the pluggable cache (§4.4): concurrent
//! access through `tokio::spawn`, fingerprint identity across call
//! shapes, and capacity-one eviction, as black-box exercises of the
//! public `appserver::cache` API rather than the in-module unit tests.

use std::sync::Arc;

use appserver::cache::{Fingerprint, LruCache, MemoizeCache};

#[tokio::test]
async fn fingerprint_distinguishes_function_and_argument_order() {
    let a = Fingerprint::new("handler", &["1".to_string(), "2".to_string()], &[]);
    let b = Fingerprint::new("handler", &["2".to_string(), "1".to_string()], &[]);
    let c = Fingerprint::new("other", &["1".to_string(), "2".to_string()], &[]);
    assert_ne!(a, b);
    assert_ne!(a, c);

    let same = Fingerprint::new("handler", &["1".to_string(), "2".to_string()], &[]);
    assert_eq!(a, same);
}

#[tokio::test]
async fn fingerprint_ignores_keyword_argument_order() {
    let a = Fingerprint::new(
        "handler",
        &[],
        &[("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())],
    );
    let b = Fingerprint::new(
        "handler",
        &[],
        &[("y".to_string(), "2".to_string()), ("x".to_string(), "1".to_string())],
    );
    assert_eq!(a, b);
}

#[tokio::test]
async fn capacity_one_cache_keeps_only_the_latest_entry() {
    let cache: LruCache<&'static str> = LruCache::new(1);
    cache.put(Fingerprint::new("f", &["1".into()], &[]), "first").await;
    cache.put(Fingerprint::new("f", &["2".into()], &[]), "second").await;

    assert_eq!(cache.get(&Fingerprint::new("f", &["1".into()], &[])).await, None);
    assert_eq!(
        cache.get(&Fingerprint::new("f", &["2".into()], &[])).await,
        Some("second")
    );
}

#[tokio::test]
async fn lru_cache_survives_concurrent_readers_and_writers() {
    let cache = Arc::new(LruCache::<usize>::new(16));
    let mut tasks = Vec::new();
    for i in 0..64 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            let key = Fingerprint::new("f", &[(i % 8).to_string()], &[]);
            cache.put(key.clone(), i).await;
            cache.get(&key).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    // No panics, no deadlocks; capacity bound still holds at most 8 distinct keys.
}

#[tokio::test]
async fn memoize_cache_accumulates_without_bound() {
    let cache: MemoizeCache<usize> = MemoizeCache::new();
    let mut tasks = Vec::new();
    let cache = Arc::new(cache);
    for i in 0..200 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            cache.put(Fingerprint::new("f", &[i.to_string()], &[]), i).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    for i in 0..200 {
        assert_eq!(
            cache.get(&Fingerprint::new("f", &[i.to_string()], &[])).await,
            Some(i)
        );
    }
}
