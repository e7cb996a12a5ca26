use std::{sync::Arc, time::Duration};

use fetchbox_backend::{Backend, CacheBackend, DeleteStatus, MemoryBackend};
use fetchbox_core::CacheKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    secret: String,
}

fn payload() -> Payload {
    Payload {
        secret: "12345".to_owned(),
    }
}

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn set_then_get_returns_value() {
    let store = MemoryBackend::new();
    let key = CacheKey::from("get:/users");

    store.set(&key, &payload(), HOUR).await.unwrap();

    let value: Option<Payload> = store.get(&key).await.unwrap();
    assert_eq!(value, Some(payload()));
    assert!(store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn missing_key() {
    let store = MemoryBackend::new();
    let key = CacheKey::from("get:/nothing");

    let value: Option<Payload> = store.get(&key).await.unwrap();
    assert_eq!(value, None);
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let store = MemoryBackend::new();
    let key = CacheKey::from("get:/short");

    store.set(&key, &payload(), Duration::from_secs(1)).await.unwrap();
    assert!(store.exists(&key).await.unwrap());

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(!store.exists(&key).await.unwrap());
    let value: Option<Payload> = store.get(&key).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn keys_keep_insertion_order_and_include_expired() {
    let store = MemoryBackend::new();
    let a = CacheKey::from("a");
    let b = CacheKey::from("b");
    let c = CacheKey::from("c");

    store.set(&a, &1, HOUR).await.unwrap();
    store.set(&b, &2, Duration::from_secs(1)).await.unwrap();
    store.set(&c, &3, HOUR).await.unwrap();
    // Overwrite keeps the original position.
    store.set(&a, &10, HOUR).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(store.keys().await.unwrap(), vec![a.clone(), b, c]);
    assert_eq!(store.get::<i32>(&a).await.unwrap(), Some(10));
}

#[tokio::test]
async fn purge_drops_only_expired() {
    let store = MemoryBackend::new();
    store
        .set(&CacheKey::from("old"), &1, Duration::from_secs(1))
        .await
        .unwrap();
    store.set(&CacheKey::from("new"), &2, HOUR).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(store.purge_expired(), 1);
    assert_eq!(store.keys().await.unwrap(), vec![CacheKey::from("new")]);
}

#[tokio::test]
async fn delete_reports_status() {
    let store = MemoryBackend::new();
    let key = CacheKey::from("get:/gone");
    store.set(&key, &payload(), HOUR).await.unwrap();

    assert_eq!(store.delete(&key).await.unwrap(), DeleteStatus::Deleted(1));
    assert_eq!(store.delete(&key).await.unwrap(), DeleteStatus::Missing);
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn flush_all_empties_store() {
    let store = MemoryBackend::new();
    for id in 0..5 {
        store
            .set(&CacheKey::new(format!("get:/{id}")), &id, HOUR)
            .await
            .unwrap();
    }
    assert_eq!(store.len(), 5);

    store.flush_all().await.unwrap();

    assert!(store.is_empty());
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_ttl_is_not_persisted() {
    let store = MemoryBackend::new();
    let key = CacheKey::from("get:/never");

    store.set(&key, &payload(), Duration::ZERO).await.unwrap();
    store
        .write(&key, bytes::Bytes::from_static(b"raw"), Duration::ZERO)
        .await
        .unwrap();

    assert!(!store.exists(&key).await.unwrap());
    assert!(store.is_empty());
}

#[tokio::test]
async fn clones_share_entries() {
    let store = MemoryBackend::new();
    let clone = store.clone();
    let key = CacheKey::from("get:/shared");

    clone.set(&key, &payload(), HOUR).await.unwrap();

    assert_eq!(store.get::<Payload>(&key).await.unwrap(), Some(payload()));
}

#[tokio::test]
async fn usable_as_trait_object() {
    let store: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
    let key = CacheKey::from("get:/dyn");

    store.set(&key, &payload(), HOUR).await.unwrap();

    assert_eq!(store.name(), "memory");
    assert_eq!(store.get::<Payload>(&key).await.unwrap(), Some(payload()));
}
