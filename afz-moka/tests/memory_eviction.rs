//! Tests for memory-based store eviction.

use afz_backend::{CacheStorage, Store};
use afz_core::{RequestKey, ResponseSnapshot, StoreName};
use afz_moka::{EvictionPolicy, MokaStorage};
use bytes::Bytes;
use url::Url;

fn make_key(id: u32) -> RequestKey {
    RequestKey::get(&Url::parse(&format!("https://afz.org/img/{id:04}.png")).unwrap())
}

fn make_value(size: usize) -> ResponseSnapshot {
    ResponseSnapshot::ok(Bytes::from(vec![0u8; size]))
}

#[tokio::test]
async fn test_max_bytes_eviction_precise() {
    let single_entry_size = make_key(1).memory_size() + make_value(100).memory_size();
    let storage = MokaStorage::builder()
        .max_bytes((single_entry_size * 3) as u64)
        .build();
    let name = StoreName::new("afz-runtime-v1");
    storage.open(&name).await.unwrap();
    let store = storage.get(&name).unwrap();

    for i in 1..=3 {
        store.write(&make_key(i), make_value(100)).await.unwrap();
    }
    store.cache().run_pending_tasks().await;
    for i in 1..=3 {
        assert!(store.read(&make_key(i)).await.unwrap().is_some(), "entry {i} should fit");
    }

    store.write(&make_key(4), make_value(100)).await.unwrap();
    store.cache().run_pending_tasks().await;

    assert!(store.read(&make_key(4)).await.unwrap().is_some());
    let mut count = 0;
    for i in 1..=4 {
        if store.read(&make_key(i)).await.unwrap().is_some() {
            count += 1;
        }
    }
    assert_eq!(count, 3, "should have exactly 3 entries after eviction");
}

#[tokio::test]
async fn test_explicit_lru_policy_with_entry_capacity() {
    let storage = MokaStorage::builder()
        .max_entries(3)
        .eviction_policy(EvictionPolicy::lru())
        .build();
    let name = StoreName::new("afz-runtime-v1");
    storage.open(&name).await.unwrap();
    let store = storage.get(&name).unwrap();

    for i in 1..=4 {
        store.write(&make_key(i), make_value(100)).await.unwrap();
        store.cache().run_pending_tasks().await;
    }

    assert!(store.read(&make_key(4)).await.unwrap().is_some());
    assert!(store.read(&make_key(1)).await.unwrap().is_none(), "oldest entry is evicted");
}
