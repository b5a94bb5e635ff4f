//! Integration Tests for the Cache Facade
//!
//! Drives the public API end to end over the memory backend and over
//! hand-written backends that fail, stall or count calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_test::{assert_err, assert_ok};

use json_cache::{
    build_cache, BackendKind, Cache, CacheBackend, CacheConfig, CacheError, CacheErrorKind,
    CancelSignal, EntryOptions, FieldNaming, JsonCodec, MemoryBackend,
};

// == Helpers ==

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Example {
    a: String,
    b: String,
}

fn example(a: &str, b: &str) -> Example {
    Example {
        a: a.to_string(),
        b: b.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    user_id: u64,
    display_name: String,
    is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    user_id: u64,
    display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Shape {
    Circle { radius: u32 },
    Square(u32),
}

/// Backend whose every call fails as unreachable.
#[derive(Debug)]
struct DownBackend;

#[async_trait]
impl CacheBackend for DownBackend {
    async fn get(&self, _key: &str) -> json_cache::Result<Option<Vec<u8>>> {
        Err(CacheError::BackendUnavailable("connection refused".to_string()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _options: &EntryOptions,
    ) -> json_cache::Result<()> {
        Err(CacheError::BackendUnavailable("connection refused".to_string()))
    }

    async fn remove(&self, _key: &str) -> json_cache::Result<()> {
        Err(CacheError::BackendUnavailable("connection refused".to_string()))
    }

    async fn refresh(&self, _key: &str) -> json_cache::Result<()> {
        Err(CacheError::BackendUnavailable("connection refused".to_string()))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Distributed
    }
}

/// Map-backed backend that counts calls and can delay every operation.
#[derive(Debug, Default)]
struct RecordingBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    delay: Option<Duration>,
}

impl RecordingBackend {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CacheBackend for RecordingBackend {
    async fn get(&self, key: &str) -> json_cache::Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        _options: &EntryOptions,
    ) -> json_cache::Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> json_cache::Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn refresh(&self, _key: &str) -> json_cache::Result<()> {
        Ok(())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}

// == Memory Strategy ==

#[tokio::test]
async fn test_memory_strategy_round_trip() {
    let cache = build_cache(&CacheConfig::memory()).await.unwrap();
    assert_eq!(cache.backend_kind(), BackendKind::Memory);

    cache.set("foo", &example("1", "2")).await.unwrap();
    let found: Option<Example> = cache.get("foo").await.unwrap();
    assert_eq!(found, Some(example("1", "2")));

    let missing: Option<Example> = cache.get("bar").await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_default_codec_round_trips_maps_enums_and_renames() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = Cache::new(backend.clone());

    let map: BTreeMap<String, u32> =
        [("Alice".to_string(), 2), ("userId".to_string(), 1)].into_iter().collect();
    cache.set("map", &map).await.unwrap();
    assert_eq!(cache.get::<BTreeMap<String, u32>>("map").await.unwrap(), Some(map));

    let shape = Shape::Circle { radius: 3 };
    cache.set("shape", &shape).await.unwrap();
    assert_eq!(cache.get::<Shape>("shape").await.unwrap(), Some(shape));
    cache.set("square", &Shape::Square(4)).await.unwrap();
    assert_eq!(cache.get::<Shape>("square").await.unwrap(), Some(Shape::Square(4)));

    let account = Account {
        user_id: 1,
        display_name: "Ada".to_string(),
    };
    cache.set("account", &account).await.unwrap();
    let raw = backend.get("account").await.unwrap().unwrap();
    assert_eq!(raw, br#"{"userId":1,"displayName":"Ada"}"#);
    assert_eq!(cache.get::<Account>("account").await.unwrap(), Some(account));
}

#[tokio::test]
async fn test_camel_case_policy_refuses_keys_it_would_corrupt() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = Cache::with_codec(backend.clone(), JsonCodec::new(FieldNaming::CamelCase));

    let map: BTreeMap<String, u32> = [("Alice".to_string(), 2)].into_iter().collect();
    let err = cache.set("map", &map).await.unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Serialization);
    assert!(err.to_string().contains("Alice"));

    assert_err!(cache.set("shape", &Shape::Circle { radius: 3 }).await);
    assert_eq!(backend.get("map").await.unwrap(), None);
    assert_eq!(backend.get("shape").await.unwrap(), None);
}

#[tokio::test]
async fn test_camel_case_policy_on_the_wire() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = Cache::with_codec(backend.clone(), JsonCodec::new(FieldNaming::CamelCase));
    let profile = Profile {
        user_id: 7,
        display_name: "Ada".to_string(),
        is_active: true,
    };

    cache.set("profile:7", &profile).await.unwrap();

    let raw = backend.get("profile:7").await.unwrap().unwrap();
    let wire: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(wire["userId"], 7);
    assert_eq!(wire["displayName"], "Ada");
    assert_eq!(wire["isActive"], true);

    let back: Option<Profile> = cache.get("profile:7").await.unwrap();
    assert_eq!(back, Some(profile));
}

#[tokio::test]
async fn test_reads_payload_with_trailing_comma() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .set("legacy", br#"{"a":"1","b":"2",}"#.to_vec(), &EntryOptions::new())
        .await
        .unwrap();

    let cache = Cache::new(backend);
    let found: Option<Example> = cache.get("legacy").await.unwrap();
    assert_eq!(found, Some(example("1", "2")));
}

#[tokio::test]
async fn test_decode_into_wrong_type_is_serialization_error() {
    let codec = JsonCodec::new(FieldNaming::Preserve);
    let cache = Cache::with_codec(Arc::new(MemoryBackend::new()), codec);
    cache.set("n", &42).await.unwrap();

    let err = cache.get::<Example>("n").await.unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Serialization);
    assert!(err.to_string().contains("'n'"));
}

#[tokio::test(start_paused = true)]
async fn test_sliding_expiration_through_facade() {
    let cache = Cache::new(Arc::new(MemoryBackend::new()));
    let options = EntryOptions::new().with_sliding_expiration(Duration::from_secs(10));

    cache.get_or_set_with("session", &options, || Some(example("s", "1"))).await.unwrap();

    // Each read restarts the window.
    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(cache.get::<Example>("session").await.unwrap().is_some());
    }

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(cache.get::<Example>("session").await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_get_or_set_recomputes_after_expiry() {
    let cache = Cache::new(Arc::new(MemoryBackend::new()));
    let options = EntryOptions::new().with_absolute_expiration(Duration::from_secs(5));
    let calls = AtomicUsize::new(0);

    let compute = || {
        calls.fetch_add(1, Ordering::SeqCst);
        Some(calls.load(Ordering::SeqCst))
    };
    assert_eq!(cache.get_or_set_with("counter", &options, compute).await.unwrap(), 1);
    assert_eq!(cache.get_or_set_with("counter", &options, compute).await.unwrap(), 1);

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(cache.get_or_set_with("counter", &options, compute).await.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_capacity_exceeded_surfaces_from_memory_budget() {
    let mut config = CacheConfig::memory();
    config.memory.size_limit = Some(16);
    let cache = build_cache(&config).await.unwrap();

    let err = cache
        .set("big", &"x".repeat(64))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::CapacityExceeded);
}

#[tokio::test]
async fn test_concurrent_handles_share_entries() {
    let cache = Cache::new(Arc::new(MemoryBackend::new()));

    let mut handles = Vec::new();
    for i in 0..16 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("item:{}", i);
            cache.set(&key, &example(&i.to_string(), "x")).await.unwrap();
            cache.get::<Example>(&key).await.unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let found = handle.await.unwrap();
        assert_eq!(found, Some(example(&i.to_string(), "x")));
    }
}

// == Backend Failures ==

#[tokio::test]
async fn test_unavailable_backend_propagates() {
    let cache = Cache::new(Arc::new(DownBackend));

    let err = assert_err!(cache.set("foo", &example("1", "2")).await);
    assert_eq!(err.kind(), CacheErrorKind::BackendUnavailable);

    let err = assert_err!(cache.get::<Example>("foo").await);
    assert!(err.is_backend_failure());

    assert_err!(cache.remove("foo").await);
    assert_err!(cache.refresh("foo").await);
}

#[tokio::test]
async fn test_get_or_set_does_not_compute_when_backend_down() {
    let cache = Cache::new(Arc::new(DownBackend));
    let calls = AtomicUsize::new(0);

    let result = cache
        .get_or_set_with("foo", &EntryOptions::new(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(example("1", "2"))
        })
        .await;

    assert!(matches!(result, Err(CacheError::BackendUnavailable(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// == Get Or Set ==

#[tokio::test]
async fn test_get_or_set_hit_skips_compute_and_write() {
    let backend = Arc::new(RecordingBackend::default());
    let cache = Cache::new(backend.clone());

    let first = cache
        .get_or_set("k", &EntryOptions::new(), || async { Some(example("1", "2")) })
        .await
        .unwrap();
    let second: Example = cache
        .get_or_set("k", &EntryOptions::new(), || async { None })
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.gets.load(Ordering::SeqCst), 2);
    assert_eq!(backend.sets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_try_get_or_set_error_writes_nothing() {
    let backend = Arc::new(RecordingBackend::default());
    let cache = Cache::new(backend.clone());

    let result = cache
        .try_get_or_set("k", &EntryOptions::new(), || async {
            Err::<Option<Example>, _>("upstream timed out")
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::ComputeFailed);
    assert!(err.to_string().contains("upstream timed out"));
    assert_eq!(backend.sets.load(Ordering::SeqCst), 0);
}

// == Cancellation ==

#[tokio::test(start_paused = true)]
async fn test_cancel_during_slow_read() {
    let backend = Arc::new(RecordingBackend::slow(Duration::from_secs(30)));
    let (canceller, signal) = CancelSignal::pair();
    let cache = Cache::new(backend).with_cancellation(signal);

    let task = tokio::spawn(async move { cache.get::<Example>("k").await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    canceller.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(CacheError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_compute_stores_nothing() {
    let backend = Arc::new(RecordingBackend::default());
    let (canceller, signal) = CancelSignal::pair();
    let cache = Cache::new(backend.clone()).with_cancellation(signal);

    let task = tokio::spawn(async move {
        cache
            .get_or_set("k", &EntryOptions::new(), || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Some(example("late", "value"))
            })
            .await
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    canceller.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(CacheError::Cancelled)));
    assert_eq!(backend.sets.load(Ordering::SeqCst), 0);
    assert!(backend.entries.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_slow_write_commits_nothing() {
    let backend = Arc::new(RecordingBackend::slow(Duration::from_secs(30)));
    let (canceller, signal) = CancelSignal::pair();
    let cache = Cache::new(backend.clone()).with_cancellation(signal);

    let task = tokio::spawn(async move { cache.set("k", &example("1", "2")).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    canceller.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(CacheError::Cancelled)));
    assert_eq!(backend.sets.load(Ordering::SeqCst), 1);

    // Let the abandoned write's delay pass; the entry must still be absent.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(backend.entries.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_get_or_set_write_commits_nothing() {
    let backend = Arc::new(RecordingBackend::slow(Duration::from_secs(10)));
    let (canceller, signal) = CancelSignal::pair();
    let cache = Cache::new(backend.clone()).with_cancellation(signal);

    let task = tokio::spawn(async move {
        cache
            .get_or_set("k", &EntryOptions::new(), || async { Some(example("1", "2")) })
            .await
    });

    // The read finishes at 10s and the write would finish at 20s.
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(backend.sets.load(Ordering::SeqCst), 1);
    canceller.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(CacheError::Cancelled)));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(backend.entries.lock().await.is_empty());
}

#[tokio::test]
async fn test_uncancelled_handle_unaffected_by_other_signal() {
    let backend = Arc::new(MemoryBackend::new());
    let plain = Cache::new(backend);
    let (canceller, signal) = CancelSignal::pair();
    let guarded = plain.with_cancellation(signal);
    canceller.cancel();

    assert_ok!(plain.set("k", &1).await);
    assert_err!(guarded.get::<i32>("k").await);
    assert_eq!(plain.get::<i32>("k").await.unwrap(), Some(1));
}
