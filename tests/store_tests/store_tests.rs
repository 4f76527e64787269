//! Tests for Store
//!
//! These tests verify:
//! - Basic set/get operations and overwrite
//! - Batch-capacity and timer driven flushes
//! - Reads through the index and record log after eviction
//! - WAL lines written for every set
//! - Persistence across reopen
//! - Concurrent access from several threads
//! - WAL, record-log and index write failures

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use emberkv::config::{Config, ConfigBuilder, WalSyncStrategy};
use emberkv::store::Store;
use emberkv::wal::{WalEntry, WalReader};
use emberkv::{hash, EmberError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite) // Sync every write for test reliability
        .build()
}

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(test_config(&temp_dir)).unwrap();
    (temp_dir, store)
}

fn setup_small_store(cache_capacity: usize, batch_capacity: usize) -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .cache_capacity(cache_capacity)
        .batch_capacity(batch_capacity)
        .build();
    let store = Store::open(config).unwrap();
    (temp_dir, store)
}

fn val(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_files() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let _store = Store::open_path(&data_dir).unwrap();

    assert!(data_dir.join(Config::RECORD_LOG_FILENAME).exists());
    assert!(data_dir.join(Config::INDEX_FILENAME).exists());
    assert!(data_dir.join(Config::WAL_FILENAME).exists());
}

#[test]
fn test_set_and_get() {
    let (_temp, store) = setup_temp_store();

    store.set("name", r#"{"value": "ember"}"#).unwrap();

    assert_eq!(store.get("name"), Some(val(r#"{"value": "ember"}"#)));
}

#[test]
fn test_get_missing() {
    let (_temp, store) = setup_temp_store();

    assert_eq!(store.get("nope"), None);
}

#[test]
fn test_overwrite() {
    let (_temp, store) = setup_temp_store();

    store.set("k", "v1").unwrap();
    store.set("k", "v2").unwrap();

    assert_eq!(store.get("k"), Some(val("v2")));
}

#[test]
fn test_overwrite_after_flush() {
    let (_temp, store) = setup_temp_store();

    store.set("k", "v1").unwrap();
    store.flush().unwrap();
    store.set("k", "v2").unwrap();
    store.flush().unwrap();

    store.evict_cached("k");
    assert_eq!(store.get("k"), Some(val("v2")));
    assert_eq!(store.stats().indexed, 1);
}

#[test]
fn test_empty_key_and_payload() {
    let (_temp, store) = setup_temp_store();

    store.set("", "").unwrap();
    store.flush().unwrap();
    store.evict_cached("");

    assert_eq!(store.get(""), Some(Bytes::new()));
}

#[test]
fn test_large_payload() {
    let (_temp, store) = setup_temp_store();
    let payload = Bytes::from(vec![b'x'; 1024 * 1024]);

    store.set("big", payload.clone()).unwrap();
    store.flush().unwrap();
    store.evict_cached("big");

    assert_eq!(store.get("big"), Some(payload));
}

#[test]
fn test_hash_collision_overwrites() {
    let (_temp, store) = setup_temp_store();
    assert_eq!(hash("costarring"), hash("liquid"));

    store.set("costarring", "first").unwrap();
    store.set("liquid", "second").unwrap();

    // Distinct keys with one identifier share a slot
    assert_eq!(store.get("costarring"), Some(val("second")));
    assert_eq!(store.get("liquid"), Some(val("second")));
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_writes_buffered_until_batch_fills() {
    let (_temp, store) = setup_small_store(10, 3);

    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    assert_eq!(store.stats().pending, 2);
    assert!(!store.is_indexed("a"));

    store.set("c", "3").unwrap();
    assert_eq!(store.stats().pending, 0);
    assert!(store.is_indexed("a"));
    assert!(store.is_indexed("b"));
    assert!(store.is_indexed("c"));
}

#[test]
fn test_concrete_scenario() {
    let (_temp, store) = setup_small_store(2, 3);
    let (a, b, c) = (hash("a"), hash("b"), hash("c"));

    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    assert_eq!(store.cached_ids(), vec![b, a]);
    assert_eq!(store.pending_ids(), vec![a, b]);

    store.set("c", "3").unwrap();
    assert!(store.pending_ids().is_empty());
    assert_eq!(store.stats().indexed, 3);
    assert_eq!(store.cached_ids(), vec![c, b]);

    // Miss in the cache, served from the record log and promoted
    assert_eq!(store.get("a"), Some(val("1")));
    assert_eq!(store.cached_ids(), vec![a, c]);
}

#[test]
fn test_get_after_eviction_reads_record_log() {
    let (_temp, store) = setup_temp_store();

    store.set("k", "durable").unwrap();
    store.flush().unwrap();

    assert!(store.evict_cached("k"));
    assert!(!store.is_cached("k"));

    assert_eq!(store.get("k"), Some(val("durable")));
    assert!(store.is_cached("k"));
}

#[test]
fn test_timer_flushes_pending_writes() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .flush_interval(Duration::from_millis(50))
        .build();
    let store = Store::open(config).unwrap();

    store.set("k", "v").unwrap();
    assert!(!store.is_indexed("k"));

    thread::sleep(Duration::from_millis(500));

    assert!(store.is_indexed("k"));
    assert_eq!(store.stats().pending, 0);
}

#[test]
fn test_timer_rearms_after_flush() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .flush_interval(Duration::from_millis(50))
        .build();
    let store = Store::open(config).unwrap();

    store.set("first", "1").unwrap();
    thread::sleep(Duration::from_millis(400));
    assert!(store.is_indexed("first"));

    store.set("second", "2").unwrap();
    thread::sleep(Duration::from_millis(400));
    assert!(store.is_indexed("second"));
}

#[test]
fn test_flush_with_nothing_pending() {
    let (_temp, store) = setup_temp_store();

    assert_eq!(store.flush().unwrap(), 0);
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_batch_set() {
    let (_temp, store) = setup_temp_store();

    store
        .batch_set(vec![("a", "1"), ("b", "2"), ("c", "3")])
        .unwrap();

    assert_eq!(store.get("a"), Some(val("1")));
    assert_eq!(store.get("b"), Some(val("2")));
    assert_eq!(store.get("c"), Some(val("3")));
    assert_eq!(store.stats().wal_entries, 3);
}

#[test]
fn test_batch_set_later_pair_wins() {
    let (_temp, store) = setup_temp_store();

    store.batch_set(vec![("k", "old"), ("k", "new")]).unwrap();
    store.flush().unwrap();
    store.evict_cached("k");

    assert_eq!(store.get("k"), Some(val("new")));
}

#[test]
fn test_batch_set_empty() {
    let (_temp, store) = setup_temp_store();

    store.batch_set(Vec::<(&str, &str)>::new()).unwrap();
    assert_eq!(store.stats().wal_entries, 0);
}

// =============================================================================
// WAL Tests
// =============================================================================

#[test]
fn test_set_is_logged() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let wal_path = config.wal_path.clone();
    let store = Store::open(config).unwrap();

    store.set("a", "1").unwrap();
    store.set("b", "two words").unwrap();

    let entries = WalReader::open(&wal_path).unwrap().read_all();
    assert_eq!(
        entries,
        vec![WalEntry::set("a", "1"), WalEntry::set("b", "two words")]
    );
    // Logged but not yet flushed
    assert_eq!(store.stats().pending, 2);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_after_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = Store::open(test_config(&temp_dir)).unwrap();
        store.set("k1", "v1").unwrap();
        store.set("k2", "v2").unwrap();
        store.close().unwrap();
    }

    let store = Store::open(test_config(&temp_dir)).unwrap();
    assert_eq!(store.get("k1"), Some(val("v1")));
    assert_eq!(store.get("k2"), Some(val("v2")));
    assert_eq!(store.stats().indexed, 2);
}

#[test]
fn test_reopen_after_drop() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = Store::open(test_config(&temp_dir)).unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.stats().pending, 1);
    }

    let store = Store::open(test_config(&temp_dir)).unwrap();
    assert_eq!(store.get("k"), Some(val("v")));
}

#[test]
fn test_reopen_keeps_wal_history() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir);
    let wal_path = config.wal_path.clone();

    Store::open(config.clone()).unwrap().set("a", "1").unwrap();
    Store::open(config).unwrap().set("b", "2").unwrap();

    let entries = WalReader::open(&wal_path).unwrap().read_all();
    assert_eq!(entries.len(), 2);
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let bad = [
        Config::builder().data_dir(temp_dir.path()).cache_capacity(0).build(),
        Config::builder().data_dir(temp_dir.path()).batch_capacity(0).build(),
        Config::builder()
            .data_dir(temp_dir.path())
            .flush_interval(Duration::ZERO)
            .build(),
        Config::builder().data_dir(temp_dir.path()).min_degree(1).build(),
    ];

    for config in bad {
        assert!(matches!(
            Store::open(config).err(),
            Some(EmberError::Config(_))
        ));
    }
}

// =============================================================================
// Stats Tests
// =============================================================================

#[test]
fn test_stats() {
    let (_temp, store) = setup_small_store(10, 100);

    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();

    let stats = store.stats();
    assert_eq!(stats.cached, 2);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.indexed, 0);
    assert_eq!(stats.record_log_bytes, 0);
    assert_eq!(stats.wal_entries, 2);

    store.flush().unwrap();
    let stats = store.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.indexed, 2);
    // Two records, 12-byte header + 1-byte payload each
    assert_eq!(stats.record_log_bytes, 26);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_sets() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .batch_capacity(7)
        .build();
    let wal_path = config.wal_path.clone();
    let store = Arc::new(Store::open(config).unwrap());

    let mut handles = vec![];
    for t in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                store
                    .set(&format!("t{}-k{}", t, i), format!("v{}-{}", t, i))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    store.flush().unwrap();
    for t in 0..4 {
        for i in 0..25 {
            let key = format!("t{}-k{}", t, i);
            store.evict_cached(&key);
            assert_eq!(store.get(&key), Some(Bytes::from(format!("v{}-{}", t, i))));
        }
    }

    // WAL lines never interleave
    let mut reader = WalReader::open(&wal_path).unwrap();
    let entries = reader.read_all();
    assert_eq!(entries.len(), 100);
    assert_eq!(reader.malformed_lines(), 0);
    for entry in entries {
        let rest = entry.key.strip_prefix('t').unwrap();
        let (t, i) = rest.split_once("-k").unwrap();
        assert_eq!(entry.payload, Bytes::from(format!("v{}-{}", t, i)));
    }
}

#[test]
fn test_concurrent_reads_and_writes() {
    let (_temp, store) = setup_small_store(4, 5);
    let store = Arc::new(store);

    for i in 0..20 {
        store.set(&format!("key{}", i), format!("value{}", i)).unwrap();
    }

    let mut handles = vec![];
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..20 {
                let got = store.get(&format!("key{}", i));
                assert_eq!(got, Some(Bytes::from(format!("value{}", i))));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

// =============================================================================
// Write Failure Tests
// =============================================================================

/// Store whose config is adjusted to point one file at `/dev/full`
#[cfg(target_os = "linux")]
fn failing_store(configure: impl FnOnce(ConfigBuilder) -> ConfigBuilder) -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let builder = Config::builder().data_dir(temp_dir.path());
    let store = Store::open(configure(builder).build()).unwrap();
    (temp_dir, store)
}

#[cfg(target_os = "linux")]
#[test]
fn test_wal_failure_aborts_set_before_buffer() {
    let (_temp, store) = failing_store(|b| b.wal_path("/dev/full"));

    assert!(matches!(store.set("k", "v"), Err(EmberError::WalWrite(_))));

    assert_eq!(store.get("k"), None);
    let stats = store.stats();
    assert_eq!(stats.cached, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.wal_entries, 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_wal_failure_aborts_batch_set() {
    let (_temp, store) = failing_store(|b| b.wal_path("/dev/full"));

    assert!(store.batch_set(vec![("a", "1"), ("b", "2")]).is_err());

    assert_eq!(store.get("a"), None);
    assert_eq!(store.stats().pending, 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_record_log_failure_surfaces_on_flushing_set() {
    let (temp, store) = failing_store(|b| b.record_log_path("/dev/full").batch_capacity(3));
    let wal_path = temp.path().join(Config::WAL_FILENAME);

    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    assert!(matches!(store.set("c", "3"), Err(EmberError::Io(_))));

    let stats = store.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.indexed, 0);
    assert!(!store.is_indexed("a"));

    // Every set that reached the buffer was logged first
    assert_eq!(WalReader::open(&wal_path).unwrap().read_all().len(), 3);
}

#[cfg(target_os = "linux")]
#[test]
fn test_record_log_failure_surfaces_on_explicit_flush() {
    let (_temp, store) = failing_store(|b| b.record_log_path("/dev/full"));

    store.set("a", "1").unwrap();
    assert!(store.flush().is_err());

    assert_eq!(store.stats().pending, 0);
    assert_eq!(store.flush().unwrap(), 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_index_persist_failure_fails_set() {
    let (_temp, store) = failing_store(|b| b.index_path("/dev/full").batch_capacity(1));

    assert!(store.set("k", "v").is_err());

    assert!(!store.is_indexed("k"));
    assert_eq!(store.stats().indexed, 0);
}
