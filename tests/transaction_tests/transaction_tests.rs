//! Tests for single-key transactions
//!
//! These tests verify:
//! - get/set/has/delete through the transaction handle
//! - Typed results flow back to the caller
//! - Errors from the callback are returned and the worker keeps running
//! - Concurrent readers never see intermediate transaction state
//! - A panicking callback only takes down its own bucket

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use bucketkv::{Config, Gateway, KvError, MemEngine};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_gateway() -> Gateway<MemEngine> {
    Gateway::open(MemEngine::new(), Config::default()).unwrap()
}

// =============================================================================
// Basic Transaction Tests
// =============================================================================

#[test]
fn test_transaction_sequence() {
    let gateway = setup_gateway();
    gateway.put(b"apples", b"bananas", None).unwrap();

    let previous = gateway
        .transaction(b"apples", |txn| {
            let previous = txn.get(None)?;
            if !txn.has(None)? {
                return Err(KvError::Aborted("expected key to exist".into()));
            }
            txn.delete(None)?;
            if txn.has(None)? {
                return Err(KvError::Aborted("expected key to be gone".into()));
            }
            txn.set(b"oranges", None)?;
            Ok(previous)
        })
        .unwrap();

    assert_eq!(previous, b"bananas".to_vec());
    assert_eq!(gateway.get(b"apples", None).unwrap(), b"oranges".to_vec());
    gateway.close().unwrap();
}

#[test]
fn test_transaction_key_is_bound() {
    let gateway = setup_gateway();

    let key = gateway
        .transaction(b"bound", |txn| Ok(txn.key().to_vec()))
        .unwrap();

    assert_eq!(key, b"bound".to_vec());
    gateway.close().unwrap();
}

#[test]
fn test_transaction_returns_typed_value() {
    let gateway = setup_gateway();
    gateway.put(b"n", b"41", None).unwrap();

    let incremented: u64 = gateway
        .transaction(b"n", |txn| {
            let raw = txn.get(None)?;
            let n: u64 = std::str::from_utf8(&raw)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| KvError::Corruption("not a number".into()))?;
            txn.set((n + 1).to_string().as_bytes(), None)?;
            Ok(n + 1)
        })
        .unwrap();

    assert_eq!(incremented, 42);
    assert_eq!(gateway.get(b"n", None).unwrap(), b"42".to_vec());
    gateway.close().unwrap();
}

#[test]
fn test_transaction_error_is_returned_and_worker_survives() {
    let gateway = setup_gateway();

    let err = gateway
        .transaction(b"missing", |txn| txn.get(None))
        .unwrap_err();
    assert!(err.is_not_found());

    let err = gateway
        .transaction(b"missing", |_txn| -> bucketkv::Result<()> {
            Err(KvError::Aborted("changed my mind".into()))
        })
        .unwrap_err();
    assert!(matches!(err, KvError::Aborted(ref reason) if reason == "changed my mind"));

    // Same bucket still serves
    gateway.put(b"missing", b"now-present", None).unwrap();
    assert_eq!(gateway.get(b"missing", None).unwrap(), b"now-present".to_vec());
    gateway.close().unwrap();
}

#[test]
fn test_transaction_writes_are_not_rolled_back() {
    let gateway = setup_gateway();

    let result = gateway.transaction(b"k", |txn| -> bucketkv::Result<()> {
        txn.set(b"partial", None)?;
        Err(KvError::Aborted("after write".into()))
    });

    assert!(result.is_err());
    assert_eq!(gateway.get(b"k", None).unwrap(), b"partial".to_vec());
    gateway.close().unwrap();
}

// =============================================================================
// Isolation Tests
// =============================================================================

#[test]
fn test_readers_never_observe_deleted_state() {
    let gateway = Arc::new(setup_gateway());
    gateway.put(b"apples", b"bananas", None).unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    let value = gateway
                        .get(b"apples", None)
                        .expect("reader observed the key while it was deleted");
                    assert!(value == b"bananas".to_vec() || value == b"oranges".to_vec());
                    assert!(gateway.has(b"apples", None).unwrap());
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for i in 0..500 {
        let next: &'static [u8] = if i % 2 == 0 { b"oranges" } else { b"bananas" };
        gateway
            .transaction(b"apples", move |txn| {
                txn.delete(None)?;
                // Give the interleaving a chance to show up if it could
                thread::yield_now();
                txn.set(next, None)
            })
            .unwrap();
    }

    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }
    gateway.close().unwrap();
}

#[test]
fn test_transaction_excludes_concurrent_cas() {
    let gateway = Arc::new(setup_gateway());
    gateway.put(b"slot", b"0", None).unwrap();

    let casers: Vec<_> = (0..4)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || {
                for _ in 0..200 {
                    // Succeeds only if it runs in the middle of a transaction
                    let swapped = gateway
                        .compare_and_swap(b"slot", b"corrupted", b"intermediate", None, None)
                        .unwrap();
                    assert!(!swapped, "CAS interleaved with a transaction");
                }
            })
        })
        .collect();

    for _ in 0..200 {
        gateway
            .transaction(b"slot", |txn| {
                txn.set(b"intermediate", None)?;
                thread::yield_now();
                txn.set(b"0", None)
            })
            .unwrap();
    }

    for caser in casers {
        caser.join().unwrap();
    }
    assert_eq!(gateway.get(b"slot", None).unwrap(), b"0".to_vec());
    gateway.close().unwrap();
}

// =============================================================================
// Panic Tests
// =============================================================================

#[test]
fn test_panicking_transaction_only_breaks_its_bucket() {
    let gateway = setup_gateway();
    let doomed = b"doomed".to_vec();
    let doomed_bucket = gateway.bucket_for(&doomed);
    let survivor = (0..1000)
        .map(|i| format!("survivor-{}", i).into_bytes())
        .find(|k| gateway.bucket_for(k) != doomed_bucket)
        .unwrap();

    let err = gateway
        .transaction(&doomed, |_txn| -> bucketkv::Result<()> {
            panic!("callback blew up");
        })
        .unwrap_err();
    assert!(matches!(err, KvError::WorkerUnavailable { bucket } if bucket == doomed_bucket));

    // The dead bucket keeps failing instead of hanging
    assert!(matches!(
        gateway.put(&doomed, b"v", None),
        Err(KvError::WorkerUnavailable { .. })
    ));

    // Other buckets are unaffected
    gateway.put(&survivor, b"alive", None).unwrap();
    assert_eq!(gateway.get(&survivor, None).unwrap(), b"alive".to_vec());

    // Close still completes and releases the engine
    gateway.close().unwrap();
    assert!(gateway.engine().is_closed());
}
