//! Stress tests for the pool and the async pipeline
//!
//! These tests verify:
//! - Pool slots are never shared between in-flight records
//! - SAFE mode drops nothing under concurrent producers
//! - Per-thread push order survives the arena swaps
//! - UNSAFE mode never blocks producers

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use zlog_engine::core::pool::{RecordHandle, RecordPool};
use zlog_engine::prelude::*;
use zlog_engine::info;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Sink for Capture {
    fn log(&mut self, bytes: &[u8]) -> Result<()> {
        self.0.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "capture"
    }
}

/// N threads contend for M < N slots on one shard; no handle is ever live twice
#[test]
fn test_pool_never_aliases_live_slots() {
    const THREADS: usize = 8;
    const SLOTS: usize = 3;
    const ROUNDS: usize = 500;

    let pool = Arc::new(RecordPool::new(1, SLOTS).expect("Failed to create pool"));
    let live: Arc<Mutex<HashSet<(u32, u32)>>> = Arc::new(Mutex::new(HashSet::new()));
    let peak = Arc::new(AtomicUsize::new(0));
    let name: Arc<str> = Arc::from("stress");

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            let live = Arc::clone(&live);
            let peak = Arc::clone(&peak);
            let name = Arc::clone(&name);
            thread::spawn(move || {
                for i in 0..ROUNDS {
                    let payload = format!("{}-{}", t, i);
                    let record = pool.acquire(0, LogLevel::Info, "stress.rs", i as u32, &payload, &name);
                    let RecordHandle { index, generation, .. } = record.handle();
                    {
                        let mut set = live.lock();
                        assert!(set.insert((index, generation)), "slot {} handed out twice", index);
                        peak.fetch_max(set.len(), Ordering::Relaxed);
                    }
                    assert_eq!(record.payload, payload);
                    live.lock().remove(&(index, generation));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert!(peak.load(Ordering::Relaxed) <= SLOTS);
    let stats = pool.shard_stats(0);
    assert_eq!(stats.live, 0);
    assert!(stats.carved <= SLOTS);
}

/// Concurrent SAFE producers against a tiny arena lose nothing and keep per-thread order
#[test]
fn test_safe_mode_concurrent_no_drops() {
    const THREADS: usize = 6;
    const PER_THREAD: usize = 2000;

    let capture = Capture::default();
    let logger = Arc::new(
        Logger::builder("safe")
            .pattern("%m%n")
            .sink(capture.clone())
            .async_mode(AsyncMode::Safe)
            .arena_capacity(512)
            .flush_timeout(Duration::from_millis(10))
            .build()
            .expect("Failed to build logger"),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    info!(logger, "{}:{}", t, i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }
    logger.shutdown().expect("Failed to stop logger");

    let bytes = capture.0.lock().clone();
    let text = String::from_utf8(bytes).expect("utf8 output");
    let mut next: HashMap<usize, usize> = HashMap::new();
    let mut count = 0;
    for line in text.lines() {
        let (t, i) = line.split_once(':').expect("malformed line");
        let t: usize = t.parse().expect("thread id");
        let i: usize = i.parse().expect("sequence");
        let expected = next.entry(t).or_insert(0);
        assert_eq!(i, *expected, "thread {} out of order", t);
        *expected += 1;
        count += 1;
    }
    assert_eq!(count, THREADS * PER_THREAD);
    assert_eq!(logger.metrics().records_emitted(), (THREADS * PER_THREAD) as u64);
}

#[test]
fn test_unsafe_mode_concurrent_no_drops() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 5000;

    let capture = Capture::default();
    let logger = Arc::new(
        Logger::builder("unsafe")
            .pattern("%m%n")
            .sink(capture.clone())
            .async_mode(AsyncMode::Unsafe)
            .arena_capacity(256)
            .build()
            .expect("Failed to build logger"),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    info!(logger, "{}:{}", t, i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }
    logger.flush().expect("Failed to flush");

    let lines = capture.0.lock().iter().filter(|b| **b == b'\n').count();
    assert_eq!(lines, THREADS * PER_THREAD);
    assert_eq!(logger.metrics().block_events(), 0);
    assert_eq!(logger.metrics().records_emitted(), (THREADS * PER_THREAD) as u64);
}

/// Many threads on a small pool through the logger front door
#[test]
fn test_logger_with_small_pool_under_contention() {
    let capture = Capture::default();
    let logger = Arc::new(
        Logger::builder("pooled")
            .pattern("%m%n")
            .pool(2, 1)
            .sink(capture.clone())
            .build()
            .expect("Failed to build logger"),
    );

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..200 {
                    logger.log(LogLevel::Info, "pool.rs", i, format_args!("{}-{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let lines = capture.0.lock().iter().filter(|b| **b == b'\n').count();
    assert_eq!(lines, 8 * 200);
}
