//! Sharded record pool
//!
//! Each shard owns a bounded slot array. Free slots are chained through a
//! per-slot `next_free` index, and every slot carries a generation counter so a
//! stale handle can never release someone else's record. A slot is either live
//! (its record is out with exactly one caller) or free (its record sits in the
//! slot, on the free list), never both.
//!
//! Callers that find their shard exhausted block until a slot is released.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::metrics::LoggerMetrics;
use super::record::LogRecord;
use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DEFAULT_SHARD_COUNT: usize = 8;
pub const DEFAULT_SLOTS_PER_SHARD: usize = 64;

static NEXT_THREAD_SEED: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_SEED: usize = NEXT_THREAD_SEED.fetch_add(1, Ordering::Relaxed);
}

/// Identifies one live slot: shard, index and the generation it was handed out at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle {
    pub shard: usize,
    pub index: u32,
    pub generation: u32,
}

struct Slot {
    generation: u32,
    next_free: Option<u32>,
    /// `None` while the record is out with a caller
    record: Option<LogRecord>,
}

struct ShardState {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    limit: usize,
}

impl ShardState {
    fn has_room(&self) -> bool {
        self.free_head.is_some() || self.slots.len() < self.limit
    }
}

struct Shard {
    state: Mutex<ShardState>,
    available: Condvar,
}

/// Point-in-time view of one shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardStats {
    /// Slots carved so far
    pub carved: usize,
    pub free: usize,
    pub live: usize,
    pub limit: usize,
}

pub struct RecordPool {
    shards: Vec<Shard>,
    metrics: Arc<LoggerMetrics>,
}

impl RecordPool {
    /// Create a pool of `shard_count` shards holding up to `slots_per_shard` records each.
    pub fn new(shard_count: usize, slots_per_shard: usize) -> Result<Self> {
        if shard_count == 0 || slots_per_shard == 0 {
            return Err(LoggerError::config(
                "RecordPool",
                format!(
                    "needs at least one shard and one slot (got {} x {})",
                    shard_count, slots_per_shard
                ),
            ));
        }
        Ok(Self::with_layout(shard_count, slots_per_shard))
    }

    fn with_layout(shard_count: usize, slots_per_shard: usize) -> Self {
        let shards = (0..shard_count)
            .map(|_| Shard {
                state: Mutex::new(ShardState {
                    slots: Vec::with_capacity(slots_per_shard),
                    free_head: None,
                    limit: slots_per_shard,
                }),
                available: Condvar::new(),
            })
            .collect();
        Self {
            shards,
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }

    /// Count waits into `metrics` instead of a private block.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<LoggerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Pick a shard for the calling thread at a given call site.
    pub fn shard_for(&self, line: u32) -> usize {
        let seed = THREAD_SEED.with(|seed| *seed);
        (seed.wrapping_mul(0x9E37_79B9) ^ line as usize) % self.shards.len()
    }

    /// Number of times a caller had to wait for a free slot
    pub fn wait_count(&self) -> u64 {
        self.metrics.pool_waits()
    }

    /// Take a slot from `shard_id` and copy an already formatted payload into it.
    ///
    /// Blocks while the shard has neither a free slot nor room to carve one.
    /// No user code runs while the slot is held. The record goes back to the
    /// pool when the returned guard drops.
    pub fn acquire(
        &self,
        shard_id: usize,
        level: LogLevel,
        file: &'static str,
        line: u32,
        payload: &str,
        logger_name: &Arc<str>,
    ) -> PooledRecord<'_> {
        let shard_id = shard_id % self.shards.len();
        let (handle, mut record) = self.take_slot(shard_id);
        record.fill(level, file, line, payload, logger_name);
        PooledRecord {
            pool: self,
            handle,
            record: Some(record),
        }
    }

    fn take_slot(&self, shard_id: usize) -> (RecordHandle, LogRecord) {
        let shard = &self.shards[shard_id];
        let mut guard = shard.state.lock();
        if !guard.has_room() {
            self.metrics.record_pool_wait();
            while !guard.has_room() {
                shard.available.wait(&mut guard);
            }
        }

        let state = &mut *guard;
        if let Some(index) = state.free_head {
            let slot = &mut state.slots[index as usize];
            state.free_head = slot.next_free.take();
            let record = slot.record.take().unwrap_or_else(LogRecord::vacant);
            let handle = RecordHandle {
                shard: shard_id,
                index,
                generation: slot.generation,
            };
            return (handle, record);
        }

        let index = state.slots.len() as u32;
        state.slots.push(Slot {
            generation: 0,
            next_free: None,
            record: None,
        });
        let handle = RecordHandle {
            shard: shard_id,
            index,
            generation: 0,
        };
        (handle, LogRecord::vacant())
    }

    fn release(&self, handle: RecordHandle, mut record: LogRecord) {
        record.clear();
        let shard = &self.shards[handle.shard];
        {
            let mut guard = shard.state.lock();
            let state = &mut *guard;
            let head = state.free_head;
            match state.slots.get_mut(handle.index as usize) {
                Some(slot) if slot.generation == handle.generation && slot.record.is_none() => {
                    slot.generation = slot.generation.wrapping_add(1);
                    slot.record = Some(record);
                    slot.next_free = head;
                }
                _ => {
                    eprintln!("[LOGGER ERROR] Ignoring release of stale record handle {:?}", handle);
                    return;
                }
            }
            state.free_head = Some(handle.index);
        }
        shard.available.notify_one();
    }

    pub fn shard_stats(&self, shard_id: usize) -> ShardStats {
        let state = self.shards[shard_id % self.shards.len()].state.lock();
        let live = state.slots.iter().filter(|slot| slot.record.is_none()).count();
        ShardStats {
            carved: state.slots.len(),
            free: state.slots.len() - live,
            live,
            limit: state.limit,
        }
    }
}

impl Default for RecordPool {
    fn default() -> Self {
        Self::with_layout(DEFAULT_SHARD_COUNT, DEFAULT_SLOTS_PER_SHARD)
    }
}

/// A live record checked out of a [`RecordPool`]; dropping it releases the slot.
pub struct PooledRecord<'a> {
    pool: &'a RecordPool,
    handle: RecordHandle,
    record: Option<LogRecord>,
}

impl PooledRecord<'_> {
    pub fn handle(&self) -> RecordHandle {
        self.handle
    }

    /// Return the slot to its shard now.
    pub fn release(self) {}
}

impl Deref for PooledRecord<'_> {
    type Target = LogRecord;

    fn deref(&self) -> &LogRecord {
        self.record
            .as_ref()
            .expect("pooled record present until release")
    }
}

impl Drop for PooledRecord<'_> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.pool.release(self.handle, record);
        }
    }
}
