//! Double-buffered async pipeline
//!
//! Producers append rendered bytes to a shared producer arena. Two arenas
//! circulate: the one producers fill, and a spare that travels between the
//! flush thread and producers over a one-slot channel. When the producer arena
//! crosses the flush threshold (or runs out of room in SAFE mode) the filler
//! swaps in the spare and sends the full arena to the flush thread, which
//! writes it to the sinks, resets it, and hands it back as the new spare.
//!
//! The flush thread never blocks on the producer lock, so a producer waiting
//! for the spare while holding that lock always makes progress.

use super::arena::{ByteArena, DEFAULT_ARENA_CAPACITY};
use super::error::{self, LoggerError, Result};
use super::metrics::LoggerMetrics;
use super::sink::SinkSet;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pending commands the flush thread may have queued before producers wait
const COMMAND_QUEUE_DEPTH: usize = 16;

/// Backpressure behavior of an [`AsyncPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncMode {
    /// Fixed-capacity arenas; a producer blocks until the flush thread frees room
    #[default]
    Safe,
    /// Growable arenas; producers never wait on the flush thread
    Unsafe,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Prefix for the flush thread's name
    pub name: String,
    pub capacity: usize,
    pub mode: AsyncMode,
    /// Upper bound between periodic flushes of a partially filled arena
    pub flush_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "zlog".to_string(),
            capacity: DEFAULT_ARENA_CAPACITY,
            mode: AsyncMode::Safe,
            flush_timeout: Duration::from_secs(3),
        }
    }
}

enum Command {
    /// A full arena to write out and return as the spare
    Drain(ByteArena),
    /// A single record too large for a SAFE arena
    Oversized(Vec<u8>),
    /// Flush sinks, then acknowledge
    Flush(Sender<()>),
    Stop,
}

struct ProducerState {
    arena: ByteArena,
    stopped: bool,
}

pub struct AsyncPipeline {
    producer: Arc<Mutex<ProducerState>>,
    spare: Receiver<ByteArena>,
    commands: Sender<Command>,
    mode: AsyncMode,
    threshold: usize,
    name: String,
    handle: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<LoggerMetrics>,
}

impl AsyncPipeline {
    /// Start the flush thread; `sinks` move onto it and are only touched there.
    pub fn new(config: PipelineConfig, sinks: SinkSet, metrics: Arc<LoggerMetrics>) -> Result<Self> {
        if config.capacity == 0 {
            return Err(LoggerError::config("AsyncPipeline", "arena capacity must be positive"));
        }
        if config.flush_timeout.is_zero() {
            return Err(LoggerError::config("AsyncPipeline", "flush timeout must be positive"));
        }

        let new_arena = || match config.mode {
            AsyncMode::Safe => ByteArena::fixed(config.capacity),
            AsyncMode::Unsafe => ByteArena::growable(config.capacity),
        };
        let producer = Arc::new(Mutex::new(ProducerState {
            arena: new_arena(),
            stopped: false,
        }));
        let (spare_tx, spare_rx) = bounded(1);
        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_DEPTH);
        spare_tx
            .send(new_arena())
            .map_err(|_| LoggerError::ChannelSendError)?;

        let worker = FlushWorker {
            producer: Arc::clone(&producer),
            commands: command_rx,
            queued: command_tx.clone(),
            spare_tx,
            spare_rx: spare_rx.clone(),
            sinks,
            flush_timeout: config.flush_timeout,
            metrics: Arc::clone(&metrics),
        };
        let handle = thread::Builder::new()
            .name(format!("{}-flush", config.name))
            .spawn(move || worker.run())
            .map_err(|e| LoggerError::io_operation("spawning flush thread", config.name.clone(), e))?;

        Ok(Self {
            producer,
            spare: spare_rx,
            commands: command_tx,
            mode: config.mode,
            threshold: (config.capacity / 2).max(1),
            name: config.name,
            handle: Mutex::new(Some(handle)),
            metrics,
        })
    }

    pub fn mode(&self) -> AsyncMode {
        self.mode
    }

    /// Readable bytes at which a producer tries to hand the arena off
    pub fn flush_threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_stopped(&self) -> bool {
        self.producer.lock().stopped
    }

    /// Bytes pushed but not yet handed to the flush thread
    pub fn pending_bytes(&self) -> usize {
        self.producer.lock().arena.readable_size()
    }

    /// Append `bytes` to the producer arena.
    ///
    /// In SAFE mode this blocks while both arenas are full. Fails with
    /// [`LoggerError::LoggerStopped`] once [`stop`](Self::stop) has run.
    pub fn push(&self, bytes: &[u8]) -> Result<()> {
        let mut producer = self.producer.lock();
        if producer.stopped {
            return Err(LoggerError::LoggerStopped);
        }

        if self.mode == AsyncMode::Safe {
            if bytes.len() > producer.arena.capacity() {
                if !producer.arena.is_empty() {
                    self.metrics.record_block();
                    self.hand_off_blocking(&mut producer.arena)?;
                }
                return self.send(Command::Oversized(bytes.to_vec()));
            }
            if producer.arena.writable_size() < bytes.len() {
                self.metrics.record_block();
                self.hand_off_blocking(&mut producer.arena)?;
            }
        }
        producer.arena.push(bytes);

        if producer.arena.readable_size() >= self.threshold {
            if let Ok(spare) = self.spare.try_recv() {
                self.hand_off(&mut producer.arena, spare)?;
            }
        }
        Ok(())
    }

    /// Write everything pushed so far through the sinks and wait for it.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        {
            let mut producer = self.producer.lock();
            if producer.stopped {
                return Ok(());
            }
            if !producer.arena.is_empty() {
                self.hand_off_blocking(&mut producer.arena)?;
            }
            self.send(Command::Flush(ack_tx))?;
        }
        ack_rx.recv().map_err(|_| LoggerError::ChannelSendError)
    }

    /// Drain what is left, stop the flush thread and join it.
    ///
    /// Idempotent; later calls return immediately.
    pub fn stop(&self) -> Result<()> {
        {
            let mut producer = self.producer.lock();
            if producer.stopped {
                return Ok(());
            }
            producer.stopped = true;
            if !producer.arena.is_empty() {
                self.hand_off_blocking(&mut producer.arena)?;
            }
            self.send(Command::Stop)?;
        }

        if let Some(handle) = self.handle.lock().take() {
            handle
                .join()
                .map_err(|_| LoggerError::other(format!("flush thread '{}-flush' panicked", self.name)))?;
        }
        Ok(())
    }

    fn hand_off_blocking(&self, arena: &mut ByteArena) -> Result<()> {
        let spare = self.spare.recv().map_err(|_| LoggerError::ChannelSendError)?;
        self.hand_off(arena, spare)
    }

    fn hand_off(&self, arena: &mut ByteArena, mut spare: ByteArena) -> Result<()> {
        spare.swap_with(arena);
        self.send(Command::Drain(spare))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| LoggerError::ChannelSendError)
    }
}

impl Drop for AsyncPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            eprintln!("[LOGGER ERROR] Failed to stop pipeline '{}': {}", self.name, e);
        }
    }
}

struct FlushWorker {
    producer: Arc<Mutex<ProducerState>>,
    commands: Receiver<Command>,
    /// Sender side of `commands`, read only for its queue length
    queued: Sender<Command>,
    spare_tx: Sender<ByteArena>,
    spare_rx: Receiver<ByteArena>,
    sinks: SinkSet,
    flush_timeout: Duration,
    metrics: Arc<LoggerMetrics>,
}

impl FlushWorker {
    fn run(mut self) {
        loop {
            match self.commands.recv_timeout(self.flush_timeout) {
                Ok(Command::Drain(arena)) => self.drain(arena),
                Ok(Command::Oversized(bytes)) => self.write_batch(&bytes),
                Ok(Command::Flush(ack)) => {
                    self.flush_sinks();
                    let _ = ack.send(());
                }
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    self.flush_sinks();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => self.drain_idle(),
            }
        }
    }

    /// Periodic flush of a producer arena that never reached the threshold.
    fn drain_idle(&mut self) {
        let Some(mut producer) = self.producer.try_lock() else {
            return;
        };
        // A queued command holds earlier bytes; let it go first.
        if producer.arena.is_empty() || !self.queued.is_empty() {
            return;
        }
        let Ok(mut spare) = self.spare_rx.try_recv() else {
            return;
        };
        spare.swap_with(&mut producer.arena);
        drop(producer);
        self.drain(spare);
    }

    fn drain(&mut self, mut arena: ByteArena) {
        self.write_batch(arena.view_from_read());
        arena.reset();
        if self.spare_tx.send(arena).is_err() {
            eprintln!("[LOGGER WARNING] Spare arena channel closed");
        }
    }

    fn write_batch(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Err(e) = self.sinks.log(bytes) {
            error::fatal("async sink write", &e);
        }
        self.flush_sinks();
        self.metrics.record_batch();
    }

    fn flush_sinks(&mut self) {
        if let Err(e) = self.sinks.flush() {
            error::fatal("async sink flush", &e);
        }
    }
}
