//! Main logger implementation

use super::{
    arena::DEFAULT_ARENA_CAPACITY,
    error::{self, LoggerError, Result},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    pattern::{PatternFormatter, DEFAULT_PATTERN},
    pipeline::{AsyncMode, AsyncPipeline, PipelineConfig},
    pool::{RecordPool, DEFAULT_SHARD_COUNT, DEFAULT_SLOTS_PER_SHARD},
    sink::{Sink, SinkSet},
};
use crate::sinks::ConsoleSink;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::fmt::{self, Write};
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound between periodic flushes of an async logger (3 seconds)
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

/// Per-thread working storage for one logging call
#[derive(Default)]
struct Scratch {
    /// Formatted user message, built before a pool slot is taken
    payload: String,
    /// Rendered output line
    rendered: String,
}

thread_local! {
    static SCRATCH: RefCell<Scratch> = const {
        RefCell::new(Scratch {
            payload: String::new(),
            rendered: String::new(),
        })
    };
}

/// How rendered bytes reach the sinks, fixed at construction.
enum Dispatcher {
    /// Written on the caller's thread under one lock, in registration order
    Sync(Mutex<SinkSet>),
    /// Pushed to a pipeline whose flush thread owns the sinks
    Async(AsyncPipeline),
}

impl Dispatcher {
    fn dispatch(&self, bytes: &[u8]) -> Result<()> {
        match self {
            Dispatcher::Sync(sinks) => sinks.lock().log(bytes),
            Dispatcher::Async(pipeline) => pipeline.push(bytes),
        }
    }

    fn flush(&self) -> Result<()> {
        match self {
            Dispatcher::Sync(sinks) => sinks.lock().flush(),
            Dispatcher::Async(pipeline) => pipeline.flush(),
        }
    }
}

/// A named logger with a fixed threshold, pattern and sink list.
///
/// Use the crate macros (`info!(logger, ...)`) so the call site is captured
/// and disabled levels never format their arguments.
///
/// # Example
///
/// ```
/// use zlog_engine::prelude::*;
///
/// let logger = Logger::builder("app")
///     .pattern("[%p] %m%n")
///     .min_level(LogLevel::Info)
///     .build()
///     .unwrap();
///
/// zlog_engine::info!(logger, "listening on port {}", 8080);
/// zlog_engine::debug!(logger, "never formatted");
/// ```
pub struct Logger {
    name: Arc<str>,
    threshold: LogLevel,
    formatter: PatternFormatter,
    pool: RecordPool,
    dispatcher: Dispatcher,
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn pattern(&self) -> &str {
        self.formatter.pattern()
    }

    pub fn is_async(&self) -> bool {
        matches!(self.dispatcher, Dispatcher::Async(_))
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.should_log(self.threshold)
    }

    /// Log one record, aborting the process if it cannot be written.
    #[inline]
    pub fn log(&self, level: LogLevel, file: &'static str, line: u32, args: fmt::Arguments<'_>) {
        if let Err(e) = self.try_log(level, file, line, args) {
            error::fatal(&format!("logger '{}'", self.name), &e);
        }
    }

    /// Fallible form of [`log`](Self::log).
    pub fn try_log(
        &self,
        level: LogLevel,
        file: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
    ) -> Result<()> {
        if !level.should_log(self.threshold) {
            self.metrics.record_filtered();
            return Ok(());
        }

        SCRATCH.with(|scratch| match scratch.try_borrow_mut() {
            Ok(mut scratch) => self.emit(level, file, line, args, &mut scratch),
            // Re-entered from a Display impl on this thread
            Err(_) => self.emit(level, file, line, args, &mut Scratch::default()),
        })
    }

    fn emit(
        &self,
        level: LogLevel,
        file: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
        scratch: &mut Scratch,
    ) -> Result<()> {
        let Scratch { payload, rendered } = scratch;

        // User Display code runs here, before any pool slot is held.
        payload.clear();
        match args.as_str() {
            Some(literal) => payload.push_str(literal),
            None => payload
                .write_fmt(args)
                .map_err(|_| LoggerError::formatter("payload", "a Display implementation failed"))?,
        }

        rendered.clear();
        {
            let shard = self.pool.shard_for(line);
            let record = self.pool.acquire(shard, level, file, line, payload.as_str(), &self.name);
            self.formatter.render(&record, rendered)?;
        }
        self.metrics.record_emitted(rendered.len());
        self.dispatcher.dispatch(rendered.as_bytes())
    }

    #[track_caller]
    fn log_at_caller(&self, level: LogLevel, message: &dyn fmt::Display) {
        if !self.enabled(level) {
            self.metrics.record_filtered();
            return;
        }
        let location = Location::caller();
        self.log(level, location.file(), location.line(), format_args!("{}", message));
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log_at_caller(LogLevel::Debug, &message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log_at_caller(LogLevel::Info, &message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log_at_caller(LogLevel::Warning, &message);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.log_at_caller(LogLevel::Error, &message);
    }

    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) {
        self.log_at_caller(LogLevel::Fatal, &message);
    }

    /// Emitted, filtered and pipeline counters for this logger
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Push buffered output through to the sinks.
    ///
    /// For an async logger this waits until the flush thread has written
    /// everything logged before the call.
    pub fn flush(&self) -> Result<()> {
        self.dispatcher.flush()
    }

    /// Drain and stop the flush thread of an async logger.
    ///
    /// Logging afterwards is a fatal error; `try_log` reports it as
    /// [`LoggerError::LoggerStopped`]. A no-op for sync loggers.
    pub fn shutdown(&self) -> Result<()> {
        match &self.dispatcher {
            Dispatcher::Sync(sinks) => sinks.lock().flush(),
            Dispatcher::Async(pipeline) => pipeline.stop(),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field("pattern", &self.formatter.pattern())
            .field("async", &self.is_async())
            .finish()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            eprintln!("[LOGGER ERROR] Failed to flush logger '{}' during shutdown: {}", self.name, e);
        }
    }
}

/// Builder for constructing a [`Logger`] with a fluent API
///
/// # Example
/// ```
/// use zlog_engine::prelude::*;
/// use std::time::Duration;
///
/// let logger = Logger::builder("worker")
///     .min_level(LogLevel::Warning)
///     .sink(ConsoleSink::new())
///     .async_mode(AsyncMode::Safe)
///     .flush_timeout(Duration::from_millis(500))
///     .build()
///     .unwrap();
/// assert!(logger.is_async());
/// ```
pub struct LoggerBuilder {
    name: String,
    pattern: String,
    min_level: LogLevel,
    sinks: Vec<Box<dyn Sink>>,
    async_mode: Option<AsyncMode>,
    flush_timeout: Duration,
    arena_capacity: usize,
    pool_shards: usize,
    pool_slots: usize,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            min_level: LogLevel::Debug,
            sinks: Vec::new(),
            async_mode: None,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            pool_shards: DEFAULT_SHARD_COUNT,
            pool_slots: DEFAULT_SLOTS_PER_SHARD,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Add a sink; sinks receive output in the order they are added
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Dispatch through an [`AsyncPipeline`] instead of on the caller's thread
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, mode: AsyncMode) -> Self {
        self.async_mode = Some(mode);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn arena_capacity(mut self, capacity: usize) -> Self {
        self.arena_capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn pool(mut self, shards: usize, slots_per_shard: usize) -> Self {
        self.pool_shards = shards;
        self.pool_slots = slots_per_shard;
        self
    }

    /// Validate the settings and build the logger.
    ///
    /// Fails on an empty name, a pattern that does not compile, or an empty
    /// pool or arena.
    pub fn build(self) -> Result<Logger> {
        if self.name.is_empty() {
            return Err(LoggerError::config("LoggerBuilder", "logger name must not be empty"));
        }
        let formatter = PatternFormatter::new(&self.pattern)?;
        let metrics = Arc::new(LoggerMetrics::new());
        let pool = RecordPool::new(self.pool_shards, self.pool_slots)?.with_metrics(Arc::clone(&metrics));

        let mut sinks = self.sinks;
        if sinks.is_empty() {
            sinks.push(Box::new(ConsoleSink::new()));
        }
        let sinks = SinkSet::new(sinks);

        let dispatcher = match self.async_mode {
            None => Dispatcher::Sync(Mutex::new(sinks)),
            Some(mode) => {
                let config = PipelineConfig {
                    name: self.name.clone(),
                    capacity: self.arena_capacity,
                    mode,
                    flush_timeout: self.flush_timeout,
                };
                Dispatcher::Async(AsyncPipeline::new(config, sinks, Arc::clone(&metrics))?)
            }
        };

        Ok(Logger {
            name: Arc::from(self.name),
            threshold: self.min_level,
            formatter,
            pool,
            dispatcher,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

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

    struct Broken;

    impl Sink for Broken {
        fn log(&mut self, _bytes: &[u8]) -> Result<()> {
            Err(LoggerError::file_sink("broken", "disk gone"))
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        assert!(matches!(
            Logger::builder("").build(),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_bad_pattern() {
        assert!(matches!(
            Logger::builder("x").pattern("%q").build(),
            Err(LoggerError::Pattern(_))
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let logger = Logger::builder("defaults").build().unwrap();
        assert_eq!(logger.name(), "defaults");
        assert_eq!(logger.threshold(), LogLevel::Debug);
        assert_eq!(logger.pattern(), DEFAULT_PATTERN);
        assert!(!logger.is_async());
    }

    #[test]
    fn test_sync_logger_renders_pattern() {
        let capture = Capture::default();
        let logger = Logger::builder("svc")
            .pattern("%c|%p|%m%n")
            .sink(capture.clone())
            .build()
            .unwrap();
        logger.log(LogLevel::Info, file!(), line!(), format_args!("v={}", 3));
        assert_eq!(capture.text(), "svc|INFO|v=3\n");
        assert_eq!(logger.metrics().records_emitted(), 1);
        assert_eq!(logger.metrics().bytes_dispatched(), 13);
    }

    #[test]
    fn test_threshold_filters_before_formatting() {
        struct Exploding;
        impl fmt::Display for Exploding {
            fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("formatted a filtered record");
            }
        }

        let capture = Capture::default();
        let logger = Logger::builder("quiet")
            .min_level(LogLevel::Warning)
            .sink(capture.clone())
            .build()
            .unwrap();
        logger.log(LogLevel::Info, file!(), line!(), format_args!("{}", Exploding));
        assert_eq!(capture.text(), "");
        assert_eq!(logger.metrics().records_filtered(), 1);
    }

    #[test]
    fn test_try_log_surfaces_sink_failure() {
        let logger = Logger::builder("broken").sink(Broken).build().unwrap();
        let result = logger.try_log(LogLevel::Error, file!(), line!(), format_args!("x"));
        assert!(matches!(result, Err(LoggerError::FileSinkError { .. })));
    }

    #[test]
    fn test_sinks_receive_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        struct Tagged(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl Sink for Tagged {
            fn log(&mut self, _bytes: &[u8]) -> Result<()> {
                self.1.lock().push(self.0);
                Ok(())
            }
            fn flush(&mut self) -> Result<()> {
                Ok(())
            }
            fn name(&self) -> &str {
                self.0
            }
        }

        let logger = Logger::builder("ordered")
            .sink(Tagged("first", Arc::clone(&order)))
            .sink(Tagged("second", Arc::clone(&order)))
            .build()
            .unwrap();
        logger.info("go");
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_async_logger_flush_and_shutdown() {
        let capture = Capture::default();
        let logger = Logger::builder("async")
            .pattern("%m%n")
            .sink(capture.clone())
            .async_mode(AsyncMode::Safe)
            .arena_capacity(64)
            .flush_timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        for i in 0..50 {
            logger.log(LogLevel::Info, file!(), line!(), format_args!("{}", i));
        }
        logger.flush().unwrap();
        let expected: String = (0..50).map(|i| format!("{}\n", i)).collect();
        assert_eq!(capture.text(), expected);

        logger.shutdown().unwrap();
        let late = logger.try_log(LogLevel::Info, file!(), line!(), format_args!("late"));
        assert!(matches!(late, Err(LoggerError::LoggerStopped)));
    }

    #[test]
    fn test_convenience_methods_capture_caller() {
        let capture = Capture::default();
        let logger = Logger::builder("loc")
            .pattern("%f:%p:%m%n")
            .sink(capture.clone())
            .build()
            .unwrap();
        logger.warn("careful");
        assert_eq!(capture.text(), format!("{}:WARNING:careful\n", file!()));
    }

    #[test]
    fn test_reentrant_logging_from_display() {
        struct Nested<'a>(&'a Logger);
        impl fmt::Display for Nested<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.log(LogLevel::Debug, "inner.rs", 1, format_args!("inner"));
                f.write_str("outer")
            }
        }

        let capture = Capture::default();
        let logger = Logger::builder("nest")
            .pattern("%m%n")
            .sink(capture.clone())
            .build()
            .unwrap();
        logger.log(LogLevel::Info, "outer.rs", 2, format_args!("{}", Nested(&logger)));
        assert_eq!(capture.text(), "inner\nouter\n");
    }

    #[test]
    fn test_reentrant_logging_with_single_slot_pool() {
        struct Nested<'a>(&'a Logger);
        impl fmt::Display for Nested<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.log(LogLevel::Info, "inner.rs", 1, format_args!("inner"));
                f.write_str("outer")
            }
        }

        let capture = Capture::default();
        let sink = capture.clone();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let worker = std::thread::spawn(move || {
            let logger = Logger::builder("single")
                .pattern("%m%n")
                .sink(sink)
                .pool(1, 1)
                .build()
                .unwrap();
            logger.log(LogLevel::Info, "outer.rs", 2, format_args!("{}", Nested(&logger)));
            logger.log(LogLevel::Info, "outer.rs", 3, format_args!("{}", Nested(&logger)));
            done_tx.send(logger.metrics().pool_waits()).unwrap();
        });

        let pool_waits = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("nested log call never finished");
        worker.join().unwrap();
        assert_eq!(capture.text(), "inner\nouter\ninner\nouter\n");
        assert_eq!(pool_waits, 0);
    }
}
