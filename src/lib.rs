//! # zlog_engine
//!
//! A structured logging engine: patterns compile once into render steps,
//! records come from a sharded pool, and rendered bytes go to sinks either on
//! the caller's thread or through a double-buffered flush thread.
//!
//! ## Features
//!
//! - **Compiled patterns**: `%d{fmt} %t %c %f %l %p %T %m %n %%`, validated up front
//! - **Sync or async**: async loggers batch into arenas with SAFE (blocking) or
//!   UNSAFE (growing) backpressure
//! - **Rolling files**: size- and time-based rotation with optional gzip
//! - **Registry**: named loggers with an always-present `root`
//!
//! ```
//! use zlog_engine::prelude::*;
//! use zlog_engine::{info, warn};
//!
//! let logger = Logger::builder("app").pattern("[%p] %m%n").build().unwrap();
//! info!(logger, "started in {} ms", 12);
//! warn!(logger, "cache cold");
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AsyncMode, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics,
        LoggerRegistry, Result, Sink, SinkConfig,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, SizeRollingSink, TimeGap, TimeRollingSink};
}

pub use crate::core::registry::global;
pub use crate::core::{
    AsyncMode, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerConfig, LoggerError,
    LoggerMetrics, LoggerRegistry, PatternError, PatternFormatter, Result, Sink, SinkConfig,
    DEFAULT_FLUSH_TIMEOUT, DEFAULT_PATTERN,
};
pub use sinks::{ConsoleSink, FileSink, SizeRollingSink, TimeGap, TimeRollingSink};
