//! Core engine types

pub mod arena;
pub mod config;
pub mod error;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod pattern;
pub mod pipeline;
pub mod pool;
pub mod record;
pub mod registry;
pub mod sink;

pub use arena::{ArenaMode, ByteArena, DEFAULT_ARENA_CAPACITY};
pub use config::{LoggerConfig, LoggerKind, SinkConfig};
pub use error::{LoggerError, PatternError, Result};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, DEFAULT_FLUSH_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use pattern::{PatternFormatter, Step, DEFAULT_PATTERN};
pub use pipeline::{AsyncMode, AsyncPipeline, PipelineConfig};
pub use pool::{PooledRecord, RecordHandle, RecordPool};
pub use record::LogRecord;
pub use registry::{LoggerRegistry, ROOT_LOGGER_NAME};
pub use sink::{Sink, SinkSet};
