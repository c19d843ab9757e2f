//! Declarative logger configuration
//!
//! A [`LoggerConfig`] deserializes from JSON (or anything serde reads) and
//! builds through [`LoggerBuilder`], so both paths apply the same validation.
//!
//! ```json
//! {
//!   "name": "api",
//!   "level": "info",
//!   "kind": "async",
//!   "mode": "safe",
//!   "flush_timeout_ms": 1000,
//!   "sinks": [
//!     { "type": "console" },
//!     { "type": "size_rolling", "basename": "./logs/api-", "max_bytes": 1048576, "compress": true },
//!     { "type": "time_rolling", "basename": "./logs/api-hourly-", "gap": "hour" }
//!   ]
//! }
//! ```

use super::error::Result;
use super::log_level::LogLevel;
use super::logger::{Logger, LoggerBuilder, DEFAULT_FLUSH_TIMEOUT};
use super::pattern::DEFAULT_PATTERN;
use super::pipeline::AsyncMode;
use super::sink::Sink;
use crate::sinks::{ConsoleSink, FileSink, SizeRollingSink, TimeGap, TimeRollingSink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whether a logger writes on the caller's thread or through a flush thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggerKind {
    #[default]
    Sync,
    Async,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum SinkConfig {
    Console,
    File {
        path: PathBuf,
    },
    SizeRolling {
        basename: String,
        max_bytes: u64,
        #[serde(default)]
        compress: bool,
    },
    TimeRolling {
        basename: String,
        gap: TimeGap,
        #[serde(default)]
        compress: bool,
    },
}

impl SinkConfig {
    /// Open the described sink.
    pub fn build(&self) -> Result<Box<dyn Sink>> {
        let sink: Box<dyn Sink> = match self {
            SinkConfig::Console => Box::new(ConsoleSink::new()),
            SinkConfig::File { path } => Box::new(FileSink::new(path)?),
            SinkConfig::SizeRolling {
                basename,
                max_bytes,
                compress,
            } => Box::new(SizeRollingSink::new(basename.clone(), *max_bytes)?.with_compression(*compress)),
            SinkConfig::TimeRolling {
                basename,
                gap,
                compress,
            } => Box::new(TimeRollingSink::new(basename.clone(), *gap)?.with_compression(*compress)),
        };
        Ok(sink)
    }
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_flush_timeout_ms() -> u64 {
    DEFAULT_FLUSH_TIMEOUT.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    pub name: String,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub kind: LoggerKind,
    /// Only read for async loggers
    #[serde(default)]
    pub mode: AsyncMode,
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arena_capacity: Option<usize>,
    /// Empty means one console sink
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: default_pattern(),
            level: LogLevel::default(),
            kind: LoggerKind::default(),
            mode: AsyncMode::default(),
            flush_timeout_ms: default_flush_timeout_ms(),
            arena_capacity: None,
            sinks: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Open every sink and build the logger.
    pub fn build(&self) -> Result<Logger> {
        let mut builder = LoggerBuilder::new(self.name.clone())
            .pattern(self.pattern.clone())
            .min_level(self.level);
        for sink in &self.sinks {
            builder = builder.boxed_sink(sink.build()?);
        }
        if self.kind == LoggerKind::Async {
            builder = builder
                .async_mode(self.mode)
                .flush_timeout(Duration::from_millis(self.flush_timeout_ms));
            if let Some(capacity) = self.arena_capacity {
                builder = builder.arena_capacity(capacity);
            }
        }
        builder.build()
    }
}
