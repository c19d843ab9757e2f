//! Log record snapshot

use super::log_level::LogLevel;
use chrono::Utc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// One log event, captured at the call site and consumed once by the formatter.
///
/// Records handed out by [`RecordPool`](super::pool::RecordPool) are physically
/// reused, but each one logically lives for exactly one logging call.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Unix time in whole seconds
    pub timestamp: i64,
    pub level: LogLevel,
    pub file: &'static str,
    pub line: u32,
    pub thread_id: ThreadId,
    pub payload: String,
    pub logger_name: Arc<str>,
}

impl LogRecord {
    pub fn new(
        level: LogLevel,
        file: &'static str,
        line: u32,
        payload: impl Into<String>,
        logger_name: Arc<str>,
    ) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            level,
            file,
            line,
            thread_id: thread::current().id(),
            payload: payload.into(),
            logger_name,
        }
    }

    /// Blank storage for a pool slot.
    pub(crate) fn vacant() -> Self {
        Self {
            timestamp: 0,
            level: LogLevel::Unknown,
            file: "",
            line: 0,
            thread_id: thread::current().id(),
            payload: String::new(),
            logger_name: Arc::from(""),
        }
    }

    /// Overwrite every field in place, keeping the payload allocation.
    pub(crate) fn fill(
        &mut self,
        level: LogLevel,
        file: &'static str,
        line: u32,
        payload: &str,
        logger_name: &Arc<str>,
    ) {
        self.timestamp = Utc::now().timestamp();
        self.level = level;
        self.file = file;
        self.line = line;
        self.thread_id = thread::current().id();
        if !Arc::ptr_eq(&self.logger_name, logger_name) {
            self.logger_name = Arc::clone(logger_name);
        }
        self.payload.clear();
        self.payload.push_str(payload);
    }

    /// Drop per-call contents so nothing outlives the call.
    pub(crate) fn clear(&mut self) {
        self.payload.clear();
        self.file = "";
        self.line = 0;
    }
}
