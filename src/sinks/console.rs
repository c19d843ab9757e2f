//! Console sink implementation

use crate::core::{LoggerError, Result, Sink};
use std::io::Write;

/// Writes rendered bytes verbatim to standard output.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for ConsoleSink {
    fn log(&mut self, bytes: &[u8]) -> Result<()> {
        std::io::stdout()
            .lock()
            .write_all(bytes)
            .map_err(|e| LoggerError::io_operation("writing to stdout", "console write failed", e))
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
