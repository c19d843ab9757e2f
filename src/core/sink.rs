//! Sink trait for log output destinations

use super::error::Result;

/// A destination for rendered log bytes.
///
/// A sink is only ever driven by one actor at a time (the sync logger's
/// dispatch lock holder, or an async logger's flush thread), so rotation state
/// lives in plain fields without a lock of its own.
pub trait Sink: Send {
    fn log(&mut self, bytes: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

/// Sinks of one logger, written in registration order.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn Sink>>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.sinks.iter().map(|sink| sink.name().to_string()).collect()
    }

    /// Hand `bytes` to every sink, stopping at the first failure.
    pub fn log(&mut self, bytes: &[u8]) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.log(bytes)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}
