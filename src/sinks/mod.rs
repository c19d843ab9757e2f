//! Sink implementations

pub mod console;
pub mod file;
pub mod rotation;
pub mod size_rolling;
pub mod time_rolling;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use size_rolling::SizeRollingSink;
pub use time_rolling::{TimeGap, TimeRollingSink};

pub use crate::core::Sink;
