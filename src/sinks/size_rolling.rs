//! Size-rolled file sink

use super::rotation::{
    close_file, compress_pending, file_len, flush_writer, open_append, stamped_path, write_bytes,
};
use crate::core::{LoggerError, Result, Sink};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Rolls to a fresh `{basename}{stamp}-{n}.log` file before a write that would
/// push the current file past `max_bytes`.
///
/// The ceiling is per write: a file never grows past `max_bytes` unless a
/// single write is itself larger, in which case it lands alone in a fresh file.
/// Bytes already in a file the sink reopens count toward the ceiling.
///
/// # Examples
///
/// ```no_run
/// use zlog_engine::sinks::SizeRollingSink;
///
/// let sink = SizeRollingSink::new("./logs/roll-", 5 * 1024 * 1024)
///     .unwrap()
///     .with_compression(true);
/// ```
pub struct SizeRollingSink {
    basename: String,
    max_bytes: u64,
    compress: bool,
    writer: Option<BufWriter<File>>,
    current_path: PathBuf,
    current_size: u64,
    /// Disambiguates files opened within the same second
    name_count: u64,
    /// Rolled-away files waiting for the next flush to gzip them
    pending_gzip: Vec<PathBuf>,
}

impl SizeRollingSink {
    pub fn new(basename: impl Into<String>, max_bytes: u64) -> Result<Self> {
        if max_bytes == 0 {
            return Err(LoggerError::config("SizeRollingSink", "max_bytes must be positive"));
        }
        let basename = basename.into();
        let current_path = stamped_path(&basename, "-0");
        let writer = open_append(&current_path)?;
        let current_size = file_len(&writer, &current_path)?;
        Ok(Self {
            basename,
            max_bytes,
            compress: false,
            writer: Some(writer),
            current_path,
            current_size,
            name_count: 1,
            pending_gzip: Vec::new(),
        })
    }

    /// Gzip each file once it has been rolled away from.
    ///
    /// Compression runs on the next [`flush`](Sink::flush), not inside the
    /// write that triggered the roll.
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Bytes written to the current file
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn files_opened(&self) -> u64 {
        self.name_count
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Rolled files not yet compressed
    pub fn pending_compression(&self) -> &[PathBuf] {
        &self.pending_gzip
    }

    fn roll_over(&mut self) -> Result<()> {
        close_file(self.writer.take(), &self.current_path)?;
        let suffix = format!("-{}", self.name_count);
        self.name_count += 1;
        let rolled = std::mem::replace(&mut self.current_path, stamped_path(&self.basename, &suffix));
        if self.compress {
            self.pending_gzip.push(rolled);
        }
        let writer = open_append(&self.current_path).map_err(|e| {
            LoggerError::file_rotation(self.current_path.display().to_string(), e.to_string())
        })?;
        self.current_size = file_len(&writer, &self.current_path)?;
        self.writer = Some(writer);
        Ok(())
    }
}

impl Sink for SizeRollingSink {
    fn log(&mut self, bytes: &[u8]) -> Result<()> {
        let len = bytes.len() as u64;
        if self.current_size > 0 && self.current_size + len > self.max_bytes {
            self.roll_over()?;
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::file_sink(self.current_path.display().to_string(), "no open file"))?;
        write_bytes(writer, bytes, &self.current_path)?;
        self.current_size += len;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            flush_writer(writer, &self.current_path)?;
        }
        compress_pending(&mut self.pending_gzip)
    }

    fn name(&self) -> &str {
        "size_rolling"
    }
}

impl Drop for SizeRollingSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
