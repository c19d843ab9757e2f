//! Time-rolled file sink

use super::rotation::{
    close_file, compress_pending, flush_writer, open_append, stamped_path, write_bytes,
};
use crate::core::{LoggerError, Result, Sink};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Length of one time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGap {
    Second,
    Minute,
    Hour,
    Day,
    /// Arbitrary bucket length in seconds
    Custom(u64),
}

impl TimeGap {
    pub fn seconds(&self) -> u64 {
        match self {
            TimeGap::Second => 1,
            TimeGap::Minute => 60,
            TimeGap::Hour => 3600,
            TimeGap::Day => 24 * 3600,
            TimeGap::Custom(secs) => *secs,
        }
    }
}

/// Rolls to a fresh `{basename}{stamp}.log` whenever `now / gap` changes.
pub struct TimeRollingSink {
    basename: String,
    gap_seconds: i64,
    bucket: i64,
    compress: bool,
    writer: Option<BufWriter<File>>,
    current_path: PathBuf,
    files_opened: u64,
    /// Rolled-away files waiting for the next flush to gzip them
    pending_gzip: Vec<PathBuf>,
}

impl TimeRollingSink {
    pub fn new(basename: impl Into<String>, gap: TimeGap) -> Result<Self> {
        let gap_seconds = i64::try_from(gap.seconds())
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| LoggerError::config("TimeRollingSink", "gap must be a positive number of seconds"))?;
        let basename = basename.into();
        let bucket = Utc::now().timestamp() / gap_seconds;
        let current_path = stamped_path(&basename, "");
        let writer = open_append(&current_path)?;
        Ok(Self {
            basename,
            gap_seconds,
            bucket,
            compress: false,
            writer: Some(writer),
            current_path,
            files_opened: 1,
            pending_gzip: Vec::new(),
        })
    }

    /// Gzip each file once it has been rolled away from.
    ///
    /// Compression runs on the next [`flush`](Sink::flush).
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    pub fn files_opened(&self) -> u64 {
        self.files_opened
    }

    pub fn gap_seconds(&self) -> u64 {
        self.gap_seconds as u64
    }

    /// Rolled files not yet compressed
    pub fn pending_compression(&self) -> &[PathBuf] {
        &self.pending_gzip
    }

    fn roll_over(&mut self, bucket: i64) -> Result<()> {
        close_file(self.writer.take(), &self.current_path)?;
        let rolled = std::mem::replace(&mut self.current_path, stamped_path(&self.basename, ""));
        if self.compress {
            self.pending_gzip.push(rolled);
        }
        self.writer = Some(open_append(&self.current_path).map_err(|e| {
            LoggerError::file_rotation(self.current_path.display().to_string(), e.to_string())
        })?);
        self.bucket = bucket;
        self.files_opened += 1;
        Ok(())
    }
}

impl Sink for TimeRollingSink {
    fn log(&mut self, bytes: &[u8]) -> Result<()> {
        let bucket = Utc::now().timestamp() / self.gap_seconds;
        if bucket != self.bucket {
            self.roll_over(bucket)?;
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::file_sink(self.current_path.display().to_string(), "no open file"))?;
        write_bytes(writer, bytes, &self.current_path)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            flush_writer(writer, &self.current_path)?;
        }
        compress_pending(&mut self.pending_gzip)
    }

    fn name(&self) -> &str {
        "time_rolling"
    }
}

impl Drop for TimeRollingSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
