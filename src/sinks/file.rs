//! Plain file sink implementation

use super::rotation::{flush_writer, open_append, write_bytes};
use crate::core::{Result, Sink};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Appends to a single fixed path, creating its directory on construction.
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = open_append(&path)?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn log(&mut self, bytes: &[u8]) -> Result<()> {
        write_bytes(&mut self.writer, bytes, &self.path)
    }

    fn flush(&mut self) -> Result<()> {
        flush_writer(&mut self.writer, &self.path)
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_creates_directory_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/app.log");

        let mut sink = FileSink::new(&path).unwrap();
        sink.log(b"first\n").unwrap();
        sink.log(b"second\n").unwrap();
        sink.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        drop(sink);

        let mut reopened = FileSink::new(&path).unwrap();
        reopened.log(b"third\n").unwrap();
        drop(reopened);
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\nthird\n");
    }
}
