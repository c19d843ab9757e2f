//! File plumbing shared by the file-backed sinks

use crate::core::error::{LoggerError, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Timestamp layout used in rolled file names
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Create the parent directory of `path` if it is missing.
pub(crate) fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }
    Ok(())
}

/// Open `path` for appending, creating it and its directory as needed.
pub(crate) fn open_append(path: &Path) -> Result<BufWriter<File>> {
    create_parent_dir(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
        })?;
    Ok(BufWriter::new(file))
}

pub(crate) fn write_bytes(writer: &mut BufWriter<File>, bytes: &[u8], path: &Path) -> Result<()> {
    writer.write_all(bytes).map_err(|e| {
        LoggerError::file_sink(
            path.display().to_string(),
            format!("Failed to write log bytes: {}", e),
        )
    })
}

pub(crate) fn flush_writer(writer: &mut BufWriter<File>, path: &Path) -> Result<()> {
    writer.flush().map_err(|e| {
        LoggerError::file_sink(path.display().to_string(), format!("Failed to flush: {}", e))
    })
}

/// `{basename}{YYYYmmddHHMMSS}{suffix}.log`, stamped with the current local time
pub(crate) fn stamped_path(basename: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}{}{}.log",
        basename,
        Local::now().format(FILE_STAMP_FORMAT),
        suffix
    ))
}

/// Length of the file behind `writer`, including anything a previous run left there.
pub(crate) fn file_len(writer: &BufWriter<File>, path: &Path) -> Result<u64> {
    writer.get_ref().metadata().map(|m| m.len()).map_err(|e| {
        LoggerError::file_sink(path.display().to_string(), format!("Failed to stat: {}", e))
    })
}

/// Flush and close the current file.
pub(crate) fn close_file(writer: Option<BufWriter<File>>, path: &Path) -> Result<()> {
    if let Some(mut writer) = writer {
        writer.flush().map_err(|e| {
            LoggerError::file_rotation(
                path.display().to_string(),
                format!("Failed to flush before rotation: {}", e),
            )
        })?;
    }
    Ok(())
}

/// Gzip every rolled-away file queued in `pending`.
///
/// A file that fails stays queued for the next attempt.
pub(crate) fn compress_pending(pending: &mut Vec<PathBuf>) -> Result<()> {
    while let Some(path) = pending.pop() {
        if let Err(e) = compress_file(&path) {
            pending.push(path);
            return Err(e);
        }
    }
    Ok(())
}

/// Gzip `path` into `path.gz`, going through `path.gz.tmp` so a partial
/// archive is never visible. The plain file is removed last.
pub(crate) fn compress_file(path: &Path) -> Result<PathBuf> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    let tmp_path = PathBuf::from(format!("{}.gz.tmp", path.display()));

    let written = File::open(path).and_then(|mut input| {
        let output = BufWriter::new(File::create(&tmp_path)?);
        let mut encoder = GzEncoder::new(output, Compression::default());
        io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&tmp_path, &gz_path)
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(LoggerError::file_rotation(
            path.display().to_string(),
            format!("Failed to compress: {}", e),
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but could not remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(gz_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_open_append_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c.log");
        let mut writer = open_append(&path).unwrap();
        write_bytes(&mut writer, b"line\n", &path).unwrap();
        flush_writer(&mut writer, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "line\n");
    }

    #[test]
    fn test_stamped_path_layout() {
        let path = stamped_path("logs/roll-", "-3");
        let name = path.to_string_lossy().to_string();
        assert!(name.starts_with("logs/roll-"));
        assert!(name.ends_with("-3.log"));
        // 14 stamp digits between prefix and suffix
        assert_eq!(name.len(), "logs/roll-".len() + 14 + "-3.log".len());
    }

    #[test]
    fn test_compress_file_replaces_original() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.log");
        fs::write(&path, "compress me\n".repeat(100)).unwrap();

        let gz = compress_file(&path).unwrap();
        assert!(!path.exists());
        assert!(gz.exists());

        let mut text = String::new();
        GzDecoder::new(File::open(&gz).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "compress me\n".repeat(100));
    }

    #[test]
    fn test_compress_pending_keeps_failed_paths() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.log");
        let missing = dir.path().join("missing.log");
        fs::write(&present, "x\n").unwrap();

        let mut pending = vec![missing.clone(), present.clone()];
        assert!(compress_pending(&mut pending).is_err());
        assert_eq!(pending, vec![missing]);
        assert!(dir.path().join("present.log.gz").exists());
        assert!(!dir.path().join("missing.log.gz.tmp").exists());
    }

    #[test]
    fn test_file_len_sees_existing_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grow.log");
        fs::write(&path, [b'a'; 12]).unwrap();
        let mut writer = open_append(&path).unwrap();
        assert_eq!(file_len(&writer, &path).unwrap(), 12);
        write_bytes(&mut writer, b"bc", &path).unwrap();
        flush_writer(&mut writer, &path).unwrap();
        assert_eq!(file_len(&writer, &path).unwrap(), 14);
    }
}
