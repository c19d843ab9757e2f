//! Error types for the logging engine

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Errors raised while compiling a pattern string.
///
/// Compilation is all-or-nothing: any of these aborts construction of the
/// formatter, so a partially compiled pipeline is never observable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// A `%` with nothing after it
    #[error("pattern ends with a bare '%' at byte {position}")]
    UnterminatedDirective { position: usize },

    /// A `%X` whose letter is not in the directive catalogue
    #[error("unknown directive '%{directive}' at byte {position}")]
    UnknownDirective { directive: char, position: usize },

    /// A `{` sub-argument that never closes
    #[error("sub-format opened at byte {position} has no closing '}}'")]
    UnterminatedSubformat { position: usize },

    /// A `%d{...}` sub-format chrono cannot render
    #[error("invalid time format '{format}'")]
    InvalidTimeFormat { format: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Pattern compilation failed
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Logger or pipeline already stopped
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Formatter error with format type
    #[error("Formatter error ({format_type}): {message}")]
    FormatterError {
        format_type: String,
        message: String,
    },

    /// Flush thread is gone
    #[error("Failed to hand batch to the flush thread")]
    ChannelSendError,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a formatter error
    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

/// Report an unrecoverable logging failure and abort the process.
///
/// Used where dropping output would hide the very failure the log exists to
/// record: sink I/O failures and misuse of a stopped pipeline.
pub(crate) fn fatal(context: &str, err: &LoggerError) -> ! {
    eprintln!("[LOGGER FATAL] {}: {}", context, err);
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("LoggerBuilder", "empty name");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::file_sink("/var/log/app.log", "Permission denied");
        assert!(matches!(err, LoggerError::FileSinkError { .. }));

        let err: LoggerError = PatternError::UnterminatedDirective { position: 0 }.into();
        assert!(matches!(err, LoggerError::Pattern(_)));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::file_rotation("/var/log/app.log", "Disk full");
        assert_eq!(
            err.to_string(),
            "File rotation failed for '/var/log/app.log': Disk full"
        );

        let err = LoggerError::formatter("payload", "Display impl failed");
        assert_eq!(
            err.to_string(),
            "Formatter error (payload): Display impl failed"
        );

        let err = PatternError::UnknownDirective {
            directive: 'q',
            position: 3,
        };
        assert_eq!(err.to_string(), "unknown directive '%q' at byte 3");

        let err = PatternError::UnterminatedSubformat { position: 2 };
        assert_eq!(
            err.to_string(),
            "sub-format opened at byte 2 has no closing '}'"
        );
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("opening log file", "cannot open for append", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("opening log file"));
        assert!(err.to_string().contains("cannot open for append"));
    }
}
