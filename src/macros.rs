//! Call-site logging macros
//!
//! Each macro captures `file!()` and `line!()` and hands `format_args!` to
//! [`Logger::log`](crate::Logger::log), so a record below the threshold costs
//! one comparison and its arguments are never formatted.
//!
//! # Examples
//!
//! ```
//! use zlog_engine::prelude::*;
//! use zlog_engine::info;
//!
//! let logger = Logger::builder("server").build().unwrap();
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log at an explicit level.
///
/// # Examples
///
/// ```
/// # use zlog_engine::prelude::*;
/// # let logger = Logger::builder("doc").build().unwrap();
/// use zlog_engine::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, file!(), line!(), format_args!($($arg)+))
    };
}

/// Log a debug-level message.
///
/// ```
/// # use zlog_engine::prelude::*;
/// # let logger = Logger::builder("doc").build().unwrap();
/// use zlog_engine::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
///
/// ```
/// # use zlog_engine::prelude::*;
/// # let logger = Logger::builder("doc").build().unwrap();
/// use zlog_engine::error;
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message. Does not terminate the process.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
