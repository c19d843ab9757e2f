//! Pattern compilation and rendering
//!
//! A pattern such as `[%d{%H:%M:%S}][%p] %m%n` is compiled once into a list of
//! [`Step`]s. Rendering walks the steps in order and appends each one's output
//! to a caller-owned buffer, so the pattern author controls every separator.
//!
//! | Directive | Output |
//! |-----------|--------|
//! | `%d{fmt}` | local timestamp, strftime sub-format (default `%H:%M:%S`) |
//! | `%t`      | thread id |
//! | `%c`      | logger name |
//! | `%f`      | source file |
//! | `%l`      | source line |
//! | `%p`      | level |
//! | `%T`      | tab |
//! | `%m`      | message payload |
//! | `%n`      | newline |
//! | `%%`      | a literal `%` |

use super::error::{LoggerError, PatternError, Result};
use super::record::LogRecord;
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, TimeZone};
use std::cell::RefCell;
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

/// Pattern used when none is configured
pub const DEFAULT_PATTERN: &str = "[%d{%H:%M:%S}][%t][%c][%f:%l][%p]%T%m%n";

/// Sub-format used by a bare `%d`
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

static NEXT_TIME_STEP_ID: AtomicUsize = AtomicUsize::new(0);

struct TimeCache {
    step_id: usize,
    timestamp: i64,
    text: String,
}

thread_local! {
    static TIME_CACHE: RefCell<TimeCache> = const {
        RefCell::new(TimeCache {
            step_id: usize::MAX,
            timestamp: i64::MIN,
            text: String::new(),
        })
    };
    static THREAD_ID_CACHE: RefCell<Option<(ThreadId, String)>> = const { RefCell::new(None) };
}

/// One compiled unit of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Text between directives, `%%` already folded in
    Literal(String),
    Message,
    Level,
    Timestamp(TimeFormat),
    File,
    Line,
    ThreadId,
    LoggerName,
    Tab,
    NewLine,
}

/// A validated strftime sub-format for `%d`.
///
/// Each compiled timestamp step gets its own id so the per-thread render cache
/// never hands one format's text to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormat {
    format: String,
    id: usize,
}

impl TimeFormat {
    fn parse(format: &str) -> std::result::Result<Self, PatternError> {
        let format = if format.is_empty() {
            DEFAULT_TIME_FORMAT
        } else {
            format
        };
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(PatternError::InvalidTimeFormat {
                format: format.to_string(),
            });
        }
        Ok(Self {
            format: format.to_string(),
            id: NEXT_TIME_STEP_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.format
    }

    fn render(&self, timestamp: i64, out: &mut String) -> Result<()> {
        TIME_CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            if cache.step_id != self.id || cache.timestamp != timestamp {
                cache.text.clear();
                match Local.timestamp_opt(timestamp, 0).earliest() {
                    Some(datetime) => write!(cache.text, "{}", datetime.format(&self.format))
                        .map_err(|_| LoggerError::formatter("timestamp", "strftime failed"))?,
                    None => cache.text.push_str("InvalidTime"),
                }
                cache.step_id = self.id;
                cache.timestamp = timestamp;
            }
            out.push_str(&cache.text);
            Ok(())
        })
    }
}

fn render_thread_id(id: ThreadId, out: &mut String) {
    THREAD_ID_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        match cache.as_ref() {
            Some((cached, text)) if *cached == id => out.push_str(text),
            _ => {
                let text = thread_id_text(id);
                out.push_str(&text);
                if id == thread::current().id() {
                    *cache = Some((id, text));
                }
            }
        }
    })
}

fn thread_id_text(id: ThreadId) -> String {
    let debug = format!("{:?}", id);
    debug
        .strip_prefix("ThreadId(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::to_string)
        .unwrap_or(debug)
}

/// Compile `pattern` into its render steps.
///
/// Scans left to right. Literal runs (including `%%`) coalesce into a single
/// [`Step::Literal`]. A `{...}` right after a directive is that directive's
/// sub-argument; only `%d` uses it, the others accept and ignore it.
pub fn compile(pattern: &str) -> std::result::Result<Vec<Step>, PatternError> {
    let mut steps = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        if ch != '%' {
            literal.push(ch);
            continue;
        }

        let directive = match chars.next() {
            Some((_, directive)) => directive,
            None => return Err(PatternError::UnterminatedDirective { position }),
        };
        if directive == '%' {
            literal.push('%');
            continue;
        }
        if !matches!(directive, 'd' | 't' | 'c' | 'f' | 'l' | 'p' | 'T' | 'm' | 'n') {
            return Err(PatternError::UnknownDirective {
                directive,
                position,
            });
        }

        let mut subformat = String::new();
        if let Some(&(brace, '{')) = chars.peek() {
            chars.next();
            loop {
                match chars.next() {
                    Some((_, '}')) => break,
                    Some((_, c)) => subformat.push(c),
                    None => return Err(PatternError::UnterminatedSubformat { position: brace }),
                }
            }
        }

        let step = match directive {
            'd' => Step::Timestamp(TimeFormat::parse(&subformat)?),
            't' => Step::ThreadId,
            'c' => Step::LoggerName,
            'f' => Step::File,
            'l' => Step::Line,
            'p' => Step::Level,
            'T' => Step::Tab,
            'm' => Step::Message,
            _ => Step::NewLine,
        };

        if !literal.is_empty() {
            steps.push(Step::Literal(std::mem::take(&mut literal)));
        }
        steps.push(step);
    }

    if !literal.is_empty() {
        steps.push(Step::Literal(literal));
    }
    Ok(steps)
}

/// A compiled pattern, immutable once built.
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: String,
    steps: Vec<Step>,
}

impl PatternFormatter {
    /// Compile `pattern`; fails without producing a formatter on any error.
    pub fn new(pattern: &str) -> std::result::Result<Self, PatternError> {
        Ok(Self {
            pattern: pattern.to_string(),
            steps: compile(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Append the rendering of `record` to `out`.
    pub fn render(&self, record: &LogRecord, out: &mut String) -> Result<()> {
        for step in &self.steps {
            match step {
                Step::Literal(text) => out.push_str(text),
                Step::Message => out.push_str(&record.payload),
                Step::Level => out.push_str(record.level.to_str()),
                Step::Timestamp(format) => format.render(record.timestamp, out)?,
                Step::File => out.push_str(record.file),
                Step::Line => {
                    let _ = write!(out, "{}", record.line);
                }
                Step::ThreadId => render_thread_id(record.thread_id, out),
                Step::LoggerName => out.push_str(&record.logger_name),
                Step::Tab => out.push('\t'),
                Step::NewLine => out.push('\n'),
            }
        }
        Ok(())
    }

    /// Render into a fresh `String`.
    pub fn format(&self, record: &LogRecord) -> Result<String> {
        let mut out = String::with_capacity(128);
        self.render(record, &mut out)?;
        Ok(out)
    }
}
