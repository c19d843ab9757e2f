//! Name to logger registry
//!
//! A registry always holds a `"root"` logger with default configuration.
//! Registration is register-if-absent: the first logger under a name wins and
//! later attempts get the resident one back.

use super::error::Result;
use super::logger::Logger;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub const ROOT_LOGGER_NAME: &str = "root";

pub struct LoggerRegistry {
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
    root: Arc<Logger>,
}

impl LoggerRegistry {
    /// Create a registry holding only the default root logger.
    pub fn new() -> Result<Self> {
        let root = Arc::new(Logger::builder(ROOT_LOGGER_NAME).build()?);
        Ok(Self::with_root(root))
    }

    /// Create a registry around a caller-built root logger.
    pub fn with_root(root: Arc<Logger>) -> Self {
        let mut loggers = HashMap::new();
        loggers.insert(ROOT_LOGGER_NAME.to_string(), Arc::clone(&root));
        Self {
            loggers: RwLock::new(loggers),
            root,
        }
    }

    pub fn root(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    /// Insert `logger` unless its name is taken; returns the resident logger.
    pub fn register(&self, logger: Logger) -> Arc<Logger> {
        if let Some(existing) = self.get(logger.name()) {
            return existing;
        }
        let mut loggers = self.loggers.write();
        Arc::clone(
            loggers
                .entry(logger.name().to_string())
                .or_insert_with(|| Arc::new(logger)),
        )
    }

    pub fn get(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers.read().get(name).cloned()
    }

    /// The logger registered as `name`, or root if there is none
    pub fn get_or_root(&self, name: &str) -> Arc<Logger> {
        self.get(name).unwrap_or_else(|| self.root())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loggers.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.loggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove `name`; the root logger stays.
    pub fn remove(&self, name: &str) -> Option<Arc<Logger>> {
        if name == ROOT_LOGGER_NAME {
            return None;
        }
        self.loggers.write().remove(name)
    }

    /// Drop every logger except root.
    pub fn clear(&self) {
        self.loggers.write().retain(|name, _| name == ROOT_LOGGER_NAME);
    }
}

static GLOBAL: OnceLock<LoggerRegistry> = OnceLock::new();

/// The process-wide registry, created on first access.
pub fn global() -> &'static LoggerRegistry {
    GLOBAL.get_or_init(|| {
        let root = Logger::builder(ROOT_LOGGER_NAME).build().unwrap_or_else(|e| {
            super::error::fatal("building root logger", &e)
        });
        LoggerRegistry::with_root(Arc::new(root))
    })
}
