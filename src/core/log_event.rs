//! The immutable structured event produced for every accepted write

use super::caller::CallerLocation;
use super::captured_error::CapturedError;
use super::log_level::Level;
use super::properties::{FieldValue, Properties};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::sync::Arc;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// A normalized log event
///
/// Built once per write by the [`EventAssembler`](super::EventAssembler) and
/// never modified afterwards; backends and observers only get shared access.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    level: Arc<Level>,
    message: String,
    timestamp: DateTime<Utc>,
    logger_name: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<CallerLocation>,
    properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<CapturedError>,
    thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_name: Option<String>,
}

impl LogEvent {
    pub(crate) fn new(
        logger_name: Arc<str>,
        level: Arc<Level>,
        message: String,
        location: Option<CallerLocation>,
        properties: Properties,
        error: Option<CapturedError>,
    ) -> Self {
        Self {
            level,
            message,
            timestamp: Utc::now(),
            logger_name,
            location,
            properties,
            error,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
        }
    }

    pub fn level(&self) -> &Arc<Level> {
        &self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Name of the listener that produced the event
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn location(&self) -> Option<&CallerLocation> {
        self.location.as_ref()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&FieldValue> {
        self.properties.get(key)
    }

    /// The error this event was written from, if any
    pub fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty JSON string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
