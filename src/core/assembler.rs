//! Event assembly
//!
//! Merges a message, an optional captured error and projected properties into
//! one [`LogEvent`]. This is the single place where `off` writes are dropped.

use super::caller::{CallerCapture, CallerResolver};
use super::captured_error::CapturedError;
use super::log_event::LogEvent;
use super::log_level::Level;
use super::properties::Properties;
use std::panic::Location;
use std::sync::Arc;

/// Property key for the crate that defined the error type
pub const SOURCE_KEY: &str = "Source";
/// Property key for the function that raised the error
pub const METHOD_KEY: &str = "Method";
/// Property key for the wrapped error chain
pub const INNER_ERROR_KEY: &str = "InnerException";

#[derive(Debug, Clone)]
pub struct EventAssembler {
    logger_name: Arc<str>,
    resolver: CallerResolver,
}

impl EventAssembler {
    pub fn new(logger_name: impl Into<Arc<str>>, resolver: CallerResolver) -> Self {
        Self {
            logger_name: logger_name.into(),
            resolver,
        }
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn resolver(&self) -> &CallerResolver {
        &self.resolver
    }

    /// Build the event for one write, or `None` when the level is `off`
    ///
    /// With an error attached, the location comes from the error's throw site
    /// and the error metadata is added to the properties; an empty `message`
    /// falls back to the error's own message. Without one, the location is
    /// resolved from `call_site`.
    pub fn assemble(
        &self,
        level: Arc<Level>,
        message: String,
        error: Option<CapturedError>,
        mut properties: Properties,
        call_site: &'static Location<'static>,
    ) -> Option<LogEvent> {
        if level.is_off() {
            return None;
        }

        let (message, location) = match &error {
            Some(err) => {
                if let Some(source) = err.source_name() {
                    properties.insert(SOURCE_KEY, source);
                }
                if let Some(method) = err.method() {
                    properties.insert(METHOD_KEY, method);
                }
                if let Some(inner) = err.inner() {
                    properties.insert(INNER_ERROR_KEY, inner);
                }

                let message = if message.is_empty() {
                    err.message().to_string()
                } else {
                    message
                };
                let location = match self.resolver.capture() {
                    CallerCapture::Disabled => None,
                    _ => err.throw_site().cloned(),
                };
                (message, location)
            }
            None => (message, self.resolver.resolve(call_site)),
        };

        Some(LogEvent::new(
            Arc::clone(&self.logger_name),
            level,
            message,
            location,
            properties,
            error,
        ))
    }
}
