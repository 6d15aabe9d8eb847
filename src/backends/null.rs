//! Backend that drops every event

use crate::core::{Backend, LogEvent, Result};

/// Drops all events
///
/// Used when a listener is built without a backend, and for measuring the
/// cost of normalization without any output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        NullBackend
    }
}

impl Backend for NullBackend {
    fn log(&self, _event: &LogEvent) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
