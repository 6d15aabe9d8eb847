//! Backend trait for finished log events

use super::{error::Result, log_event::LogEvent};
use std::sync::Arc;

/// Destination that persists or ships finished events
///
/// Called from whichever thread wrote, so implementations synchronize
/// internally. Errors and panics are contained by the listener.
pub trait Backend: Send + Sync {
    fn log(&self, event: &LogEvent) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn log(&self, event: &LogEvent) -> Result<()> {
        (**self).log(event)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
