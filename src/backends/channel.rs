//! Backend that hands events to another thread over a channel

use crate::core::{Backend, LogEvent, LoggerError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

/// Sends a clone of every event to a crossbeam channel
///
/// The consumer owns the [`Receiver`] and decides how events are persisted
/// or shipped. A bounded channel never blocks the writer: when it is full
/// the event is rejected with [`LoggerError::BackendForward`].
///
/// # Example
///
/// ```
/// use trace_bridge::prelude::*;
///
/// let (backend, events) = ChannelBackend::unbounded();
/// let listener = TraceListener::builder().backend(backend).build();
/// listener.write("hello");
///
/// let received: Vec<String> = events.try_iter().map(|e| e.message().to_string()).collect();
/// assert_eq!(received, vec!["Log initialized", "hello"]);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelBackend {
    sender: Sender<LogEvent>,
}

impl ChannelBackend {
    pub fn unbounded() -> (Self, Receiver<LogEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    pub fn bounded(capacity: usize) -> (Self, Receiver<LogEvent>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: Sender<LogEvent>) -> Self {
        Self { sender }
    }

    /// Events queued and not yet received
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

impl Backend for ChannelBackend {
    fn log(&self, event: &LogEvent) -> Result<()> {
        match self.sender.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(LoggerError::backend(
                self.name(),
                format!("channel full ({} pending)", self.sender.len()),
            )),
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::ChannelSendError),
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}
