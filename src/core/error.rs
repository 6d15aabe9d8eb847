//! Error types for the trace bridge
//!
//! None of these errors ever reach the code that writes through a
//! [`TraceListener`](super::TraceListener); they are raised and recovered
//! inside the engine, or returned from configuration and registration calls.

pub type Result<T> = std::result::Result<T, LoggerError>;

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

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The projected value exposes no readable fields
    #[error("Unsupported shape '{type_name}': {message}")]
    UnsupportedShape { type_name: String, message: String },

    /// The backend rejected an event
    #[error("Backend '{backend}' failed to log event: {message}")]
    BackendForward { backend: String, message: String },

    /// An observer panicked while handling an event
    #[error("Observer #{index} panicked: {message}")]
    Observer { index: usize, message: String },

    /// Write attempted on a disposed listener
    #[error("Listener '{name}' is disposed")]
    Disposed { name: String },

    /// Attempt to redefine a built-in severity level
    #[error("Level '{name}' is built in and cannot be redefined")]
    ReservedLevel { name: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Channel send error
    #[error("Failed to send log event to channel")]
    ChannelSendError,
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

    /// Create an unsupported shape error
    pub fn unsupported_shape(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::UnsupportedShape {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create a backend forward error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::BackendForward {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn observer(index: usize, message: impl Into<String>) -> Self {
        LoggerError::Observer {
            index,
            message: message.into(),
        }
    }

    pub fn disposed(name: impl Into<String>) -> Self {
        LoggerError::Disposed { name: name.into() }
    }

    pub fn reserved_level(name: impl Into<String>) -> Self {
        LoggerError::ReservedLevel { name: name.into() }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }
}
