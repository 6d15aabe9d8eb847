//! Core engine types and traits

pub mod assembler;
pub mod backend;
pub mod caller;
pub mod captured_error;
pub mod error;
pub mod listener;
pub mod log_event;
pub mod log_level;
pub mod metrics;
pub mod projector;
pub mod properties;
pub mod settings;
pub mod severity_registry;
pub mod tracer;

pub use assembler::{EventAssembler, INNER_ERROR_KEY, METHOD_KEY, SOURCE_KEY};
pub use backend::Backend;
pub use caller::{CallerCapture, CallerLocation, CallerResolver};
pub use captured_error::CapturedError;
pub use error::{LoggerError, Result};
pub use listener::{EventObserver, ListenerBuilder, SubscriptionId, TraceListener, INITIALIZED_MESSAGE};
pub use log_event::LogEvent;
pub use log_level::Level;
pub use metrics::ListenerMetrics;
pub use projector::{MatchMode, Projection, ShapePlan, ShapeProjector, MESSAGE_FIELDS};
pub use properties::{FieldValue, Properties};
pub use settings::{ConsoleSettings, ListenerSettings};
pub use severity_registry::SeverityRegistry;
pub use tracer::Tracer;
