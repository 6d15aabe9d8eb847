//! # Trace Bridge
//!
//! Normalizes values written through a trace facility into structured log
//! events and dispatches them to a logging backend.
//!
//! ## Features
//!
//! - **Shape projection**: any `Serialize` struct or map becomes a message
//!   plus ordered properties, with one compiled plan per type
//! - **Dynamic severities**: free-form categories resolve to ranked levels,
//!   unknown names are created on first use
//! - **Caller attribution**: every write records its call site, optionally
//!   symbolized into a function path
//! - **Contained failures**: backend errors, observer panics and writes after
//!   dispose never reach the writer
//!
//! ```
//! use trace_bridge::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(serde::Serialize)]
//! struct OrderSaved {
//!     message: &'static str,
//!     order_id: u64,
//! }
//!
//! let memory = Arc::new(MemoryBackend::new());
//! let listener = TraceListener::builder()
//!     .name("orders")
//!     .backend(Arc::clone(&memory))
//!     .build();
//!
//! listener.write_object(&OrderSaved { message: "saved", order_id: 42 });
//!
//! let event = memory.events().pop().unwrap();
//! assert_eq!(event.message(), "saved");
//! assert_eq!(event.property("order_id").unwrap().to_string(), "42");
//! ```

pub mod backends;
pub mod core;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::backends::ConsoleBackend;
    pub use crate::backends::{ChannelBackend, MemoryBackend, NullBackend};
    pub use crate::core::{
        Backend, CallerCapture, CallerLocation, CapturedError, FieldValue, Level, ListenerBuilder,
        ListenerMetrics, ListenerSettings, LogEvent, LoggerError, MatchMode, Properties, Result,
        SeverityRegistry, ShapeProjector, SubscriptionId, TraceListener, Tracer,
    };
}

#[cfg(feature = "console")]
pub use backends::ConsoleBackend;
pub use backends::{ChannelBackend, MemoryBackend, NullBackend};
pub use core::{
    Backend, CallerCapture, CallerLocation, CallerResolver, CapturedError, ConsoleSettings,
    EventAssembler, EventObserver, FieldValue, Level, ListenerBuilder, ListenerMetrics,
    ListenerSettings, LogEvent, LoggerError, MatchMode, Projection, Properties, Result,
    SeverityRegistry, ShapePlan, ShapeProjector, SubscriptionId, TraceListener, Tracer,
};
