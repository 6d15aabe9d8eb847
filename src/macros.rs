//! Formatting macros over the trace write shapes.
//!
//! Each macro works on a [`TraceListener`](crate::TraceListener) or a
//! [`Tracer`](crate::Tracer) and formats its arguments like `format!`. The
//! caller location recorded on the event is the macro call site.
//!
//! # Examples
//!
//! ```
//! use trace_bridge::prelude::*;
//! use trace_bridge::{trace_category, trace_line};
//!
//! let tracer = Tracer::new();
//!
//! let port = 8080;
//! trace_line!(tracer, "Server listening on port {}", port);
//! trace_category!(tracer, "warn", "Retry {} of {}", 1, 3);
//! ```

/// Write a formatted message at `info`.
///
/// # Examples
///
/// ```
/// # use trace_bridge::prelude::*;
/// # let listener = TraceListener::builder().build();
/// use trace_bridge::trace_write;
/// trace_write!(listener, "Simple message");
/// trace_write!(listener, "Items: {}", 100);
/// ```
#[macro_export]
macro_rules! trace_write {
    ($sink:expr, $($arg:tt)+) => {
        $sink.write(&format!($($arg)+))
    };
}

/// Write a formatted line at `info`.
#[macro_export]
macro_rules! trace_line {
    ($sink:expr, $($arg:tt)+) => {
        $sink.write_line(&format!($($arg)+))
    };
}

/// Write a formatted message at the level named by a category.
///
/// # Examples
///
/// ```
/// # use trace_bridge::prelude::*;
/// # let listener = TraceListener::builder().build();
/// use trace_bridge::trace_category;
/// trace_category!(listener, "error", "Code: {}", 500);
/// ```
#[macro_export]
macro_rules! trace_category {
    ($sink:expr, $category:expr, $($arg:tt)+) => {
        $sink.write_with_category(&format!($($arg)+), $category)
    };
}

/// Write a formatted `"Fail: ..."` message.
#[macro_export]
macro_rules! trace_fail {
    ($sink:expr, $($arg:tt)+) => {
        $sink.fail(&format!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use crate::backends::MemoryBackend;
    use crate::core::{Tracer, TraceListener};
    use std::sync::Arc;

    fn listener() -> (TraceListener, Arc<MemoryBackend>) {
        let memory = Arc::new(MemoryBackend::new());
        let listener = TraceListener::builder().backend(Arc::clone(&memory)).build();
        memory.clear();
        (listener, memory)
    }

    #[test]
    fn test_write_macros() {
        let (listener, memory) = listener();
        trace_write!(listener, "Plain");
        trace_line!(listener, "Count: {}", 5);
        trace_fail!(listener, "step {}", 2);

        assert_eq!(memory.messages(), vec!["Plain", "Count: 5", "Fail: step 2"]);
    }

    #[test]
    fn test_category_macro() {
        let (listener, memory) = listener();
        trace_category!(listener, "warn", "Retry {} of {}", 1, 3);

        let event = &memory.events()[0];
        assert_eq!(event.message(), "Retry 1 of 3");
        assert_eq!(event.level().name(), "WARN");
    }

    #[test]
    fn test_macro_location_is_call_site() {
        let (listener, memory) = listener();
        let line = line!() + 1;
        trace_write!(listener, "here");

        let location = memory.events()[0].location().cloned().unwrap();
        assert_eq!(location.line(), Some(line));
    }

    #[test]
    fn test_macros_on_tracer() {
        let (listener, memory) = listener();
        let tracer = Tracer::new();
        tracer.add_listener(Arc::new(listener));

        trace_line!(tracer, "via {}", "tracer");
        assert_eq!(memory.messages(), vec!["via tracer"]);
    }
}
