//! Explicit trace facility
//!
//! A [`Tracer`] is the handle application code writes through. It fans every
//! write out to the listeners added to it and forgets listeners once they
//! are disposed. Hosts create one and pass it to whatever produces traces
//! instead of installing listeners into global state.

use super::captured_error::CapturedError;
use super::listener::TraceListener;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Tracer {
    listeners: RwLock<Vec<Arc<TraceListener>>>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<TraceListener>) {
        self.listeners.write().push(listener);
    }

    /// Detach every listener with the given name, returning how many were removed
    pub fn remove_listener(&self, name: &str) -> usize {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|listener| listener.name() != name);
        before - listeners.len()
    }

    /// Number of listeners still attached
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    #[track_caller]
    pub fn write(&self, message: &str) {
        for listener in self.active() {
            listener.write(message);
        }
    }

    #[track_caller]
    pub fn write_line(&self, message: &str) {
        for listener in self.active() {
            listener.write_line(message);
        }
    }

    #[track_caller]
    pub fn write_with_category(&self, message: &str, category: &str) {
        for listener in self.active() {
            listener.write_with_category(message, category);
        }
    }

    #[track_caller]
    pub fn write_line_with_category(&self, message: &str, category: &str) {
        for listener in self.active() {
            listener.write_line_with_category(message, category);
        }
    }

    #[track_caller]
    pub fn write_object<T: Serialize + ?Sized + 'static>(&self, value: &T) {
        for listener in self.active() {
            listener.write_object(value);
        }
    }

    #[track_caller]
    pub fn write_object_with_category<T: Serialize + ?Sized + 'static>(&self, value: &T, category: &str) {
        for listener in self.active() {
            listener.write_object_with_category(value, category);
        }
    }

    #[track_caller]
    pub fn write_error(&self, error: &CapturedError) {
        for listener in self.active() {
            listener.write_error(error.clone());
        }
    }

    #[track_caller]
    pub fn write_error_with_category(&self, error: &CapturedError, category: &str) {
        for listener in self.active() {
            listener.write_error_with_category(error.clone(), category);
        }
    }

    #[track_caller]
    pub fn fail(&self, message: &str) {
        for listener in self.active() {
            listener.fail(message);
        }
    }

    #[track_caller]
    pub fn fail_with_detail(&self, message: &str, detail: &str) {
        for listener in self.active() {
            listener.fail_with_detail(message, detail);
        }
    }

    /// Snapshot of the attached listeners, pruning disposed ones first
    fn active(&self) -> Vec<Arc<TraceListener>> {
        {
            let listeners = self.listeners.read();
            if listeners.iter().all(|listener| !listener.is_disposed()) {
                return listeners.clone();
            }
        }

        let mut listeners = self.listeners.write();
        listeners.retain(|listener| !listener.is_disposed());
        listeners.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;

    fn attach(tracer: &Tracer, name: &str) -> (Arc<TraceListener>, Arc<MemoryBackend>) {
        let memory = Arc::new(MemoryBackend::new());
        let listener = Arc::new(
            TraceListener::builder()
                .name(name)
                .backend(Arc::clone(&memory))
                .build(),
        );
        memory.clear();
        tracer.add_listener(Arc::clone(&listener));
        (listener, memory)
    }

    #[test]
    fn test_fan_out() {
        let tracer = Tracer::new();
        let (_a, first) = attach(&tracer, "a");
        let (_b, second) = attach(&tracer, "b");

        tracer.write("hello");
        tracer.write_object_with_category(&serde_json::json!({"text": "obj", "k": 1}), "warn");

        for memory in [&first, &second] {
            assert_eq!(memory.messages(), vec!["hello", "obj"]);
        }
        assert_eq!(first.events()[0].logger_name(), "a");
        assert_eq!(second.events()[0].logger_name(), "b");
    }

    #[test]
    fn test_caller_location_points_at_tracer_call() {
        let tracer = Tracer::new();
        let (_listener, memory) = attach(&tracer, "a");

        let line = line!() + 1;
        tracer.write_line("here");

        let location = memory.events()[0].location().cloned().unwrap();
        assert_eq!(location.file(), Some(file!()));
        assert_eq!(location.line(), Some(line));
    }

    #[test]
    fn test_disposed_listener_is_pruned() {
        let tracer = Tracer::new();
        let (listener, memory) = attach(&tracer, "a");
        let (_other, other_memory) = attach(&tracer, "b");

        listener.dispose();
        tracer.write("after");

        assert_eq!(tracer.len(), 1);
        assert!(memory.is_empty());
        assert_eq!(other_memory.messages(), vec!["after"]);
        assert_eq!(listener.metrics().dropped_after_dispose(), 0);
    }

    #[test]
    fn test_remove_listener() {
        let tracer = Tracer::new();
        let (_listener, memory) = attach(&tracer, "a");

        assert_eq!(tracer.remove_listener("a"), 1);
        assert_eq!(tracer.remove_listener("a"), 0);
        tracer.fail("gone");

        assert!(tracer.is_empty());
        assert!(memory.is_empty());
    }

    #[test]
    fn test_error_fan_out() {
        let tracer = Tracer::new();
        let (_a, memory) = attach(&tracer, "a");

        tracer.write_error_with_category(&CapturedError::msg("Paf"), "error");

        let event = &memory.events()[0];
        assert_eq!(event.message(), "Paf");
        assert_eq!(event.level().name(), "ERROR");
    }
}
