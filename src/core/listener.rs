//! Trace listener: the dispatch façade
//!
//! Accepts the write shapes of the trace facility, turns each into a
//! [`LogEvent`] and hands it to the backend and then to every observer.
//! Nothing raised on the way is allowed to reach the writer: backend errors
//! and panics, observer panics and writes after [`dispose`](TraceListener::dispose)
//! are reported on stderr and counted in [`ListenerMetrics`].

use super::{
    assembler::EventAssembler,
    backend::Backend,
    caller::{CallerCapture, CallerResolver},
    captured_error::CapturedError,
    error::{LoggerError, Result},
    log_event::LogEvent,
    log_level::Level,
    metrics::ListenerMetrics,
    projector::{MatchMode, ShapeProjector},
    properties::Properties,
    settings::{ListenerSettings, DEFAULT_LISTENER_NAME},
    severity_registry::SeverityRegistry,
};
use crate::backends::NullBackend;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Message of the event emitted when a listener becomes active
pub const INITIALIZED_MESSAGE: &str = "Log initialized";

const STATE_ACTIVE: u8 = 1;
const STATE_DISPOSED: u8 = 2;

/// Callback notified after the backend for every dispatched event
///
/// Receives the listener name and the event.
pub type EventObserver = Arc<dyn Fn(&str, &LogEvent) + Send + Sync>;

/// Handle returned by [`TraceListener::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct TraceListener {
    name: Arc<str>,
    state: AtomicU8,
    registry: Arc<SeverityRegistry>,
    projector: Arc<ShapeProjector>,
    assembler: EventAssembler,
    backend: Arc<dyn Backend>,
    observers: RwLock<Vec<(SubscriptionId, EventObserver)>>,
    next_subscription: AtomicU64,
    metrics: ListenerMetrics,
}

impl TraceListener {
    #[must_use]
    pub fn builder() -> ListenerBuilder {
        ListenerBuilder::new()
    }

    /// Build a listener from loaded settings
    ///
    /// The backend is a console backend when `console.enabled` is set and the
    /// `console` feature is compiled in, a null backend otherwise.
    #[track_caller]
    pub fn from_settings(settings: &ListenerSettings) -> Result<TraceListener> {
        settings.validate()?;
        let builder = ListenerBuilder::new().settings(settings);

        #[cfg(feature = "console")]
        let builder = if settings.console.enabled {
            let registry = builder.registry_or_global();
            let backend = crate::backends::ConsoleBackend::new()
                .with_colors(settings.console.use_colors)
                .with_min_level(registry.resolve(&settings.console.min_level));
            builder.registry(registry).backend(backend)
        } else {
            builder
        };

        Ok(builder.build())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<SeverityRegistry> {
        &self.registry
    }

    pub fn projector(&self) -> &Arc<ShapeProjector> {
        &self.projector
    }

    pub fn caller_capture(&self) -> CallerCapture {
        self.assembler.resolver().capture()
    }

    pub fn metrics(&self) -> &ListenerMetrics {
        &self.metrics
    }

    pub fn is_disposed(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_DISPOSED
    }

    /// Write a plain message at `info`
    #[track_caller]
    pub fn write(&self, message: impl Into<String>) {
        let call_site = Location::caller();
        let level = self.registry.info();
        self.dispatch(level, message.into(), None, Properties::new(), call_site);
    }

    /// Same as [`write`](Self::write)
    #[track_caller]
    pub fn write_line(&self, message: impl Into<String>) {
        let call_site = Location::caller();
        let level = self.registry.info();
        self.dispatch(level, message.into(), None, Properties::new(), call_site);
    }

    /// Write a plain message at the level named by `category`
    #[track_caller]
    pub fn write_with_category(&self, message: impl Into<String>, category: &str) {
        let call_site = Location::caller();
        let level = self.registry.resolve(category);
        self.dispatch(level, message.into(), None, Properties::new(), call_site);
    }

    /// Same as [`write_with_category`](Self::write_with_category)
    #[track_caller]
    pub fn write_line_with_category(&self, message: impl Into<String>, category: &str) {
        let call_site = Location::caller();
        let level = self.registry.resolve(category);
        self.dispatch(level, message.into(), None, Properties::new(), call_site);
    }

    /// Write a record-like value at `info`
    ///
    /// The value is projected into a message and properties; see
    /// [`ShapeProjector`].
    #[track_caller]
    pub fn write_object<T: Serialize + ?Sized + 'static>(&self, value: &T) {
        let call_site = Location::caller();
        let level = self.registry.info();
        self.dispatch_object(level, value, call_site);
    }

    #[track_caller]
    pub fn write_object_with_category<T: Serialize + ?Sized + 'static>(&self, value: &T, category: &str) {
        let call_site = Location::caller();
        let level = self.registry.resolve(category);
        self.dispatch_object(level, value, call_site);
    }

    /// Write an error at `info`, with the error message as the event message
    #[track_caller]
    pub fn write_error(&self, error: CapturedError) {
        let call_site = Location::caller();
        let level = self.registry.info();
        self.dispatch(level, String::new(), Some(error), Properties::new(), call_site);
    }

    #[track_caller]
    pub fn write_error_with_category(&self, error: CapturedError, category: &str) {
        let call_site = Location::caller();
        let level = self.registry.resolve(category);
        self.dispatch(level, String::new(), Some(error), Properties::new(), call_site);
    }

    /// Write `"Fail: <message>"` at `info`
    #[track_caller]
    pub fn fail(&self, message: &str) {
        let call_site = Location::caller();
        let level = self.registry.info();
        self.dispatch(level, format!("Fail: {}", message), None, Properties::new(), call_site);
    }

    /// Write `"Fail: <message> <detail>"` at `info`
    #[track_caller]
    pub fn fail_with_detail(&self, message: &str, detail: &str) {
        let call_site = Location::caller();
        let level = self.registry.info();
        let message = format!("Fail: {} {}", message, detail);
        self.dispatch(level, message, None, Properties::new(), call_site);
    }

    /// Register a custom severity level in this listener's registry
    pub fn add_level(&self, rank: i32, name: &str, display_name: Option<&str>) -> Result<Arc<Level>> {
        self.registry.add_level(rank, name, display_name)
    }

    /// Register an observer; it sees every event dispatched from now on
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&str, &LogEvent) + Send + Sync + 'static,
    {
        self.subscribe_shared(Arc::new(observer))
    }

    pub fn subscribe_shared(&self, observer: EventObserver) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Remove an observer, returning whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }

    /// Stop forwarding; later writes are dropped
    ///
    /// Flushes the backend once. Returns `false` if the listener was
    /// already disposed.
    pub fn dispose(&self) -> bool {
        let disposed = self
            .state
            .compare_exchange(STATE_ACTIVE, STATE_DISPOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if disposed {
            self.flush_reporting("dispose");
        }
        disposed
    }

    fn dispatch_object<T: Serialize + ?Sized + 'static>(
        &self,
        level: Arc<Level>,
        value: &T,
        call_site: &'static Location<'static>,
    ) {
        if !self.accepts(&level) {
            return;
        }
        let projection = self.projector.project(value);
        self.dispatch(level, projection.message, None, projection.properties, call_site);
    }

    /// Admission check shared by every write shape
    fn accepts(&self, level: &Level) -> bool {
        if self.is_disposed() {
            if self.metrics.record_dropped_after_dispose() == 0 {
                eprintln!(
                    "[TRACE BRIDGE WARNING] {}. Further writes are dropped.",
                    LoggerError::disposed(&*self.name)
                );
            }
            return false;
        }
        if level.is_off() {
            self.metrics.record_gated();
            return false;
        }
        true
    }

    fn dispatch(
        &self,
        level: Arc<Level>,
        message: String,
        error: Option<CapturedError>,
        properties: Properties,
        call_site: &'static Location<'static>,
    ) {
        if !self.accepts(&level) {
            return;
        }

        let event = match self.assembler.assemble(level, message, error, properties, call_site) {
            Some(event) => event,
            None => {
                self.metrics.record_gated();
                return;
            }
        };
        self.metrics.record_dispatched();

        self.forward(&event);
        self.broadcast(&event);
    }

    fn forward(&self, event: &LogEvent) {
        let result = catch_unwind(AssertUnwindSafe(|| self.backend.log(event)));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.metrics.record_backend_failure();
                eprintln!("[TRACE BRIDGE ERROR] Log fail. {}", e);
            }
            Err(panic_info) => {
                self.metrics.record_backend_failure();
                let err = LoggerError::backend(self.backend.name(), panic_message(panic_info.as_ref()));
                eprintln!("[TRACE BRIDGE CRITICAL] Log fail. {}. The event is lost.", err);
            }
        }
    }

    fn broadcast(&self, event: &LogEvent) {
        // Snapshot so observers can (un)subscribe from inside a callback
        let observers: Vec<EventObserver> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        let source: &str = &self.name;
        for (idx, observer) in observers.iter().enumerate() {
            let result = catch_unwind(AssertUnwindSafe(|| observer(source, event)));
            if let Err(panic_info) = result {
                self.metrics.record_observer_failure();
                eprintln!(
                    "[TRACE BRIDGE CRITICAL] {}. Other observers continue to run.",
                    LoggerError::observer(idx, panic_message(panic_info.as_ref()))
                );
            }
        }
    }

    fn flush_reporting(&self, during: &str) {
        let result = catch_unwind(AssertUnwindSafe(|| self.backend.flush()));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("[TRACE BRIDGE ERROR] Flush failed during {}: {}", during, e),
            Err(panic_info) => eprintln!(
                "[TRACE BRIDGE CRITICAL] Backend '{}' panicked during {}: {}",
                self.backend.name(),
                during,
                panic_message(panic_info.as_ref())
            ),
        }
    }
}

impl std::fmt::Debug for TraceListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceListener")
            .field("name", &self.name)
            .field("backend", &self.backend.name())
            .field("disposed", &self.is_disposed())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl Drop for TraceListener {
    fn drop(&mut self) {
        if !self.is_disposed() {
            self.flush_reporting("drop");
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Builder for constructing a [`TraceListener`] with a fluent API
///
/// # Example
/// ```
/// use trace_bridge::prelude::*;
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemoryBackend::new());
/// let listener = TraceListener::builder()
///     .name("orders")
///     .caller_capture(CallerCapture::CallSite)
///     .backend(Arc::clone(&memory))
///     .build();
///
/// listener.write_with_category("order saved", "notice");
///
/// let events = memory.events();
/// assert_eq!(events[0].message(), "Log initialized");
/// assert_eq!(events[1].level().rank(), 50_000);
/// ```
pub struct ListenerBuilder {
    name: String,
    registry: Option<Arc<SeverityRegistry>>,
    projector: Option<Arc<ShapeProjector>>,
    match_mode: MatchMode,
    caller_capture: CallerCapture,
    backend: Option<Arc<dyn Backend>>,
    observers: Vec<EventObserver>,
}

impl ListenerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            name: DEFAULT_LISTENER_NAME.to_string(),
            registry: None,
            projector: None,
            match_mode: MatchMode::default(),
            caller_capture: CallerCapture::default(),
            backend: None,
            observers: Vec::new(),
        }
    }

    /// Logger name carried by every event
    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use a dedicated registry instead of the global one
    #[must_use = "builder methods return a new value"]
    pub fn registry(mut self, registry: Arc<SeverityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a dedicated projector instead of the global one
    ///
    /// Takes precedence over [`match_mode`](Self::match_mode).
    #[must_use = "builder methods return a new value"]
    pub fn projector(mut self, projector: Arc<ShapeProjector>) -> Self {
        self.projector = Some(projector);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn caller_capture(mut self, capture: CallerCapture) -> Self {
        self.caller_capture = capture;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn backend<B: Backend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Register an observer before the initialization event is emitted
    #[must_use = "builder methods return a new value"]
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str, &LogEvent) + Send + Sync + 'static,
    {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Apply name, caller capture and match mode from settings
    #[must_use = "builder methods return a new value"]
    pub fn settings(mut self, settings: &ListenerSettings) -> Self {
        self.name = settings.name.clone();
        self.caller_capture = settings.caller_capture;
        self.match_mode = settings.match_mode;
        self
    }

    fn registry_or_global(&self) -> Arc<SeverityRegistry> {
        self.registry.clone().unwrap_or_else(SeverityRegistry::global)
    }

    /// Build the listener and emit the initialization event
    #[track_caller]
    pub fn build(self) -> TraceListener {
        let call_site = Location::caller();

        let registry = self.registry_or_global();
        let projector = match self.projector {
            Some(projector) => projector,
            None if self.match_mode == MatchMode::default() => ShapeProjector::global(),
            None => Arc::new(ShapeProjector::with_mode(self.match_mode)),
        };
        let name: Arc<str> = Arc::from(self.name);
        let backend = self.backend.unwrap_or_else(|| Arc::new(NullBackend::new()));

        let mut observers = Vec::with_capacity(self.observers.len());
        for (idx, observer) in self.observers.into_iter().enumerate() {
            observers.push((SubscriptionId(idx as u64), observer));
        }
        let next_subscription = AtomicU64::new(observers.len() as u64);

        let listener = TraceListener {
            assembler: EventAssembler::new(Arc::clone(&name), CallerResolver::new(self.caller_capture)),
            name,
            state: AtomicU8::new(STATE_ACTIVE),
            registry,
            projector,
            backend,
            observers: RwLock::new(observers),
            next_subscription,
            metrics: ListenerMetrics::new(),
        };

        let level = listener.registry.info();
        listener.dispatch(level, INITIALIZED_MESSAGE.to_string(), None, Properties::new(), call_site);
        listener
    }
}

impl Default for ListenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
