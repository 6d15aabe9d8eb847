//! Integration tests for the trace bridge
//!
//! These tests verify:
//! - Plain, object, category and error writes end to end
//! - Severity gating with the `off` level
//! - Error enrichment with Source, Method and InnerException
//! - Backend failure and observer panic containment
//! - Dispose semantics and tracer fan-out
//! - Settings loaded from a file

use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use trace_bridge::prelude::*;

fn memory_listener(name: &str) -> (TraceListener, Arc<MemoryBackend>) {
    let memory = Arc::new(MemoryBackend::new());
    let listener = TraceListener::builder()
        .name(name)
        .registry(Arc::new(SeverityRegistry::new()))
        .backend(Arc::clone(&memory))
        .build();
    memory.clear();
    (listener, memory)
}

#[derive(Debug, thiserror::Error)]
#[error("Paf")]
struct Paf;

#[derive(Debug, thiserror::Error)]
#[error("save failed")]
struct SaveFailed {
    #[source]
    source: std::io::Error,
}

fn explode() -> std::result::Result<(), CapturedError> {
    Err(CapturedError::new(&Paf))
}

#[test]
fn test_plain_string_with_default_category() {
    let (listener, memory) = memory_listener("log1");

    listener.write_line("log_X");

    let events = memory.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level().name(), "INFO");
    assert_eq!(events[0].level().rank(), 40_000);
    assert_eq!(events[0].message(), "log_X");
    assert!(events[0].properties().is_empty());
    assert_eq!(events[0].logger_name(), "log1");
}

#[test]
fn test_anonymous_record_projection() {
    #[derive(Serialize)]
    #[allow(non_snake_case)]
    struct Record {
        Message: &'static str,
        P1: &'static str,
    }

    let (listener, memory) = memory_listener("log1");
    listener.write_object(&Record {
        Message: "log_X",
        P1: "pp1",
    });

    let event = &memory.events()[0];
    assert_eq!(event.message(), "log_X");
    assert_eq!(event.properties().len(), 1);
    assert_eq!(event.property("P1"), Some(&FieldValue::from("pp1")));
    assert!(event.property("Message").is_none());
    assert!(event.property("message").is_none());
}

#[test]
fn test_projection_keeps_field_order_and_case() {
    #[derive(Serialize)]
    struct Checkout {
        #[serde(rename = "OrderId")]
        order_id: u64,
        txt: String,
        #[serde(rename = "Amount")]
        amount: f64,
        paid: bool,
    }

    let (listener, memory) = memory_listener("shop");
    listener.write_object_with_category(
        &Checkout {
            order_id: 9,
            txt: "checkout done".into(),
            amount: 12.5,
            paid: true,
        },
        "notice",
    );

    let event = &memory.events()[0];
    assert_eq!(event.message(), "checkout done");
    assert_eq!(event.level().rank(), 50_000);
    let keys: Vec<&str> = event.properties().keys().collect();
    assert_eq!(keys, vec!["OrderId", "Amount", "paid"]);
    assert_eq!(event.property("paid"), Some(&FieldValue::Bool(true)));
}

#[test]
fn test_map_values_are_projected() {
    let (listener, memory) = memory_listener("log1");
    listener.write_object(&serde_json::json!({
        "MSG": "from a map",
        "user": "ada",
        "attempt": 3
    }));

    let event = &memory.events()[0];
    assert_eq!(event.message(), "from a map");
    assert!(event.properties().contains_key("user"));
    assert!(event.properties().contains_key("attempt"));
    assert!(!event.properties().contains_key("MSG"));
}

#[test]
fn test_json_scalar_does_not_spoil_later_objects() {
    let (listener, memory) = memory_listener("log1");
    let (other, other_memory) = memory_listener("log2");

    listener.write_object(&serde_json::json!("just text"));
    listener.write_object(&serde_json::json!({ "Message": "log_X", "P1": "pp1" }));
    other.write_object(&serde_json::json!({ "text": "elsewhere" }));

    let events = memory.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message(), "");
    assert_eq!(events[1].message(), "log_X");
    assert_eq!(events[1].property("P1"), Some(&FieldValue::from("pp1")));
    assert_eq!(other_memory.messages(), vec!["elsewhere"]);
}

#[test]
fn test_unsupported_shape_writes_empty_event() {
    let (listener, memory) = memory_listener("log1");
    listener.write_object(&vec![1, 2, 3]);

    let event = &memory.events()[0];
    assert_eq!(event.message(), "");
    assert!(event.properties().is_empty());
}

#[test]
fn test_thrown_error_is_written() {
    let (listener, memory) = memory_listener("log1");

    if let Err(err) = explode() {
        listener.write_error(err);
    }

    let event = &memory.events()[0];
    assert_eq!(event.message(), "Paf");
    assert_eq!(event.level().name(), "INFO");
    assert!(event.properties().contains_key("Method"));
    assert_eq!(
        event.property("Source").and_then(|v| v.as_str()),
        Some("integration_tests")
    );
    assert!(!event.properties().contains_key("InnerException"));

    // The location is the throw site inside `explode`, not this write
    let location = event.location().unwrap();
    assert_eq!(location.file(), Some(file!()));
    assert_eq!(location, event.error().unwrap().throw_site().unwrap());
}

#[test]
fn test_nested_error_records_inner_chain() {
    let (listener, memory) = memory_listener("log1");
    let err = SaveFailed {
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume"),
    };

    listener.write_error_with_category(CapturedError::new(&err), "error");

    let event = &memory.events()[0];
    assert_eq!(event.message(), "save failed");
    assert_eq!(event.level().name(), "ERROR");
    assert_eq!(
        event.property("InnerException").and_then(|v| v.as_str()),
        Some("read-only volume")
    );
}

#[test]
fn test_off_category_produces_nothing() {
    let (listener, memory) = memory_listener("log1");
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    listener.subscribe(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    listener.write_with_category("nope", "off");
    listener.write_line_with_category("nope", "Off");
    listener.write_error_with_category(CapturedError::msg("nope"), "OFF");

    assert!(memory.is_empty());
    assert_eq!(notified.load(Ordering::SeqCst), 0);
    assert_eq!(listener.metrics().gated(), 3);
}

#[test]
fn test_unknown_category_is_created_below_verbose() {
    let (listener, memory) = memory_listener("log1");

    listener.write_with_category("first", "Audit");
    listener.write_with_category("second", "audit");

    let events = memory.events();
    assert!(Arc::ptr_eq(events[0].level(), events[1].level()));
    assert_eq!(events[0].level().rank(), 9_999);
    assert_eq!(listener.registry().created_count(), 1);
}

struct FailingBackend;

impl Backend for FailingBackend {
    fn log(&self, _event: &LogEvent) -> Result<()> {
        Err(LoggerError::backend("failing", "sink unavailable"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct PanickingBackend;

impl Backend for PanickingBackend {
    fn log(&self, _event: &LogEvent) -> Result<()> {
        panic!("backend exploded");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

#[test]
fn test_backend_failure_is_contained() {
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);

    let listener = TraceListener::builder()
        .backend(FailingBackend)
        .observer(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    listener.write("still fine");

    // Observers run even when the backend failed
    assert_eq!(notified.load(Ordering::SeqCst), 2);
    assert_eq!(listener.metrics().backend_failures(), 2);
    assert_eq!(listener.metrics().dispatched(), 2);
}

#[test]
fn test_backend_panic_is_contained() {
    let listener = TraceListener::builder().backend(PanickingBackend).build();
    listener.write("still fine");
    assert_eq!(listener.metrics().backend_failures(), 2);
}

#[test]
fn test_panicking_observer_does_not_stop_others() {
    let (listener, memory) = memory_listener("log1");
    let seen = Arc::new(AtomicUsize::new(0));

    listener.subscribe(|_, _| panic!("observer exploded"));
    let counter = Arc::clone(&seen);
    listener.subscribe(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    listener.write("one");
    listener.write("two");

    assert_eq!(memory.len(), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(listener.metrics().observer_failures(), 2);
}

#[test]
fn test_observer_can_unsubscribe_during_broadcast() {
    let (listener, _memory) = memory_listener("log1");
    let listener = Arc::new(listener);
    let calls = Arc::new(AtomicUsize::new(0));

    let id_slot: Arc<parking_lot::Mutex<Option<SubscriptionId>>> = Arc::new(parking_lot::Mutex::new(None));
    let weak = Arc::downgrade(&listener);
    let slot = Arc::clone(&id_slot);
    let counter = Arc::clone(&calls);
    let id = listener.subscribe(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let (Some(listener), Some(id)) = (weak.upgrade(), *slot.lock()) {
            listener.unsubscribe(id);
        }
    });
    *id_slot.lock() = Some(id);

    listener.write("first");
    listener.write("second");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(listener.observer_count(), 0);
}

#[test]
fn test_write_after_dispose_is_swallowed() {
    let (listener, memory) = memory_listener("log1");

    listener.dispose();
    listener.write("late");
    listener.write_object(&serde_json::json!({"msg": "late"}));
    listener.fail("late");

    assert!(memory.is_empty());
    assert_eq!(listener.metrics().dropped_after_dispose(), 3);
}

#[test]
fn test_tracer_detaches_disposed_listeners() {
    let tracer = Tracer::new();
    let (first, first_memory) = memory_listener("first");
    let (second, second_memory) = memory_listener("second");
    let first = Arc::new(first);
    tracer.add_listener(Arc::clone(&first));
    tracer.add_listener(Arc::new(second));

    tracer.write("both");
    first.dispose();
    tracer.write("only second");

    assert_eq!(first_memory.messages(), vec!["both"]);
    assert_eq!(second_memory.messages(), vec!["both", "only second"]);
    assert_eq!(tracer.len(), 1);
}

#[test]
fn test_listener_from_settings_file() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"{{"name":"configured","caller_capture":"disabled","console":{{"enabled":false}}}}"#
    )
    .expect("Failed to write settings");

    let settings = ListenerSettings::from_file(file.path()).expect("Failed to load settings");
    let listener = TraceListener::from_settings(&settings).expect("Failed to build listener");

    assert_eq!(listener.name(), "configured");
    assert_eq!(listener.caller_capture(), CallerCapture::Disabled);
    assert_eq!(listener.metrics().dispatched(), 1);
}

#[test]
fn test_settings_combined_with_custom_backend() {
    let settings =
        ListenerSettings::from_json_str(r#"{"name":"custom","match_mode":"exact"}"#).unwrap();
    let memory = Arc::new(MemoryBackend::new());
    let listener = TraceListener::builder()
        .settings(&settings)
        .backend(Arc::clone(&memory))
        .build();
    memory.clear();

    listener.write_object(&serde_json::json!({"Message": "kept as property", "msg": "the message"}));

    let event = &memory.events()[0];
    assert_eq!(event.logger_name(), "custom");
    assert_eq!(event.message(), "the message");
    assert!(event.properties().contains_key("Message"));
}

#[test]
fn test_symbolized_capture_resolves_calling_function() {
    let memory = Arc::new(MemoryBackend::new());
    let listener = TraceListener::builder()
        .caller_capture(CallerCapture::Symbolized)
        .backend(Arc::clone(&memory))
        .build();
    memory.clear();

    let line = line!() + 1;
    listener.write("symbolized");

    let location = memory.events()[0].location().cloned().unwrap();
    assert_eq!(location.file(), Some(file!()));
    assert_eq!(location.line(), Some(line));
    // Symbol names need debug info; when present they name this test
    if let Some(method) = location.method() {
        assert!(method.contains("test_symbolized_capture_resolves_calling_function"));
    }
}

#[test]
fn test_event_json_shape() {
    let (listener, memory) = memory_listener("json");
    listener.write_object(&serde_json::json!({"text": "hello", "n": 1}));

    let json: serde_json::Value =
        serde_json::from_str(&memory.events()[0].to_json().unwrap()).unwrap();
    assert_eq!(json["message"], "hello");
    assert_eq!(json["logger_name"], "json");
    assert_eq!(json["level"]["rank"], 40_000);
    assert_eq!(json["properties"]["n"], 1);
}
