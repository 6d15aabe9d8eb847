//! Basic trace bridge usage example
//!
//! Demonstrates plain, category, object and error writes through a tracer
//! with a console backend and an observer.
//!
//! Run with: cargo run --example basic_usage

use serde::Serialize;
use std::sync::Arc;
use trace_bridge::prelude::*;
use trace_bridge::trace_category;

#[derive(Serialize)]
struct OrderSaved {
    message: &'static str,
    #[serde(rename = "OrderId")]
    order_id: u64,
    items: u32,
}

#[derive(Debug, thiserror::Error)]
#[error("payment declined")]
struct PaymentDeclined {
    #[source]
    source: std::io::Error,
}

fn charge() -> std::result::Result<(), CapturedError> {
    let err = PaymentDeclined {
        source: std::io::Error::new(std::io::ErrorKind::TimedOut, "gateway timed out"),
    };
    Err(CapturedError::new(&err))
}

fn main() -> Result<()> {
    println!("=== Trace Bridge - Basic Usage Example ===\n");

    let settings = ListenerSettings::from_json_str(
        r#"{"name":"shop","caller_capture":"symbolized","console":{"use_colors":true,"min_level":"all"}}"#,
    )?;

    println!("1. Listener creation emits an initialization event:");
    let listener = Arc::new(TraceListener::from_settings(&settings)?);
    listener.subscribe(|source, event| {
        if event.level().rank() >= 70_000 {
            println!("   observer[{}] saw {}: {}", source, event.level(), event.message());
        }
    });

    let tracer = Tracer::new();
    tracer.add_listener(Arc::clone(&listener));

    println!("\n2. Plain and category writes:");
    tracer.write_line("Service started");
    tracer.write_with_category("Cache is cold", "warn");
    trace_category!(tracer, "debug", "Loaded {} products", 42);

    println!("\n3. Custom and unknown categories:");
    listener.add_level(45_000, "audit", Some("AUDIT"))?;
    tracer.write_with_category("Price list changed", "audit");
    tracer.write_with_category("Unregistered category", "billing");

    println!("\n4. Object writes:");
    tracer.write_object(&OrderSaved {
        message: "Order saved",
        order_id: 1001,
        items: 3,
    });

    println!("\n5. Error writes:");
    if let Err(err) = charge() {
        tracer.write_error_with_category(&err, "error");
    }

    println!("\n6. Off category and writes after dispose are dropped:");
    tracer.write_with_category("never shown", "off");
    listener.dispose();
    tracer.write_line("never shown either");

    let metrics = listener.metrics();
    println!(
        "\n   dispatched={} gated={} backend_failures={}",
        metrics.dispatched(),
        metrics.gated(),
        metrics.backend_failures()
    );

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
