//! Publishes a handful of events through an in-memory queue.
//!
//! The queue auto-confirms every entry, so this demonstrates the full
//! publish → enqueue → ack → callback loop without any external system:
//!
//! ```bash
//! cargo run -p shipper --example memory
//! ```

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use shipper::ack::AckMode;
use shipper::error::ShipperResult;
use shipper::pipeline::{ClientConfig, Pipeline};
use shipper::queue::memory::MemoryQueue;
use shipper::selector::{Selector, Settings};
use shipper::types::{Event, Fields, Value};
use shipper_config::shared::{PipelineSettings, SelectorConfig};
use shipper_telemetry::tracing::init_tracing;

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        _ => Fields::new(),
    }
}

#[tokio::main]
async fn main() -> ShipperResult<()> {
    init_tracing("shipper-memory-example");

    let selector_config: SelectorConfig = serde_json::from_str(
        r#"{
            "key": "logs-%{+%Y.%m.%d}",
            "keys": [
                {
                    "key": "%{[event.level]}",
                    "mappings": {"critical": "alerts", "error": "alerts"},
                    "when": {"has_fields": ["event.level"]}
                }
            ]
        }"#,
    )?;
    let selector = Selector::from_config(
        &selector_config,
        &Settings {
            key: "index",
            multi_key: "indices",
            enable_single_only: true,
            fail_empty: false,
        },
    )?;

    let queue = MemoryQueue::with_auto_confirm();
    let mut pipeline = Pipeline::new(
        PipelineSettings {
            id: 1,
            max_in_flight: 1024,
        },
        selector,
        queue.clone(),
    )?;
    pipeline.start().await?;

    let client = pipeline.connect(ClientConfig {
        ack_mode: AckMode::Count(Arc::new(|acked, dropped| {
            info!(acked, dropped, "delivery progress");
        })),
        ..ClientConfig::default()
    })?;

    for (service, level) in [("api", Some("critical")), ("api", None), ("worker", None)] {
        let mut event_fields = fields(json!({"service": service}));
        if let Some(level) = level {
            event_fields.insert("event".to_string(), json!({"level": level}));
        }

        let event = Event::with_fields(chrono::Utc::now(), event_fields);
        let outcome = client.publish(event).await;
        info!(?outcome, service, "published");
    }

    for entry in queue.entries() {
        info!(destination = %entry.destination, "queued entry");
    }

    client.close().await;
    pipeline.shutdown_and_wait().await?;

    Ok(())
}
