//! Metrics definitions for publisher pipeline monitoring.

/// Label for pipeline ID in metrics.
pub const PIPELINE_ID_LABEL: &str = "pipeline_id";

/// Label for client ID in metrics.
pub const CLIENT_ID_LABEL: &str = "client_id";

/// Label for drop reason in metrics.
pub const DROP_REASON_LABEL: &str = "drop_reason";

// Pipeline metrics

/// Gauge for events currently in flight.
pub const SHIPPER_EVENTS_ACTIVE: &str = "shipper_events_active";

/// Counter for total events handed to the queue.
pub const SHIPPER_EVENTS_PUBLISHED_TOTAL: &str = "shipper_events_published_total";

/// Counter for total events dropped before reaching the queue.
pub const SHIPPER_EVENTS_DROPPED_TOTAL: &str = "shipper_events_dropped_total";

/// Counter for total events refused by the queue after admission.
pub const SHIPPER_EVENTS_FAILED_TOTAL: &str = "shipper_events_failed_total";

/// Counter for total events confirmed by the queue or outputs.
pub const SHIPPER_EVENTS_ACKED_TOTAL: &str = "shipper_events_acked_total";
