//! Telemetry initialization for shipper services.

pub mod tracing;
