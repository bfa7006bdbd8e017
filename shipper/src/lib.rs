//! Event-shipping publisher pipeline.
//!
//! This crate is the client/ACK/backpressure core of a data-collection
//! agent: producers connect to a [`pipeline::Pipeline`], publish
//! [`types::Event`]s through their [`client::Client`], and receive delivery
//! confirmations with configurable granularity while a bounded in-flight
//! gate applies backpressure. A compiled [`selector::Selector`] computes,
//! per event, the logical destination it is routed to.
//!
//! The queue buffering events and the outputs shipping them are external
//! collaborators behind the [`queue::Queue`] boundary; an in-memory
//! realization is provided for tests and development.

pub mod ack;
pub mod client;
pub mod concurrency;
pub mod error;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod selector;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
