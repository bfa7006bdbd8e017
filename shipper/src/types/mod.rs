//! Core data types moving through the publisher pipeline.

mod event;

pub use event::{AckTag, Event, Fields, Value};
