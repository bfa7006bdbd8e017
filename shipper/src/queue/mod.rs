//! The boundary between the publisher pipeline and the buffering queue.
//!
//! The pipeline treats the queue as an opaque bounded buffer: it hands
//! over admitted events together with a correlation token and later learns,
//! through an ack channel, that the n oldest published events of some
//! client were durably handed off or confirmed by an output. How events
//! are stored and shipped is entirely the queue's and the outputs' concern.

mod base;
pub mod memory;

pub use base::{AckNotification, AckRx, AckTx, Queue, QueueEntry};
