//! Concurrency utilities coordinating the publisher pipeline.
//!
//! Two primitives carry all coordination in this crate:
//!
//! - The [`shutdown`] module provides a broadcast one-way signal used both
//!   for pipeline-wide shutdown and for waking publishers blocked on a
//!   client that is being closed.
//! - The [`gate`] module bounds how many events may be in flight (admitted
//!   but not yet acknowledged) at once, with a cancellable suspension for
//!   clients that prefer blocking over dropping.
//!
//! Both are designed so that close/shutdown can never deadlock against a
//! suspended publish: every suspension point selects on the close signal.

pub mod gate;
pub mod shutdown;
