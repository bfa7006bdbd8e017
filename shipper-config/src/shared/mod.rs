//! Shared configuration types for shipper pipelines.

mod client;
mod pipeline;
mod selector;

pub use client::{ClientSettings, EmptyDestination, PublishMode};
pub use pipeline::PipelineSettings;
pub use selector::{ConditionConfig, SelectorConfig, SelectorEntryConfig};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Maximum in-flight events cannot be zero.
    #[error("`max_in_flight` cannot be zero")]
    MaxInFlightZero,
    /// A selector entry template is empty.
    #[error("selector entry `key` cannot be empty")]
    EmptySelectorKey,
    /// A condition must carry exactly one top-level clause.
    #[error("a condition must have exactly one clause, found {0}")]
    InvalidConditionClauses(usize),
}
