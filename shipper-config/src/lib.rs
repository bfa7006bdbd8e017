//! Shared configuration types for shipper pipelines.
//!
//! This crate holds the serde-backed settings consumed when building a
//! pipeline, its clients, and their destination selectors. Loading these
//! types from files or the environment is the embedding service's concern;
//! only the shapes and their validation live here.

pub mod shared;
