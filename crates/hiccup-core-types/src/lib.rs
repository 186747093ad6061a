//! Core types shared across Hiccup crates
//!
//! This crate provides foundational types used by the error and logging
//! facilities of `hiccup-core`:
//!
//! - **Correlation types**: QueryId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::QueryId;
