//! Structured logging facility
//!
//! - Single initialization point via `init(profile)`
//! - Operation macros (`log_op_start!`, `log_op_end!`, `log_op_error!`) that
//!   emit the canonical fields from `hiccup_core_types::schema`
//! - Test capture mode for asserting on emitted events
//!
//! # Usage
//!
//! ```rust
//! use hiccup_core::logging_facility::{init, Profile};
//!
//! // Once, at application startup
//! init(Profile::Development);
//! ```
//!
//! `Hiccup::project`, `Hiccup::query_all` and `Hiccup::query_one` are logged
//! as operations carrying a `query_id` correlation field. Projection
//! diagnostics are logged at warn level with `event = "diagnostic"`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
