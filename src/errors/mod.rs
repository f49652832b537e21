//! Error types for dum-core
//!
//! This module defines the error types used throughout the crate. Two kinds
//! of failure exist in the demultiplexing layer and they are handled
//! differently:
//!
//! - **Protocol-shape errors** (a message is missing the Call-ID, tags or
//!   CSeq needed to compute an identity key) are `Err` values propagated out
//!   of dispatch with `?`. The caller decides whether to respond or log.
//! - **Invariant violations** (duplicate singleton usage, a creator missing
//!   where one is required) indicate a bug in the routing layer above and are
//!   fatal `assert!`s, never `Err` values.

pub mod dialog_errors;

pub use dialog_errors::{DialogError, DialogResult};
