//! Lightweight SIP message model
//!
//! The demultiplexing core does not parse or serialize SIP; message grammar
//! belongs to the layer below. What this module provides is the in-memory
//! shape that classification reads: request/response kind, the correlation
//! headers (Call-ID, From-tag, To-tag, CSeq) and the direction flag telling
//! an internally originated message apart from one received over the wire.

pub mod message;
pub mod method;
pub mod status;

pub use message::{CSeq, MessageKind, SipMessage};
pub use method::Method;
pub use status::StatusCode;
