//! In-memory SIP message shape
//!
//! Carries exactly the fields the demultiplexer reads: kind, correlation
//! headers and direction. Construction is builder-style; response synthesis
//! copies the correlation fields of the request being answered and flips the
//! direction flag.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::method::Method;
use super::status::StatusCode;

/// CSeq header value: sequence number plus method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CSeq {
    seq: u32,
    method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Increment the sequence number in place (authentication retry)
    pub fn increment(&mut self) {
        self.seq += 1;
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

/// Request or response, with the field specific to each
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Request { method: Method },
    Response { status: StatusCode },
}

/// A SIP message as seen by the demultiplexing layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipMessage {
    kind: MessageKind,
    call_id: String,
    from_tag: Option<String>,
    to_tag: Option<String>,
    cseq: CSeq,
    /// `true` when the message was received over the wire,
    /// `false` when it was originated by this stack
    external: bool,
}

impl SipMessage {
    /// Build an internally originated request. CSeq starts at 1 with the
    /// request method; adjust with the builder methods.
    pub fn request(method: Method, call_id: impl Into<String>) -> Self {
        let cseq = CSeq::new(1, method.clone());
        Self {
            kind: MessageKind::Request { method },
            call_id: call_id.into(),
            from_tag: None,
            to_tag: None,
            cseq,
            external: false,
        }
    }

    /// Build a standalone response (as delivered by the transaction layer).
    /// The CSeq is the routing key, so it is required up front.
    pub fn response(status: StatusCode, call_id: impl Into<String>, cseq: CSeq) -> Self {
        Self {
            kind: MessageKind::Response { status },
            call_id: call_id.into(),
            from_tag: None,
            to_tag: None,
            cseq,
            external: false,
        }
    }

    /// Synthesize a response answering `request`: correlation fields are
    /// copied, the CSeq is echoed, and the direction flag is flipped.
    pub fn response_to(request: &SipMessage, status: StatusCode) -> Self {
        debug_assert!(request.is_request());
        Self {
            kind: MessageKind::Response { status },
            call_id: request.call_id.clone(),
            from_tag: request.from_tag.clone(),
            to_tag: request.to_tag.clone(),
            cseq: request.cseq.clone(),
            external: !request.external,
        }
    }

    pub fn with_from_tag(mut self, tag: impl Into<String>) -> Self {
        self.from_tag = Some(tag.into());
        self
    }

    pub fn with_to_tag(mut self, tag: impl Into<String>) -> Self {
        self.to_tag = Some(tag.into());
        self
    }

    /// Override the CSeq sequence number, keeping the method
    pub fn with_cseq_seq(mut self, seq: u32) -> Self {
        self.cseq = CSeq::new(seq, self.cseq.method.clone());
        self
    }

    /// Override the CSeq method (responses route on it, and a CANCEL
    /// transaction carries the CANCEL method in its own CSeq)
    pub fn with_cseq_method(mut self, method: Method) -> Self {
        self.cseq = CSeq::new(self.cseq.seq, method);
        self
    }

    /// Mark the message as received over the wire
    pub fn received(mut self) -> Self {
        self.external = true;
        self
    }

    pub fn is_request(&self) -> bool {
        matches!(self.kind, MessageKind::Request { .. })
    }

    pub fn is_response(&self) -> bool {
        matches!(self.kind, MessageKind::Response { .. })
    }

    /// Request-line method, `None` for responses
    pub fn method(&self) -> Option<&Method> {
        match &self.kind {
            MessageKind::Request { method } => Some(method),
            MessageKind::Response { .. } => None,
        }
    }

    /// Status code, `None` for requests
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            MessageKind::Request { .. } => None,
            MessageKind::Response { status } => Some(*status),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn from_tag(&self) -> Option<&str> {
        self.from_tag.as_deref()
    }

    pub fn to_tag(&self) -> Option<&str> {
        self.to_tag.as_deref()
    }

    pub fn cseq(&self) -> &CSeq {
        &self.cseq
    }

    pub fn cseq_mut(&mut self) -> &mut CSeq {
        &mut self.cseq
    }

    pub fn is_external(&self) -> bool {
        self.external
    }
}

impl fmt::Display for SipMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MessageKind::Request { method } => {
                write!(f, "{} request (Call-ID {}, CSeq {})", method, self.call_id, self.cseq)
            }
            MessageKind::Response { status } => {
                write!(f, "{} response (Call-ID {}, CSeq {})", status, self.call_id, self.cseq)
            }
        }
    }
}
