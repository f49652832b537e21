//! Out-of-dialog request usages
//!
//! The server role owns one pending inbound out-of-dialog request (an
//! unrecognized method, or an unsolicited NOTIFY) until the application
//! answers it. The client role tracks one outbound out-of-dialog transaction
//! and completes on its final response; a dialog set keeps these in creation
//! order and matches stray responses against them front to back.

use tracing::{debug, warn};

use crate::manager::DumContext;
use crate::sip::{CSeq, SipMessage, StatusCode};

use super::UsageOutcome;

/// One outbound out-of-dialog transaction (OPTIONS, MESSAGE, stray NOTIFY
/// responses and friends)
pub struct ClientOutOfDialogRequest {
    request: SipMessage,
    /// CSeq of the transaction this usage tracks; stray responses are
    /// matched against it
    cseq: CSeq,
}

impl ClientOutOfDialogRequest {
    /// `request` is the creator's last built request; `cseq` is the CSeq of
    /// the response that prompted creation and identifies the transaction.
    pub fn new(request: SipMessage, cseq: CSeq) -> Self {
        Self { request, cseq }
    }

    pub fn request(&self) -> &SipMessage {
        &self.request
    }

    /// Matching predicate for unsolicited responses: same transaction CSeq
    pub fn matches(&self, msg: &SipMessage) -> bool {
        msg.is_response() && msg.cseq() == &self.cseq
    }

    pub fn dispatch(&mut self, _ctx: &mut DumContext<'_>, msg: &SipMessage) -> UsageOutcome {
        let Some(status) = msg.status() else {
            warn!("client out-of-dialog request ignoring non-response: {msg}");
            return UsageOutcome::Continue;
        };
        if status.is_final() {
            debug!("out-of-dialog transaction {} finished: {status}", self.cseq);
            UsageOutcome::Complete
        } else {
            UsageOutcome::Continue
        }
    }
}

/// One pending inbound out-of-dialog request
pub struct ServerOutOfDialogRequest {
    request: SipMessage,
    answered: bool,
}

impl ServerOutOfDialogRequest {
    pub fn new(request: SipMessage) -> Self {
        Self { request, answered: false }
    }

    pub fn request(&self) -> &SipMessage {
        &self.request
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// Absorb the request (and retransmissions of it); stays pending until
    /// the application answers
    pub fn dispatch(&mut self, _ctx: &mut DumContext<'_>, msg: &SipMessage) -> UsageOutcome {
        debug!("server out-of-dialog request received: {msg}");
        self.request = msg.clone();
        UsageOutcome::Continue
    }

    /// Answer the pending request. The usage is finished afterwards; the
    /// owner removes it via the usage-ended path.
    pub fn respond(&mut self, ctx: &mut DumContext<'_>, status: StatusCode) -> UsageOutcome {
        ctx.send(SipMessage::response_to(&self.request, status));
        self.answered = true;
        UsageOutcome::Complete
    }
}
