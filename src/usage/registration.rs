//! Registration usages
//!
//! Client role is seeded from the creator's original REGISTER and driven by
//! its responses; server role is created by the first inbound REGISTER and
//! reused for refreshes of the same binding.

use tracing::{debug, warn};

use crate::manager::DumContext;
use crate::sip::{SipMessage, StatusCode};

use super::UsageOutcome;

/// Client-side registration, created from the first REGISTER response
pub struct ClientRegistration {
    request: SipMessage,
    registered: bool,
}

impl ClientRegistration {
    /// `request` is the creator's last built REGISTER
    pub fn new(request: SipMessage) -> Self {
        Self { request, registered: false }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn request(&self) -> &SipMessage {
        &self.request
    }

    pub fn dispatch(&mut self, _ctx: &mut DumContext<'_>, msg: &SipMessage) -> UsageOutcome {
        let Some(status) = msg.status() else {
            // Requests never route here; REGISTER requests go to the server role
            warn!("client registration ignoring non-response: {msg}");
            return UsageOutcome::Continue;
        };
        if status.is_success() {
            debug!("registration succeeded: {status}");
            self.registered = true;
            UsageOutcome::Continue
        } else if status.is_failure() {
            warn!("registration failed: {status}");
            UsageOutcome::Complete
        } else {
            UsageOutcome::Continue
        }
    }
}

/// Server-side registration, created by the first inbound REGISTER
pub struct ServerRegistration {
    last_request: SipMessage,
    dispatch_count: u32,
}

impl ServerRegistration {
    pub fn new(request: SipMessage) -> Self {
        Self { last_request: request, dispatch_count: 0 }
    }

    /// Number of REGISTER requests this usage has absorbed (refreshes reuse
    /// the same instance)
    pub fn dispatch_count(&self) -> u32 {
        self.dispatch_count
    }

    pub fn last_request(&self) -> &SipMessage {
        &self.last_request
    }

    pub fn dispatch(&mut self, ctx: &mut DumContext<'_>, msg: &SipMessage) -> UsageOutcome {
        self.dispatch_count += 1;
        self.last_request = msg.clone();
        debug!("server registration handling request #{}", self.dispatch_count);
        ctx.send(SipMessage::response_to(msg, StatusCode::Ok));
        UsageOutcome::Continue
    }
}
