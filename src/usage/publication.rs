//! Publication usages (RFC 3903 PUBLISH)
//!
//! Same shape as registration: the client role is seeded from the creator's
//! PUBLISH and driven by responses, the server role absorbs inbound PUBLISH
//! requests for one event state and is reused for refreshes.

use tracing::{debug, warn};

use crate::manager::DumContext;
use crate::sip::{SipMessage, StatusCode};

use super::UsageOutcome;

/// Client-side publication, created from the first PUBLISH response
pub struct ClientPublication {
    request: SipMessage,
    published: bool,
}

impl ClientPublication {
    /// `request` is the creator's last built PUBLISH
    pub fn new(request: SipMessage) -> Self {
        Self { request, published: false }
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn request(&self) -> &SipMessage {
        &self.request
    }

    pub fn dispatch(&mut self, _ctx: &mut DumContext<'_>, msg: &SipMessage) -> UsageOutcome {
        let Some(status) = msg.status() else {
            warn!("client publication ignoring non-response: {msg}");
            return UsageOutcome::Continue;
        };
        if status.is_success() {
            debug!("publication succeeded: {status}");
            self.published = true;
            UsageOutcome::Continue
        } else if status.is_failure() {
            warn!("publication failed: {status}");
            UsageOutcome::Complete
        } else {
            UsageOutcome::Continue
        }
    }
}

/// Server-side publication, created by the first inbound PUBLISH
pub struct ServerPublication {
    last_request: SipMessage,
    dispatch_count: u32,
}

impl ServerPublication {
    pub fn new(request: SipMessage) -> Self {
        Self { last_request: request, dispatch_count: 0 }
    }

    pub fn dispatch_count(&self) -> u32 {
        self.dispatch_count
    }

    pub fn last_request(&self) -> &SipMessage {
        &self.last_request
    }

    pub fn dispatch(&mut self, ctx: &mut DumContext<'_>, msg: &SipMessage) -> UsageOutcome {
        self.dispatch_count += 1;
        self.last_request = msg.clone();
        debug!("server publication handling request #{}", self.dispatch_count);
        ctx.send(SipMessage::response_to(msg, StatusCode::Ok));
        UsageOutcome::Continue
    }
}
