//! Client authentication manager interface
//!
//! Credential computation is out of scope for the demultiplexing core; what
//! it needs is the retry contract: when a response arrives for the original
//! request of an exchange group, the authentication manager gets first look
//! and may rewrite the original request with credentials, in which case the
//! core resends it and consumes the response.

use crate::sip::SipMessage;

/// Handles authentication challenges on behalf of client exchanges
pub trait ClientAuthManager {
    /// Examine `response` against the `original` request it answers. Return
    /// `true` if credentials were added to `original` and it should be
    /// resent; the response is then fully consumed by the caller.
    fn handle(&mut self, original: &mut SipMessage, response: &SipMessage) -> bool;
}
