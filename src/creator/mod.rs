//! Outbound request creators
//!
//! A creator owns the initial outbound request of a UAC-originated exchange
//! group. The dialog set keeps it for the lifetime of the group: the last
//! built request is the correlation anchor for authentication retries and
//! the seed for client usages created from later responses.

use uuid::Uuid;

use crate::dialog::dialog_impl::generate_tag;
use crate::manager::UserProfile;
use crate::sip::{Method, SipMessage};

/// Owner of the most recently built outbound request for an exchange group
pub trait BaseCreator {
    /// The last request sent or built for this exchange group
    fn last_request(&self) -> &SipMessage;

    /// Mutable access for authentication retry (credentials, CSeq bump)
    fn last_request_mut(&mut self) -> &mut SipMessage;
}

/// Creator building a plain initial request from the user's profile
pub struct RequestCreator {
    last_request: SipMessage,
}

impl RequestCreator {
    /// Build an internally originated initial request: fresh Call-ID, fresh
    /// From-tag, no To-tag.
    pub fn new(profile: &UserProfile, method: Method) -> Self {
        let call_id = format!("{}@{}", Uuid::new_v4(), profile.host());
        let last_request = SipMessage::request(method, call_id).with_from_tag(generate_tag());
        Self { last_request }
    }

    /// Wrap an already built request (testing, restarts)
    pub fn from_request(request: SipMessage) -> Self {
        Self { last_request: request }
    }
}

impl BaseCreator for RequestCreator {
    fn last_request(&self) -> &SipMessage {
        &self.last_request
    }

    fn last_request_mut(&mut self) -> &mut SipMessage {
        &mut self.last_request
    }
}
