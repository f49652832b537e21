//! Dialog and dialog set identity keys
//!
//! Both keys are derived from a message's correlation headers and are
//! direction-aware: which tag is "local" depends on whether the message was
//! originated here or received over the wire.
//!
//! - [`DialogSetId`] identifies the group of exchanges spawned from one
//!   initial transaction: Call-ID plus the tag of the party that initiated
//!   the exchange group.
//! - [`DialogId`] identifies one dialog within a set: Call-ID plus local and
//!   remote tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DialogError, DialogResult};
use crate::sip::SipMessage;

/// Identity of a dialog set (one initial transaction's exchange group)
///
/// The tag is the From-tag of the initial request as its sender built it:
/// for internally originated requests and for responses received to them
/// that is the From-tag; for a response we originate the initiator's tag sits
/// in the To header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogSetId {
    call_id: String,
    tag: Option<String>,
}

impl DialogSetId {
    pub fn new(call_id: impl Into<String>, tag: Option<String>) -> Self {
        Self { call_id: call_id.into(), tag }
    }

    /// Derive the set identity from a message
    pub fn from_message(msg: &SipMessage) -> DialogResult<Self> {
        if msg.call_id().is_empty() {
            return Err(DialogError::malformed("message has no Call-ID"));
        }
        let tag = if msg.is_response() && !msg.is_external() {
            msg.to_tag()
        } else {
            msg.from_tag()
        };
        Ok(Self {
            call_id: msg.call_id().to_string(),
            tag: tag.map(str::to_string),
        })
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl fmt::Display for DialogSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.call_id, self.tag.as_deref().unwrap_or("-"))
    }
}

/// Identity of one dialog: Call-ID + local tag + remote tag
///
/// A tag may be absent while a dialog is half-established (UAS dialog before
/// its local tag is assigned, early UAC dialog before the peer tags its
/// To header).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogId {
    call_id: String,
    local_tag: Option<String>,
    remote_tag: Option<String>,
}

impl DialogId {
    pub fn new(
        call_id: impl Into<String>,
        local_tag: Option<String>,
        remote_tag: Option<String>,
    ) -> Self {
        Self { call_id: call_id.into(), local_tag, remote_tag }
    }

    /// Derive the dialog identity from a message.
    ///
    /// External requests carry the remote tag in From and the local tag in
    /// To; external responses (and internal requests) the reverse. A missing
    /// From-tag is a protocol-shape error: no conforming peer omits it and no
    /// identity can be computed without it.
    pub fn from_message(msg: &SipMessage) -> DialogResult<Self> {
        if msg.call_id().is_empty() {
            return Err(DialogError::malformed("message has no Call-ID"));
        }
        if msg.from_tag().is_none() {
            return Err(DialogError::malformed(format!(
                "cannot compute dialog identity, no From-tag: {msg}"
            )));
        }
        let from_is_remote = msg.is_external() == msg.is_request();
        let (local_tag, remote_tag) = if from_is_remote {
            (msg.to_tag(), msg.from_tag())
        } else {
            (msg.from_tag(), msg.to_tag())
        };
        Ok(Self {
            call_id: msg.call_id().to_string(),
            local_tag: local_tag.map(str::to_string),
            remote_tag: remote_tag.map(str::to_string),
        })
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn local_tag(&self) -> Option<&str> {
        self.local_tag.as_deref()
    }

    pub fn remote_tag(&self) -> Option<&str> {
        self.remote_tag.as_deref()
    }

    /// Fill in a locally generated tag (UAS dialog creation)
    pub(crate) fn set_local_tag(&mut self, tag: String) {
        self.local_tag = Some(tag);
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.call_id,
            self.local_tag.as_deref().unwrap_or("-"),
            self.remote_tag.as_deref().unwrap_or("-")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sip::{Method, SipMessage, StatusCode};
    use crate::sip::CSeq;

    #[test]
    fn set_id_uses_initiator_tag() {
        let uac = SipMessage::request(Method::Invite, "c1").with_from_tag("alice");
        assert_eq!(
            DialogSetId::from_message(&uac).unwrap(),
            DialogSetId::new("c1", Some("alice".into()))
        );

        let uas = SipMessage::request(Method::Invite, "c1")
            .with_from_tag("alice")
            .received();
        assert_eq!(
            DialogSetId::from_message(&uas).unwrap(),
            DialogSetId::new("c1", Some("alice".into()))
        );

        let resp = SipMessage::response(StatusCode::Ok, "c1", CSeq::new(1, Method::Invite))
            .with_from_tag("alice")
            .with_to_tag("bob")
            .received();
        assert_eq!(
            DialogSetId::from_message(&resp).unwrap(),
            DialogSetId::new("c1", Some("alice".into()))
        );
    }

    #[test]
    fn dialog_id_is_direction_aware() {
        // External request: From is the remote party
        let request = SipMessage::request(Method::Bye, "c1")
            .with_from_tag("bob")
            .with_to_tag("alice")
            .received();
        let id = DialogId::from_message(&request).unwrap();
        assert_eq!(id.local_tag(), Some("alice"));
        assert_eq!(id.remote_tag(), Some("bob"));

        // External response: From is us
        let response = SipMessage::response(StatusCode::Ok, "c1", CSeq::new(1, Method::Invite))
            .with_from_tag("alice")
            .with_to_tag("bob")
            .received();
        let id = DialogId::from_message(&response).unwrap();
        assert_eq!(id.local_tag(), Some("alice"));
        assert_eq!(id.remote_tag(), Some("bob"));
    }

    #[test]
    fn missing_from_tag_is_malformed() {
        let request = SipMessage::request(Method::Invite, "c1").received();
        assert!(DialogId::from_message(&request).is_err());
    }
}
