//! SIP request methods
//!
//! The method enum doubles as the CSeq routing key used by dialog set
//! classification: for responses, the CSeq method decides the route, not the
//! status line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DialogError;

/// SIP request methods, RFC 3261 and common extensions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// INVITE - Session setup
    Invite,
    /// ACK - Final response acknowledgment
    Ack,
    /// BYE - Session teardown
    Bye,
    /// CANCEL - Cancel a pending request
    Cancel,
    /// REGISTER - Contact binding registration
    Register,
    /// OPTIONS - Capability query
    Options,
    /// SUBSCRIBE - Event subscription (RFC 6665)
    Subscribe,
    /// NOTIFY - Event notification (RFC 6665)
    Notify,
    /// REFER - Call transfer (RFC 3515)
    Refer,
    /// PUBLISH - Event state publication (RFC 3903)
    Publish,
    /// INFO - Mid-dialog information (RFC 6086)
    Info,
    /// MESSAGE - Instant message (RFC 3428)
    Message,
    /// UPDATE - Session parameter update (RFC 3311)
    Update,
    /// Any other token
    Extension(String),
}

impl Method {
    /// Canonical on-wire token for this method
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Register => "REGISTER",
            Method::Options => "OPTIONS",
            Method::Subscribe => "SUBSCRIBE",
            Method::Notify => "NOTIFY",
            Method::Refer => "REFER",
            Method::Publish => "PUBLISH",
            Method::Info => "INFO",
            Method::Message => "MESSAGE",
            Method::Update => "UPDATE",
            Method::Extension(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(DialogError::malformed("empty method token"));
        }
        Ok(match s {
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "REGISTER" => Method::Register,
            "OPTIONS" => Method::Options,
            "SUBSCRIBE" => Method::Subscribe,
            "NOTIFY" => Method::Notify,
            "REFER" => Method::Refer,
            "PUBLISH" => Method::Publish,
            "INFO" => Method::Info,
            "MESSAGE" => Method::Message,
            "UPDATE" => Method::Update,
            other => Method::Extension(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_extension_tokens() {
        assert_eq!("INVITE".parse::<Method>().unwrap(), Method::Invite);
        assert_eq!("PUBLISH".parse::<Method>().unwrap(), Method::Publish);
        assert_eq!(
            "PING".parse::<Method>().unwrap(),
            Method::Extension("PING".to_string())
        );
        assert!("".parse::<Method>().is_err());
    }

    #[test]
    fn round_trips_display() {
        assert_eq!(Method::Subscribe.to_string(), "SUBSCRIBE");
        assert_eq!(Method::Extension("PING".into()).to_string(), "PING");
    }
}
